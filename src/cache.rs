//! Session-scoped memo of loaded datasets.
//!
//! Loading is the only I/O in the pipeline. A dataset is read once per
//! source and reused for every recomputation until it is invalidated.

use crate::error::Result;
use crate::ingestion::{load_dataset, DataSource};
use crate::schema::{CategoryOrder, DashboardConfig, Dataset};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    sheet_name: Option<String>,
    category_order: CategoryOrder,
}

impl CacheKey {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            source: DataSource::parse(&config.source).identity(),
            sheet_name: config.sheet_name.clone(),
            category_order: config.category_order,
        }
    }
}

#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<CacheKey, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Dataset>> {
        self.entries.get(key).cloned()
    }

    /// Returns the cached dataset or runs `loader` and caches its result.
    /// A failed load leaves the cache untouched.
    pub fn get_or_load_with<F>(&mut self, key: CacheKey, loader: F) -> Result<Arc<Dataset>>
    where
        F: FnOnce() -> Result<Dataset>,
    {
        if let Some(dataset) = self.entries.get(&key) {
            debug!("Dataset cache hit for {}", key.source);
            return Ok(Arc::clone(dataset));
        }

        info!("Loading dataset from {}", key.source);
        let dataset = Arc::new(loader()?);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn get_or_load(&mut self, config: &DashboardConfig) -> Result<Arc<Dataset>> {
        self.get_or_load_with(CacheKey::from_config(config), || load_dataset(config))
    }

    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops any cached copy and loads the source again.
    pub fn reload(&mut self, config: &DashboardConfig) -> Result<Arc<Dataset>> {
        self.invalidate(&CacheKey::from_config(config));
        self.get_or_load(config)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
