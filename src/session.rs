use crate::aggregate::{
    by_category, by_year, by_year_quarter, category_shares, kpis, quarters_by_year,
    AggregationRow, AggregationTable, CategoryShare, Kpis, YearQuarter,
};
use crate::cache::DatasetCache;
use crate::error::Result;
use crate::export::{exploration_workbook, predictions_workbook};
use crate::filter::{filter, require_non_empty, FilterCriteria};
use crate::forecast::{Forecast, Forecaster};
use crate::insights::{extract, Insights};
use crate::schema::{DashboardConfig, Dataset, Quarter, Record};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything the summary tabs display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub kpis: Kpis,
    pub by_year: AggregationTable<i32>,
    pub by_year_quarter: AggregationTable<YearQuarter>,
    pub by_category: AggregationTable<String>,
    /// Category totals, largest remaining budget first.
    pub remaining_by_category: Vec<AggregationRow<String>>,
    pub category_shares: Vec<CategoryShare>,
    pub quarters_by_year: BTreeMap<i32, Vec<Quarter>>,
}

impl Overview {
    pub fn build(records: &[Record]) -> Self {
        let by_category = by_category(records);
        let remaining_by_category = by_category
            .sorted_by_remaining_desc()
            .into_iter()
            .cloned()
            .collect();

        Self {
            kpis: kpis(records),
            by_year: by_year(records),
            by_year_quarter: by_year_quarter(records),
            remaining_by_category,
            by_category,
            category_shares: category_shares(records),
            quarters_by_year: quarters_by_year(records),
        }
    }
}

/// Result of applying the exploration filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    pub records: Vec<Record>,
    pub by_year_quarter: AggregationTable<YearQuarter>,
}

/// One user's dashboard: its configuration and its own dataset cache.
///
/// Each view returns its own `Result`; a failing forecast does not stop the
/// overview or the exploration view from being computed.
#[derive(Debug)]
pub struct DashboardSession {
    config: DashboardConfig,
    cache: DatasetCache,
}

impl DashboardSession {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cache: DatasetCache::new(),
        })
    }

    /// Builds a session and loads its dataset, failing if the source is
    /// malformed.
    pub fn open(config: DashboardConfig) -> Result<Self> {
        let mut session = Self::new(config)?;
        session.dataset()?;
        Ok(session)
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&mut self) -> Result<Arc<Dataset>> {
        self.cache.get_or_load(&self.config)
    }

    pub fn reload(&mut self) -> Result<Arc<Dataset>> {
        info!("Reloading dataset from {}", self.config.source);
        self.cache.reload(&self.config)
    }

    pub fn overview(&mut self) -> Result<Overview> {
        let dataset = self.dataset()?;
        Ok(Overview::build(dataset.records()))
    }

    pub fn forecast(&mut self) -> Result<Forecast> {
        let dataset = self.dataset()?;
        Forecaster::from_config(&self.config)
            .run(&dataset)
            .inspect_err(|e| warn!("Forecast unavailable: {}", e))
    }

    pub fn insights(&mut self) -> Result<Insights> {
        let dataset = self.dataset()?;
        Ok(extract(dataset.records()))
    }

    pub fn explore(&mut self, criteria: &FilterCriteria) -> Result<Exploration> {
        let dataset = self.dataset()?;
        let records = require_non_empty(filter(dataset.records(), criteria), criteria)?;
        let by_year_quarter = by_year_quarter(&records);
        Ok(Exploration {
            records,
            by_year_quarter,
        })
    }

    pub fn export_predictions(&mut self) -> Result<Vec<u8>> {
        let forecast = self.forecast()?;
        predictions_workbook(&forecast)
    }

    pub fn export_exploration(&mut self, criteria: &FilterCriteria) -> Result<Vec<u8>> {
        let exploration = self.explore(criteria)?;
        exploration_workbook(&exploration.records)
    }
}
