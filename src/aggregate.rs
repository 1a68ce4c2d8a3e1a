//! Grouped budget/realization summaries over the cleaned records.
//!
//! Every table is recomputed from the record slice on demand; nothing here
//! holds state between calls.

use crate::schema::{Quarter, Record};
use crate::utils::percent_of;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Display label for a grouping key.
pub trait GroupKey: Ord + Clone {
    fn label(&self) -> String;
}

impl GroupKey for i32 {
    fn label(&self) -> String {
        self.to_string()
    }
}

impl GroupKey for String {
    fn label(&self) -> String {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: Quarter,
}

impl GroupKey for YearQuarter {
    /// `2023-TWI`
    fn label(&self) -> String {
        format!("{}-TW{}", self.year, self.quarter.roman())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearCategory {
    pub year: i32,
    pub category: String,
}

impl GroupKey for YearCategory {
    fn label(&self) -> String {
        format!("{} {}", self.year, self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarterCategory {
    pub year: i32,
    pub quarter: Quarter,
    pub category: String,
}

impl GroupKey for YearQuarterCategory {
    fn label(&self) -> String {
        format!("{}-TW{} {}", self.year, self.quarter.roman(), self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRow<K> {
    pub key: K,
    pub budget: f64,
    pub realized: f64,
    pub remaining: f64,
    /// Records folded into this row.
    pub count: usize,
}

impl<K> AggregationRow<K> {
    fn new(key: K) -> Self {
        Self {
            key,
            budget: 0.0,
            realized: 0.0,
            remaining: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, record: &Record) {
        self.budget += record.budget;
        self.realized += record.realized;
        self.remaining += record.remaining;
        self.count += 1;
    }

    /// `realized / budget * 100`, 0 when the budget is zero.
    pub fn efficiency_percent(&self) -> f64 {
        percent_of(self.realized, self.budget)
    }

    /// `remaining / budget * 100`, 0 when the budget is zero.
    pub fn remaining_percent(&self) -> f64 {
        percent_of(self.remaining, self.budget)
    }
}

/// Rows kept in ascending key order, which `get` relies on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationTable<K> {
    rows: Vec<AggregationRow<K>>,
}

impl<'de, K> Deserialize<'de> for AggregationTable<K>
where
    K: Deserialize<'de> + Ord,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Rows<T> {
            rows: Vec<AggregationRow<T>>,
        }

        let Rows { mut rows } = Rows::<K>::deserialize(deserializer)?;
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Self { rows })
    }
}

impl<K: Ord + Clone> AggregationTable<K> {
    pub fn rows(&self) -> &[AggregationRow<K>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<AggregationRow<K>> {
        self.rows
    }

    pub fn get(&self, key: &K) -> Option<&AggregationRow<K>> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|idx| &self.rows[idx])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_budget(&self) -> f64 {
        self.rows.iter().map(|r| r.budget).sum()
    }

    pub fn total_realized(&self) -> f64 {
        self.rows.iter().map(|r| r.realized).sum()
    }

    /// Rows ordered by remaining budget, largest first. Ties keep key order.
    pub fn sorted_by_remaining_desc(&self) -> Vec<&AggregationRow<K>> {
        let mut rows: Vec<&AggregationRow<K>> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));
        rows
    }
}

/// Sums records per key. Rows come out in ascending key order.
pub fn group_by<K, F>(records: &[Record], key_fn: F) -> AggregationTable<K>
where
    K: Ord + Clone,
    F: Fn(&Record) -> K,
{
    let mut groups: BTreeMap<K, AggregationRow<K>> = BTreeMap::new();
    for record in records {
        let key = key_fn(record);
        groups
            .entry(key.clone())
            .or_insert_with(|| AggregationRow::new(key))
            .add(record);
    }

    AggregationTable {
        rows: groups.into_values().collect(),
    }
}

pub fn by_year(records: &[Record]) -> AggregationTable<i32> {
    group_by(records, |r| r.year)
}

pub fn by_year_quarter(records: &[Record]) -> AggregationTable<YearQuarter> {
    group_by(records, |r| YearQuarter {
        year: r.year,
        quarter: r.quarter,
    })
}

pub fn by_category(records: &[Record]) -> AggregationTable<String> {
    group_by(records, |r| r.category.clone())
}

pub fn by_year_category(records: &[Record]) -> AggregationTable<YearCategory> {
    group_by(records, |r| YearCategory {
        year: r.year,
        category: r.category.clone(),
    })
}

pub fn by_year_quarter_category(records: &[Record]) -> AggregationTable<YearQuarterCategory> {
    group_by(records, |r| YearQuarterCategory {
        year: r.year,
        quarter: r.quarter,
        category: r.category.clone(),
    })
}

/// Headline totals shown above every view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub total_budget: f64,
    pub total_realized: f64,
    pub realization_percent: f64,
    pub total_remaining: f64,
}

pub fn kpis(records: &[Record]) -> Kpis {
    let total_budget: f64 = records.iter().map(|r| r.budget).sum();
    let total_realized: f64 = records.iter().map(|r| r.realized).sum();
    let total_remaining: f64 = records.iter().map(|r| r.remaining).sum();

    Kpis {
        total_budget,
        total_realized,
        realization_percent: percent_of(total_realized, total_budget),
        total_remaining,
    }
}

/// One slice of a realization-share breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub realized: f64,
    pub share_percent: f64,
}

/// Realized spend per category as a share of the slice total.
pub fn category_shares(records: &[Record]) -> Vec<CategoryShare> {
    let table = by_category(records);
    let total = table.total_realized();

    table
        .into_rows()
        .into_iter()
        .map(|row| CategoryShare {
            share_percent: percent_of(row.realized, total),
            category: row.key,
            realized: row.realized,
        })
        .collect()
}

pub fn category_shares_for_year(records: &[Record], year: i32) -> Vec<CategoryShare> {
    let subset: Vec<Record> = records.iter().filter(|r| r.year == year).cloned().collect();
    category_shares(&subset)
}

pub fn category_shares_for_quarter(
    records: &[Record],
    year: i32,
    quarter: Quarter,
) -> Vec<CategoryShare> {
    let subset: Vec<Record> = records
        .iter()
        .filter(|r| r.year == year && r.quarter == quarter)
        .cloned()
        .collect();
    category_shares(&subset)
}

/// Quarters present in each year, chronologically.
pub fn quarters_by_year(records: &[Record]) -> BTreeMap<i32, Vec<Quarter>> {
    let mut map: BTreeMap<i32, Vec<Quarter>> = BTreeMap::new();
    for record in records {
        let quarters = map.entry(record.year).or_default();
        if !quarters.contains(&record.quarter) {
            quarters.push(record.quarter);
        }
    }
    for quarters in map.values_mut() {
        quarters.sort();
    }
    map
}
