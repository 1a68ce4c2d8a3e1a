use crate::error::{DashboardError, Result};
use crate::schema::{Quarter, Record};
use serde::{Deserialize, Serialize};

/// Selection made in the exploration view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Only these categories are kept. An empty list selects nothing.
    pub categories: Vec<String>,
    pub year: Option<i32>,
    /// `None` keeps every quarter.
    pub quarters: Option<Vec<Quarter>>,
}

impl FilterCriteria {
    /// Everything selected for the given year, as the view starts out.
    pub fn all_for_year(records: &[Record], year: i32) -> Self {
        Self {
            categories: category_options(records),
            year: Some(year),
            quarters: None,
        }
    }

    fn matches(&self, record: &Record) -> bool {
        self.categories.iter().any(|c| *c == record.category)
            && self.year.map_or(true, |y| y == record.year)
            && self
                .quarters
                .as_ref()
                .map_or(true, |qs| qs.contains(&record.quarter))
    }
}

pub fn filter(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    records
        .iter()
        .filter(|r| criteria.matches(r))
        .cloned()
        .collect()
}

/// Turns an empty selection into an [`DashboardError::EmptyResult`] so the
/// caller can show guidance and skip downstream steps.
pub fn require_non_empty(records: Vec<Record>, criteria: &FilterCriteria) -> Result<Vec<Record>> {
    if !records.is_empty() {
        return Ok(records);
    }

    let guidance = if criteria.categories.is_empty() {
        "select at least one expense category".to_string()
    } else if matches!(criteria.quarters, Some(ref qs) if qs.is_empty()) {
        "select at least one quarter".to_string()
    } else {
        match criteria.year {
            Some(year) => format!(
                "no data for the chosen categories and quarters in {}; try another year",
                year
            ),
            None => "no data for the chosen categories and quarters".to_string(),
        }
    };

    Err(DashboardError::EmptyResult(guidance))
}

/// Distinct categories in order of first appearance.
pub fn category_options(records: &[Record]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for record in records {
        if !options.contains(&record.category) {
            options.push(record.category.clone());
        }
    }
    options
}

/// Distinct years, most recent first.
pub fn year_options(records: &[Record]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().map(|r| r.year).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}
