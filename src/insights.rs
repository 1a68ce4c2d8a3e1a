use crate::aggregate::{
    by_category, by_year, by_year_quarter, AggregationRow, AggregationTable, YearQuarter,
};
use crate::schema::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemainingEfficiency {
    pub category: String,
    pub budget: f64,
    pub remaining: f64,
    /// `remaining / budget * 100`; lower means more of the budget was used.
    pub remaining_percent: f64,
}

impl RemainingEfficiency {
    fn from_row(row: &AggregationRow<String>) -> Self {
        Self {
            category: row.key.clone(),
            budget: row.budget,
            remaining: row.remaining,
            remaining_percent: row.remaining_percent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub best_year: Option<AggregationRow<i32>>,
    pub best_category: Option<AggregationRow<String>>,
    pub best_quarter: Option<AggregationRow<YearQuarter>>,
    pub most_efficient: Option<RemainingEfficiency>,
    pub needs_attention: Option<RemainingEfficiency>,
}

/// First row holding the maximum realized amount.
pub fn highest_realized<K: Ord + Clone>(table: &AggregationTable<K>) -> Option<&AggregationRow<K>> {
    first_extreme(table.rows(), |row| row.realized, |candidate, best| candidate > best)
}

/// Per-category remaining-budget ratios, in the table's row order.
pub fn remaining_efficiency(table: &AggregationTable<String>) -> Vec<RemainingEfficiency> {
    table.rows().iter().map(RemainingEfficiency::from_row).collect()
}

/// Lowest and highest remaining-budget ratio. Ties resolve to the first row.
pub fn efficiency_extremes(
    efficiencies: &[RemainingEfficiency],
) -> (Option<&RemainingEfficiency>, Option<&RemainingEfficiency>) {
    let lowest = first_extreme(efficiencies, |e| e.remaining_percent, |c, b| c < b);
    let highest = first_extreme(efficiencies, |e| e.remaining_percent, |c, b| c > b);
    (lowest, highest)
}

pub fn extract(records: &[Record]) -> Insights {
    let years = by_year(records);
    let categories = by_category(records);
    let quarters = by_year_quarter(records);

    // the remaining-budget view is ordered by remaining amount, largest first
    let remaining_view: Vec<RemainingEfficiency> = categories
        .sorted_by_remaining_desc()
        .into_iter()
        .map(RemainingEfficiency::from_row)
        .collect();
    let (lowest, highest) = efficiency_extremes(&remaining_view);

    Insights {
        best_year: highest_realized(&years).cloned(),
        best_category: highest_realized(&categories).cloned(),
        best_quarter: highest_realized(&quarters).cloned(),
        most_efficient: lowest.cloned(),
        needs_attention: highest.cloned(),
    }
}

fn first_extreme<T, V, F>(items: &[T], value: V, better: F) -> Option<&T>
where
    V: Fn(&T) -> f64,
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let candidate = value(item);
        match best {
            Some((_, current)) if !better(candidate, current) => {}
            _ => best = Some((item, candidate)),
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{record, sample_records};
    use crate::schema::Quarter;

    #[test]
    fn test_extract_on_sample() {
        let insights = extract(&sample_records());

        assert_eq!(insights.best_year.as_ref().unwrap().key, 2023);
        let best_category = insights.best_category.unwrap();
        assert_eq!(best_category.key, "Pegawai");
        assert_eq!(best_category.realized, 1400.0);

        let best_quarter = insights.best_quarter.unwrap();
        assert_eq!(best_quarter.key.quarter, Quarter::I);
        assert_eq!(best_quarter.realized, 1300.0);

        // Modal used its whole budget, Pegawai left 800 of 2200
        let most_efficient = insights.most_efficient.unwrap();
        assert_eq!(most_efficient.category, "Modal");
        assert_eq!(most_efficient.remaining_percent, 0.0);
        let needs_attention = insights.needs_attention.unwrap();
        assert_eq!(needs_attention.category, "Pegawai");
        assert!((needs_attention.remaining_percent - 800.0 / 2200.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_ties_resolve_to_first_row() {
        let records = vec![
            record(2023, Quarter::I, "Barang", 0, 100.0, 50.0),
            record(2023, Quarter::I, "Modal", 1, 100.0, 50.0),
        ];
        let table = by_category(&records);
        assert_eq!(highest_realized(&table).unwrap().key, "Barang");

        let efficiencies = remaining_efficiency(&table);
        let (lowest, highest) = efficiency_extremes(&efficiencies);
        assert_eq!(lowest.unwrap().category, "Barang");
        assert_eq!(highest.unwrap().category, "Barang");
    }

    #[test]
    fn test_zero_budget_category_does_not_poison_extremes() {
        let records = vec![
            record(2023, Quarter::I, "Hibah", 0, 0.0, 0.0),
            record(2023, Quarter::I, "Modal", 1, 100.0, 40.0),
        ];
        let insights = extract(&records);
        assert_eq!(insights.needs_attention.unwrap().category, "Modal");
        assert_eq!(insights.most_efficient.unwrap().category, "Hibah");
    }

    #[test]
    fn test_empty_input_yields_no_insights() {
        let insights = extract(&[]);
        assert!(insights.best_year.is_none());
        assert!(insights.most_efficient.is_none());
    }
}
