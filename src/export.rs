//! In-memory xlsx export of prediction and exploration tables.
//!
//! Nothing is written to disk; callers receive the workbook bytes and hand
//! them to whatever delivers the download.

use crate::aggregate::{by_year_quarter, AggregationTable, GroupKey};
use crate::error::{DashboardError, Result};
use crate::forecast::Forecast;
use crate::schema::{
    Record, COL_BUDGET, COL_CATEGORY, COL_DATE, COL_LABEL, COL_PREDICTION, COL_QUARTER,
    COL_REALIZED, COL_REMAINING, COL_YEAR,
};
use crate::utils::round_to;
use log::debug;
use rust_xlsxwriter::{Format, Workbook};

pub const PREDICTION_SHEET: &str = "Prediksi";
pub const FILTERED_SHEET: &str = "Data Terfilter";
pub const QUARTER_SUMMARY_SHEET: &str = "Kinerja Triwulan";
pub const COL_EFFICIENCY: &str = "Efisiensi (%)";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(value as f64)
    }
}

/// A named table destined for one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Label, budget, realized, remaining and efficiency per row of an
    /// aggregation table, in table order.
    pub fn from_table<K: GroupKey>(name: impl Into<String>, table: &AggregationTable<K>) -> Self {
        let mut sheet = Sheet::new(
            name,
            &[COL_LABEL, COL_BUDGET, COL_REALIZED, COL_REMAINING, COL_EFFICIENCY],
        );
        for row in table.rows() {
            sheet.push_row(vec![
                row.key.label().into(),
                row.budget.into(),
                row.realized.into(),
                row.remaining.into(),
                round_to(row.efficiency_percent(), 2).into(),
            ]);
        }
        sheet
    }
}

/// Writes one worksheet per sheet: header row first, no index column.
pub fn export_tables(sheets: &[Sheet]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, title) in sheet.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, title, &header_format)?;
        }

        for (idx, row) in sheet.rows.iter().enumerate() {
            let row_num = (idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => worksheet.write_string(row_num, col as u16, text)?,
                    Cell::Number(value) => worksheet.write_number(row_num, col as u16, *value)?,
                };
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;
    debug!("Exported {} sheets ({} bytes)", sheets.len(), buffer.len());
    Ok(buffer)
}

pub fn predictions_sheet(forecast: &Forecast) -> Sheet {
    let mut sheet = Sheet::new(
        PREDICTION_SHEET,
        &[COL_LABEL, COL_CATEGORY, COL_BUDGET, COL_REMAINING, COL_PREDICTION],
    );
    for row in &forecast.rows {
        sheet.push_row(vec![
            row.label().into(),
            row.category.clone().into(),
            row.mean_budget.round().into(),
            row.mean_remaining.round().into(),
            row.predicted_realized.round().into(),
        ]);
    }
    sheet
}

pub fn predictions_workbook(forecast: &Forecast) -> Result<Vec<u8>> {
    export_tables(&[predictions_sheet(forecast)])
}

pub fn filtered_records_sheet(records: &[Record]) -> Sheet {
    let mut sheet = Sheet::new(
        FILTERED_SHEET,
        &[
            COL_DATE,
            COL_YEAR,
            COL_QUARTER,
            COL_CATEGORY,
            COL_BUDGET,
            COL_REALIZED,
            COL_REMAINING,
        ],
    );
    for record in records {
        sheet.push_row(vec![
            record.date.format("%Y-%m-%d").to_string().into(),
            record.year.into(),
            record.quarter.roman().into(),
            record.category.clone().into(),
            record.budget.into(),
            record.realized.into(),
            record.remaining.into(),
        ]);
    }
    sheet
}

/// Filtered records plus their per-quarter performance summary.
pub fn exploration_workbook(records: &[Record]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(DashboardError::EmptyResult(
            "nothing to export; widen the category, year or quarter selection".to_string(),
        ));
    }

    export_tables(&[
        filtered_records_sheet(records),
        Sheet::from_table(QUARTER_SUMMARY_SHEET, &by_year_quarter(records)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::sample_records;
    use crate::forecast::{LinearModel, ModelAssessment, PredictionRow};
    use crate::ingestion::{RawCell, RawTable};
    use crate::schema::Quarter;

    fn sample_forecast() -> Forecast {
        Forecast {
            rows: vec![PredictionRow {
                year: 2025,
                quarter: Quarter::III,
                category_key: 0,
                category: "Modal".to_string(),
                mean_budget: 500.4,
                mean_remaining: 20.6,
                predicted_realized: 479.8,
            }],
            model: LinearModel {
                intercept: 0.0,
                coefficients: vec![0.0, 0.0, 0.0, 1.0, -1.0],
            },
            r_squared: 1.0,
            assessment: ModelAssessment::Adequate,
            training_groups: 6,
        }
    }

    #[test]
    fn test_predictions_workbook_columns() {
        let bytes = predictions_workbook(&sample_forecast()).unwrap();
        let table = RawTable::from_xlsx_bytes(bytes, Some(PREDICTION_SHEET)).unwrap();

        assert_eq!(
            table.headers,
            vec!["Label", "Jenis Belanja", "Anggaran", "Sisa Anggaran", "Prediksi"]
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], RawCell::Text("2025-TW3".to_string()));
        assert_eq!(table.rows[0][2], RawCell::Number(500.0));
        assert_eq!(table.rows[0][4], RawCell::Number(480.0));
    }

    #[test]
    fn test_exploration_workbook_has_two_sheets() {
        let bytes = exploration_workbook(&sample_records()).unwrap();

        let raw = RawTable::from_xlsx_bytes(bytes.clone(), Some(FILTERED_SHEET)).unwrap();
        assert_eq!(raw.rows.len(), 3);
        assert_eq!(raw.headers[0], COL_DATE);

        let summary = RawTable::from_xlsx_bytes(bytes, Some(QUARTER_SUMMARY_SHEET)).unwrap();
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0][0], RawCell::Text("2023-TWI".to_string()));
        assert_eq!(summary.rows[0][1], RawCell::Number(1500.0));
    }

    #[test]
    fn test_exploration_export_of_empty_selection() {
        assert!(matches!(
            exploration_workbook(&[]),
            Err(DashboardError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_invalid_sheet_name_is_rejected() {
        let sheet = Sheet::new("bad[name]", &["A"]);
        assert!(matches!(
            export_tables(&[sheet]),
            Err(DashboardError::Export(_))
        ));
    }
}
