use crate::encoder::CategoryEncoder;
use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Column names of the source spreadsheet. These are a fixed contract.
pub const COL_DATE: &str = "Tanggal";
pub const COL_YEAR: &str = "Tahun";
pub const COL_QUARTER: &str = "Triwulan";
pub const COL_CATEGORY: &str = "Jenis Belanja";
pub const COL_BUDGET: &str = "Anggaran";
pub const COL_REALIZED: &str = "Realisasi";
pub const COL_REMAINING: &str = "Sisa Anggaran";
pub const COL_PREDICTION: &str = "Prediksi";
pub const COL_LABEL: &str = "Label";

/// R² above which a forecast model counts as adequate.
pub const DEFAULT_ADEQUACY_THRESHOLD: f64 = 0.7;

pub const DEFAULT_SOURCE_URL: &str = "https://raw.githubusercontent.com/dinawseptiana/project-realisasi-belanja/main/data/RealisasiBelanja_cleaned.xlsx";

/// Fiscal quarter ("Triwulan"), presented as a Roman numeral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    I,
    II,
    III,
    IV,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::I, Quarter::II, Quarter::III, Quarter::IV];

    pub fn ordinal(self) -> u32 {
        match self {
            Quarter::I => 1,
            Quarter::II => 2,
            Quarter::III => 3,
            Quarter::IV => 4,
        }
    }

    pub fn roman(self) -> &'static str {
        match self {
            Quarter::I => "I",
            Quarter::II => "II",
            Quarter::III => "III",
            Quarter::IV => "IV",
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            1 => Some(Quarter::I),
            2 => Some(Quarter::II),
            3 => Some(Quarter::III),
            4 => Some(Quarter::IV),
            _ => None,
        }
    }

    /// Accepts `I`..`IV` (any case) and the digits `1`..`4`.
    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "I" => Some(Quarter::I),
            "II" => Some(Quarter::II),
            "III" => Some(Quarter::III),
            "IV" => Some(Quarter::IV),
            _ => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0)
                .and_then(|v| Self::from_ordinal(v as u32)),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.roman())
    }
}

/// One cleaned row of the budget dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub year: i32,
    pub quarter: Quarter,
    pub category: String,
    /// Dense id from the session's [`CategoryEncoder`].
    pub category_key: usize,
    pub budget: f64,
    pub realized: f64,
    /// `budget - realized`; negative on overspend.
    pub remaining: f64,
}

impl Record {
    pub fn quarter_ordinal(&self) -> u32 {
        self.quarter.ordinal()
    }
}

/// The cleaned dataset for one session together with the encoder fitted
/// over its categories. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: String,
    records: Vec<Record>,
    encoder: CategoryEncoder,
    dropped_rows: usize,
}

impl Dataset {
    pub(crate) fn new(
        source: String,
        records: Vec<Record>,
        encoder: CategoryEncoder,
        dropped_rows: usize,
    ) -> Self {
        Self {
            source,
            records,
            encoder,
            dropped_rows,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn encoder(&self) -> &CategoryEncoder {
        &self.encoder
    }

    /// Rows discarded at load because `Anggaran` or `Realisasi` was missing.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOrder {
    /// Keys follow the sorted label order.
    #[default]
    Sorted,
    /// Keys follow the order labels first appear in the source.
    FirstSeen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source: String,
    pub sheet_name: Option<String>,
    pub forecast_year: i32,
    pub forecast_quarters: Vec<Quarter>,
    pub adequacy_threshold: f64,
    pub category_order: CategoryOrder,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_URL.to_string(),
            sheet_name: None,
            forecast_year: 2025,
            forecast_quarters: vec![Quarter::III, Quarter::IV],
            adequacy_threshold: DEFAULT_ADEQUACY_THRESHOLD,
            category_order: CategoryOrder::Sorted,
        }
    }
}

impl DashboardConfig {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(DashboardError::InvalidConfig(
                "source must not be empty".to_string(),
            ));
        }

        if self.forecast_quarters.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "forecast_quarters must name at least one quarter".to_string(),
            ));
        }

        for (idx, quarter) in self.forecast_quarters.iter().enumerate() {
            if self.forecast_quarters[..idx].contains(quarter) {
                return Err(DashboardError::InvalidConfig(format!(
                    "quarter {} listed more than once in forecast_quarters",
                    quarter
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.adequacy_threshold) {
            return Err(DashboardError::InvalidConfig(format!(
                "adequacy_threshold {} must be between 0.0 and 1.0",
                self.adequacy_threshold
            )));
        }

        Ok(())
    }
}
