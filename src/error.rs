use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Malformed value in row {row}, column '{column}': {details}")]
    DataFormat {
        row: usize,
        column: String,
        details: String,
    },

    #[error("Required column '{0}' not found in source header")]
    MissingColumn(String),

    #[error("No records match the current selection: {0}")]
    EmptyResult(String),

    #[error("Regression fit failed: {0}")]
    ModelFit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot load '{0}': remote sources require the `remote` feature")]
    RemoteDisabled(String),

    #[error("Workbook read error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DashboardError {
    pub(crate) fn data_format(
        row: usize,
        column: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        DashboardError::DataFormat {
            row,
            column: column.into(),
            details: details.into(),
        }
    }

    /// Errors raised while reading the source. These abort dashboard
    /// initialization; everything else is scoped to the view that raised it.
    pub fn is_load_error(&self) -> bool {
        match self {
            DashboardError::DataFormat { .. }
            | DashboardError::MissingColumn(_)
            | DashboardError::RemoteDisabled(_)
            | DashboardError::Workbook(_)
            | DashboardError::Csv(_)
            | DashboardError::IoError(_) => true,
            #[cfg(feature = "remote")]
            DashboardError::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
