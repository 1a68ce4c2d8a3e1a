//! # Anggaran Dashboard
//!
//! Budget ("Anggaran") versus realized spending ("Realisasi") analysis for
//! quarterly treasury expense data.
//!
//! ## Pipeline
//!
//! - **Ingestion**: reads the `Tanggal, Tahun, Triwulan, Jenis Belanja,
//!   Anggaran, Realisasi` sheet, cleans amounts and dates, derives the
//!   remaining budget and fits the category encoder
//! - **Aggregation**: sums per year, quarter and category with efficiency ratios
//! - **Forecast**: OLS projection of realized spend for future quarters
//! - **Insights**: best year/category/quarter and remaining-budget extremes
//! - **Export**: in-memory xlsx workbooks for download
//!
//! Data only flows forward. The cleaned dataset is loaded once per session
//! and every view is a read-only projection of it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use anggaran_dashboard::*;
//!
//! let mut session = DashboardSession::open(DashboardConfig::with_source("data/belanja.xlsx"))?;
//!
//! let overview = session.overview()?;
//! println!("Realisasi: {:.2}%", overview.kpis.realization_percent);
//!
//! match session.forecast() {
//!     Ok(forecast) => {
//!         for row in &forecast.rows {
//!             println!("{} {}: {}", row.label(), row.category, format_rupiah(row.predicted_realized));
//!         }
//!     }
//!     Err(e) => eprintln!("Prediksi tidak tersedia: {}", e),
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod encoder;
pub mod error;
pub mod export;
pub mod filter;
pub mod forecast;
pub mod ingestion;
pub mod insights;
pub mod schema;
pub mod session;
pub mod utils;

pub use aggregate::{
    by_category, by_year, by_year_category, by_year_quarter, by_year_quarter_category,
    category_shares, category_shares_for_quarter, category_shares_for_year, group_by, kpis,
    quarters_by_year, AggregationRow, AggregationTable, CategoryShare, GroupKey, Kpis,
    YearCategory, YearQuarter, YearQuarterCategory,
};
pub use cache::{CacheKey, DatasetCache};
pub use encoder::CategoryEncoder;
pub use error::{DashboardError, Result};
pub use export::{
    exploration_workbook, export_tables, predictions_sheet, predictions_workbook, Cell, Sheet,
};
pub use filter::{category_options, filter, require_non_empty, year_options, FilterCriteria};
pub use forecast::{Forecast, Forecaster, LinearModel, ModelAssessment, PredictionRow};
pub use ingestion::{clean, load_dataset, read_source, DataSource, RawCell, RawTable};
pub use insights::{extract as extract_insights, Insights, RemainingEfficiency};
pub use schema::*;
pub use session::{DashboardSession, Exploration, Overview};
pub use utils::{format_rupiah, percent_of};
