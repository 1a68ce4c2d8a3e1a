//! Reading the budget spreadsheet and cleaning it into a [`Dataset`].
//!
//! Sources are either a local file or an `http(s)` URL. Files ending in
//! `.csv` are parsed as CSV, everything else as an xlsx workbook.

use crate::encoder::CategoryEncoder;
use crate::error::{DashboardError, Result};
use crate::schema::{
    CategoryOrder, DashboardConfig, Dataset, Quarter, Record, COL_BUDGET, COL_CATEGORY, COL_DATE,
    COL_QUARTER, COL_REALIZED, COL_YEAR,
};
use crate::utils::{parse_amount, parse_date, parse_year, year_from_number};
use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::fmt;
use std::io::{Cursor, Read};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::Path(PathBuf::from(trimmed))
        }
    }

    /// Key under which a loaded dataset is cached.
    pub fn identity(&self) -> String {
        match self {
            DataSource::Path(path) => path.to_string_lossy().into_owned(),
            DataSource::Url(url) => url.clone(),
        }
    }

    fn is_csv(&self) -> bool {
        let name = match self {
            DataSource::Path(path) => path.to_string_lossy().to_ascii_lowercase(),
            DataSource::Url(url) => url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_ascii_lowercase(),
        };
        name.ends_with(".csv")
    }

    fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            DataSource::Path(path) => Ok(std::fs::read(path)?),
            DataSource::Url(url) => fetch_url(url),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

#[cfg(feature = "remote")]
fn fetch_url(url: &str) -> Result<Vec<u8>> {
    debug!("Fetching {}", url);
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}

#[cfg(not(feature = "remote"))]
fn fetch_url(url: &str) -> Result<Vec<u8>> {
    Err(DashboardError::RemoteDisabled(url.to_string()))
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// A single spreadsheet cell before cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    pub fn text(value: &str) -> Self {
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value.to_string())
        }
    }

    fn from_xlsx(cell: &Data) -> Self {
        match cell {
            Data::Empty => RawCell::Empty,
            Data::String(s) | Data::DateTimeIso(s) => RawCell::text(s),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::DateTime(_) => match cell.as_datetime() {
                Some(datetime) => RawCell::Date(datetime.date()),
                None => RawCell::Text(cell.to_string()),
            },
            other => RawCell::Text(other.to_string()),
        }
    }

    fn describe(&self) -> String {
        match self {
            RawCell::Empty => "empty cell".to_string(),
            RawCell::Text(s) => format!("'{}'", s),
            RawCell::Number(n) => n.to_string(),
            RawCell::Date(d) => d.to_string(),
        }
    }
}

/// Header plus uncleaned rows, independent of the file format.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(RawCell::text).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_xlsx_bytes(bytes: Vec<u8>, sheet_name: Option<&str>) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;

        let range = match sheet_name {
            Some(name) => workbook.worksheet_range(name)?,
            None => workbook.worksheet_range_at(0).ok_or_else(|| {
                DashboardError::data_format(0, "-", "workbook contains no worksheets")
            })??,
        };

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => header
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        let rows = rows
            .map(|row| row.iter().map(RawCell::from_xlsx).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    }
}

pub fn read_source(source: &DataSource, sheet_name: Option<&str>) -> Result<RawTable> {
    let bytes = source.read_bytes()?;
    debug!("Read {} bytes from {}", bytes.len(), source);

    if source.is_csv() {
        RawTable::from_csv_reader(bytes.as_slice())
    } else {
        RawTable::from_xlsx_bytes(bytes, sheet_name)
    }
}

pub fn load_dataset(config: &DashboardConfig) -> Result<Dataset> {
    let source = DataSource::parse(&config.source);
    let table = read_source(&source, config.sheet_name.as_deref())?;
    clean(&table, &source.identity(), config.category_order)
}

struct Columns {
    date: usize,
    year: usize,
    quarter: usize,
    category: usize,
    budget: usize,
    realized: usize,
}

impl Columns {
    fn locate(table: &RawTable) -> Result<Self> {
        Ok(Self {
            date: table.column(COL_DATE)?,
            year: table.column(COL_YEAR)?,
            quarter: table.column(COL_QUARTER)?,
            category: table.column(COL_CATEGORY)?,
            budget: table.column(COL_BUDGET)?,
            realized: table.column(COL_REALIZED)?,
        })
    }
}

/// Cleans raw rows into records.
///
/// Rows missing `Anggaran` or `Realisasi` are dropped. Any other malformed
/// field aborts the whole load, so no partial dataset is ever produced.
pub fn clean(table: &RawTable, source: &str, order: CategoryOrder) -> Result<Dataset> {
    let columns = Columns::locate(table)?;

    struct Pending {
        date: NaiveDate,
        year: i32,
        quarter: Quarter,
        category: String,
        budget: f64,
        realized: f64,
    }

    let mut pending = Vec::with_capacity(table.rows.len());
    let mut dropped = 0;

    for (idx, row) in table.rows.iter().enumerate() {
        // header occupies spreadsheet row 1
        let row_number = idx + 2;
        let cell = |col: usize| row.get(col).unwrap_or(&EMPTY_CELL);

        let budget = parse_money(cell(columns.budget), row_number, COL_BUDGET)?;
        let realized = parse_money(cell(columns.realized), row_number, COL_REALIZED)?;
        let (budget, realized) = match (budget, realized) {
            (Some(b), Some(r)) => (b, r),
            _ => {
                dropped += 1;
                continue;
            }
        };

        pending.push(Pending {
            date: parse_date_cell(cell(columns.date), row_number)?,
            year: parse_year_cell(cell(columns.year), row_number)?,
            quarter: parse_quarter_cell(cell(columns.quarter), row_number)?,
            category: parse_category_cell(cell(columns.category), row_number)?,
            budget,
            realized,
        });
    }

    if dropped > 0 {
        warn!(
            "Dropped {} rows without {} or {}",
            dropped, COL_BUDGET, COL_REALIZED
        );
    }

    let encoder = CategoryEncoder::fit(pending.iter().map(|p| p.category.as_str()), order);

    let mut records = Vec::with_capacity(pending.len());
    for p in pending {
        let category_key = encoder.encode(&p.category).ok_or_else(|| {
            DashboardError::data_format(0, COL_CATEGORY, format!("unencoded '{}'", p.category))
        })?;
        records.push(Record {
            date: p.date,
            year: p.year,
            quarter: p.quarter,
            category: p.category,
            category_key,
            budget: p.budget,
            realized: p.realized,
            remaining: p.budget - p.realized,
        });
    }

    info!(
        "Loaded {} records across {} expense categories from {}",
        records.len(),
        encoder.len(),
        source
    );

    Ok(Dataset::new(source.to_string(), records, encoder, dropped))
}

fn parse_money(cell: &RawCell, row: usize, column: &str) -> Result<Option<f64>> {
    match cell {
        RawCell::Empty => Ok(None),
        RawCell::Number(n) if n.is_nan() => Ok(None),
        RawCell::Number(n) => Ok(Some(*n)),
        RawCell::Text(text) => parse_amount(text).map(Some).ok_or_else(|| {
            DashboardError::data_format(row, column, format!("{} is not numeric", cell.describe()))
        }),
        RawCell::Date(_) => Err(DashboardError::data_format(
            row,
            column,
            format!("expected an amount, found date {}", cell.describe()),
        )),
    }
}

fn parse_date_cell(cell: &RawCell, row: usize) -> Result<NaiveDate> {
    match cell {
        RawCell::Date(date) => Ok(*date),
        RawCell::Text(text) => parse_date(text).ok_or_else(|| {
            DashboardError::data_format(row, COL_DATE, format!("unparsable date {}", cell.describe()))
        }),
        _ => Err(DashboardError::data_format(
            row,
            COL_DATE,
            format!("expected a date, found {}", cell.describe()),
        )),
    }
}

fn parse_year_cell(cell: &RawCell, row: usize) -> Result<i32> {
    let year = match cell {
        RawCell::Number(n) => year_from_number(*n),
        RawCell::Text(text) => parse_year(text),
        _ => None,
    };
    year.ok_or_else(|| {
        DashboardError::data_format(row, COL_YEAR, format!("invalid year {}", cell.describe()))
    })
}

fn parse_quarter_cell(cell: &RawCell, row: usize) -> Result<Quarter> {
    let quarter = match cell {
        RawCell::Text(text) => Quarter::from_label(text),
        RawCell::Number(n) if n.fract() == 0.0 && *n >= 0.0 => Quarter::from_ordinal(*n as u32),
        _ => None,
    };
    quarter.ok_or_else(|| {
        DashboardError::data_format(
            row,
            COL_QUARTER,
            format!("unrecognized quarter label {}", cell.describe()),
        )
    })
}

fn parse_category_cell(cell: &RawCell, row: usize) -> Result<String> {
    match cell {
        RawCell::Text(text) => Ok(text.trim().to_string()),
        RawCell::Empty => Err(DashboardError::data_format(
            row,
            COL_CATEGORY,
            "missing expense category",
        )),
        other => Ok(other.describe()),
    }
}
