use anggaran_dashboard::*;
use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const HEADER: &str = "Tanggal,Tahun,Triwulan,Jenis Belanja,Anggaran,Realisasi";
const CATEGORIES: [&str; 3] = ["Belanja Barang", "Belanja Modal", "Belanja Pegawai"];
const ROMAN: [&str; 4] = ["I", "II", "III", "IV"];

fn quarter_end(year: i32, quarter: usize) -> String {
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        _ => (12, 31),
    };
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Three categories over full years, with amounts written the way the
/// source sheet writes them ("1,234,000").
fn history_csv(years: &[i32]) -> String {
    let mut lines = vec![HEADER.to_string()];
    for &year in years {
        let y = (year - 2023) as f64;
        for quarter in 1..=4 {
            let q = quarter as f64;
            for (key, category) in CATEGORIES.iter().enumerate() {
                let k = key as f64;
                let budget = 1_000_000.0 + 30_000.0 * q * q + 70_000.0 * k * k + 15_000.0 * y
                    + 5_000.0 * q * k;
                let remaining = 100_000.0
                    + 3_000.0 * q * k * k
                    + 40_000.0 * (quarter % 2) as f64
                    + 7_000.0 * k * y;
                lines.push(format!(
                    "{},{},{},{},\"{}\",\"{}\"",
                    quarter_end(year, quarter),
                    year,
                    ROMAN[quarter - 1],
                    category,
                    with_commas(budget),
                    with_commas(budget - remaining)
                ));
            }
        }
    }
    lines.join("\n")
}

fn with_commas(value: f64) -> String {
    format_rupiah(value).trim_start_matches("Rp ").to_string()
}

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn session_for(path: &Path) -> DashboardSession {
    DashboardSession::open(DashboardConfig::with_source(path.to_string_lossy())).unwrap()
}

#[test]
fn test_reference_example_totals() {
    let dir = TempDir::new().unwrap();
    let csv = format!(
        "{}\n2023-03-31,2023,I,Pegawai,\"1,000\",800\n2023-03-31,2023,I,Modal,500,500\n2023-06-30,2023,II,Pegawai,\"1,200\",600\n",
        HEADER
    );
    let path = write_file(&dir, "contoh.csv", csv.as_bytes());
    let mut session = session_for(&path);

    let overview = session.overview().unwrap();
    assert_eq!(overview.kpis.total_budget, 2700.0);
    assert_eq!(overview.kpis.total_realized, 1900.0);
    assert!((overview.kpis.realization_percent - 70.37).abs() < 0.005);

    let pegawai = overview
        .by_category
        .get(&"Pegawai".to_string())
        .unwrap();
    assert_eq!(pegawai.remaining, 800.0);
    let modal = overview.by_category.get(&"Modal".to_string()).unwrap();
    assert_eq!(modal.remaining, 0.0);
    assert_eq!(overview.remaining_by_category[0].key, "Pegawai");

    // three groups cannot support a five-feature regression
    let forecast = session.forecast();
    assert!(matches!(forecast, Err(DashboardError::ModelFit(_))));
    assert!(!forecast.unwrap_err().is_load_error());

    // the other views keep working
    assert!(session.insights().is_ok());
    assert!(session.overview().is_ok());
}

#[test]
fn test_full_pipeline_from_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023, 2024]).as_bytes());
    let mut session = session_for(&path);

    let dataset = session.dataset().unwrap();
    assert_eq!(dataset.len(), 24);
    for record in dataset.records() {
        assert!((record.remaining - (record.budget - record.realized)).abs() < 1e-6);
        let key = dataset.encoder().encode(&record.category).unwrap();
        assert_eq!(key, record.category_key);
        assert_eq!(dataset.encoder().decode(key), Some(record.category.as_str()));
    }

    let forecast = session.forecast().unwrap();
    assert_eq!(forecast.rows.len(), 2 * CATEGORIES.len());
    let pairs: HashSet<(Quarter, String)> = forecast
        .rows
        .iter()
        .map(|r| (r.quarter, r.category.clone()))
        .collect();
    assert_eq!(pairs.len(), 6);
    for category in CATEGORIES {
        assert!(pairs.contains(&(Quarter::III, category.to_string())));
        assert!(pairs.contains(&(Quarter::IV, category.to_string())));
    }
    assert_eq!(forecast.assessment, ModelAssessment::Adequate);

    let insights = session.insights().unwrap();
    assert_eq!(insights.best_year.unwrap().key, 2024);
    assert_eq!(insights.best_category.unwrap().key, "Belanja Pegawai");

    let workbook = session.export_predictions().unwrap();
    let table = RawTable::from_xlsx_bytes(workbook, None).unwrap();
    assert_eq!(table.rows.len(), 6);
    assert_eq!(table.headers[4], COL_PREDICTION);
}

#[test]
fn test_year_quarter_totals_match_year_totals() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023, 2024]).as_bytes());
    let mut session = session_for(&path);
    let dataset = session.dataset().unwrap();

    let fine = by_year_quarter_category(dataset.records());
    let coarse = by_year_category(dataset.records());
    for row in coarse.rows() {
        let budget: f64 = fine
            .rows()
            .iter()
            .filter(|f| f.key.year == row.key.year && f.key.category == row.key.category)
            .map(|f| f.budget)
            .sum();
        assert!((budget - row.budget).abs() < 1e-6);
    }
}

#[test]
fn test_xlsx_source_round_trip() {
    let mut sheet = Sheet::new(
        "Data",
        &[COL_DATE, COL_YEAR, COL_QUARTER, COL_CATEGORY, COL_BUDGET, COL_REALIZED],
    );
    sheet.push_row(vec![
        "2024-03-31".into(),
        2024.into(),
        "I".into(),
        "Belanja Modal".into(),
        "2,500,000".into(),
        1_000_000.0.into(),
    ]);
    sheet.push_row(vec![
        "2024-06-30".into(),
        2024.into(),
        "II".into(),
        "Belanja Barang".into(),
        750_000.0.into(),
        "".into(),
    ]);
    let bytes = export_tables(&[sheet]).unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.xlsx", &bytes);
    let mut session = session_for(&path);

    let dataset = session.dataset().unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.dropped_rows(), 1);
    let record = &dataset.records()[0];
    assert_eq!(record.year, 2024);
    assert_eq!(record.budget, 2_500_000.0);
    assert_eq!(record.remaining, 1_500_000.0);
}

#[test]
fn test_xlsx_native_date_cells() {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let worksheet = workbook.add_worksheet();
    for (col, header) in [COL_DATE, COL_YEAR, COL_QUARTER, COL_CATEGORY, COL_BUDGET, COL_REALIZED]
        .iter()
        .enumerate()
    {
        worksheet.write_string(0, col as u16, *header).unwrap();
    }
    let dates = [(2024, 3, 31, "I"), (2024, 9, 30, "III")];
    for (idx, &(year, month, day, quarter)) in dates.iter().enumerate() {
        let row = idx as u32 + 1;
        let date = ExcelDateTime::from_ymd(year, month, day).unwrap();
        worksheet
            .write_datetime_with_format(row, 0, &date, &date_format)
            .unwrap();
        worksheet.write_number(row, 1, year as f64).unwrap();
        worksheet.write_string(row, 2, quarter).unwrap();
        worksheet.write_string(row, 3, "Belanja Pegawai").unwrap();
        worksheet.write_number(row, 4, 1_000_000.0).unwrap();
        worksheet.write_number(row, 5, 750_000.0).unwrap();
    }
    let bytes = workbook.save_to_buffer().unwrap();

    let table = RawTable::from_xlsx_bytes(bytes.clone(), None).unwrap();
    assert!(matches!(table.rows[0][0], RawCell::Date(_)));

    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "tanggal.xlsx", &bytes);
    let mut session = session_for(&path);
    let dataset = session.dataset().unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(
        dataset.records()[0].date,
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    );
    assert_eq!(
        dataset.records()[1].date,
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    );
    assert_eq!(dataset.records()[1].quarter, Quarter::III);
}

#[test]
fn test_malformed_source_aborts_open() {
    let dir = TempDir::new().unwrap();
    let csv = format!("{}\n2023-03-31,2023,I,Pegawai,satu juta,800\n", HEADER);
    let path = write_file(&dir, "rusak.csv", csv.as_bytes());

    let result = DashboardSession::open(DashboardConfig::with_source(path.to_string_lossy()));
    let err = result.unwrap_err();
    assert!(err.is_load_error());
    assert!(matches!(err, DashboardError::DataFormat { row: 2, .. }));
}

#[test]
fn test_missing_file_is_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tidak-ada.xlsx");
    let err =
        DashboardSession::open(DashboardConfig::with_source(path.to_string_lossy())).unwrap_err();
    assert!(matches!(err, DashboardError::IoError(_)));
}

#[test]
fn test_dataset_is_cached_until_reload() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023]).as_bytes());
    let mut session = session_for(&path);

    let first = session.dataset().unwrap();
    let second = session.dataset().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    fs::write(&path, history_csv(&[2023, 2024])).unwrap();
    assert_eq!(session.dataset().unwrap().len(), 12);

    let reloaded = session.reload().unwrap();
    assert_eq!(reloaded.len(), 24);
    assert!(!Arc::ptr_eq(&first, &reloaded));
}

#[test]
fn test_exploration_and_export() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023, 2024]).as_bytes());
    let mut session = session_for(&path);

    let dataset = session.dataset().unwrap();
    assert_eq!(year_options(dataset.records()), vec![2024, 2023]);

    let criteria = FilterCriteria {
        categories: vec!["Belanja Modal".to_string()],
        year: Some(2024),
        quarters: Some(vec![Quarter::I, Quarter::II]),
    };
    let exploration = session.explore(&criteria).unwrap();
    assert_eq!(exploration.records.len(), 2);
    assert_eq!(exploration.by_year_quarter.len(), 2);

    let bytes = session.export_exploration(&criteria).unwrap();
    let filtered = RawTable::from_xlsx_bytes(bytes.clone(), Some("Data Terfilter")).unwrap();
    assert_eq!(filtered.rows.len(), 2);

    // the filtered sheet is itself a valid source
    let reread = clean(&filtered, "export", CategoryOrder::Sorted).unwrap();
    assert_eq!(reread.len(), 2);
    assert_eq!(reread.records()[0].category, "Belanja Modal");

    let summary = RawTable::from_xlsx_bytes(bytes, Some("Kinerja Triwulan")).unwrap();
    assert_eq!(summary.rows[0][0], RawCell::Text("2024-TWI".to_string()));
}

#[test]
fn test_empty_selection_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023, 2024]).as_bytes());
    let mut session = session_for(&path);

    let nothing = FilterCriteria {
        categories: vec![],
        year: Some(2024),
        quarters: None,
    };
    assert!(matches!(
        session.explore(&nothing),
        Err(DashboardError::EmptyResult(_))
    ));
    assert!(matches!(
        session.export_exploration(&nothing),
        Err(DashboardError::EmptyResult(_))
    ));

    let wrong_year = FilterCriteria {
        categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
        year: Some(2019),
        quarters: None,
    };
    match session.explore(&wrong_year) {
        Err(DashboardError::EmptyResult(message)) => assert!(message.contains("2019")),
        other => panic!("expected EmptyResult, got {:?}", other),
    }

    assert!(session.forecast().is_ok());
}

#[test]
fn test_overview_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "realisasi.csv", history_csv(&[2023, 2024]).as_bytes());
    let mut session = session_for(&path);

    let overview = session.overview().unwrap();
    let json = serde_json::to_value(&overview).unwrap();
    assert!(json["kpis"]["total_budget"].as_f64().unwrap() > 0.0);
    assert_eq!(json["quarters_by_year"]["2023"].as_array().unwrap().len(), 4);
}
