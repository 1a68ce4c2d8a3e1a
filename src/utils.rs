use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses a monetary amount that may carry thousands-separator commas,
/// e.g. `"1,250,000.50"`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a year written as `"2023"` or `"2023.0"`.
pub fn parse_year(text: &str) -> Option<i32> {
    let trimmed = text.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    year_from_number(trimmed.parse::<f64>().ok()?)
}

pub fn year_from_number(value: f64) -> Option<i32> {
    if value.is_finite() && value.fract() == 0.0 && (1.0..=9999.0).contains(&value) {
        Some(value as i32)
    } else {
        None
    }
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }

    None
}

/// `numerator / denominator * 100`, or 0 when the denominator is zero.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator * 100.0;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Formats a whole-rupiah amount with comma grouping: `Rp 1,234,567`.
pub fn format_rupiah(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}
