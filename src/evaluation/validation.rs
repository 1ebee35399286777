//! Проверка качества входных и обработанных данных

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{Frame, YEAR_COLUMN};
use crate::error::Result;

/// Колонки, без которых модель остатков теряет ключевые признаки
pub const EXPECTED_PROCESSED_COLUMNS: [&str; 5] = [
    "Inflation Rate (%)_lag2",
    "Bank Credit Growth (%)_lag1",
    "Exports (Billion USD)_lag1",
    "Fiscal Deficit (% of GDP)_lag1",
    "FDI (Billion USD)_lag1",
];

pub const MIN_YEAR: i32 = 1960;
pub const MAX_YEAR: i32 = 2035;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub label: String,
    pub rows: usize,
    pub columns: usize,
    pub missing_values: usize,
    pub missing_columns: Vec<String>,
    pub years_out_of_range: Vec<i32>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing_values == 0
            && self.missing_columns.is_empty()
            && self.years_out_of_range.is_empty()
    }

    fn log(&self) {
        if self.is_valid() {
            tracing::info!(
                "{}: {} rows, {} columns, no issues",
                self.label,
                self.rows,
                self.columns
            );
            return;
        }
        if self.missing_values > 0 {
            tracing::warn!("{}: {} missing values", self.label, self.missing_values);
        }
        if !self.missing_columns.is_empty() {
            tracing::warn!("{}: missing columns {:?}", self.label, self.missing_columns);
        }
        if !self.years_out_of_range.is_empty() {
            tracing::warn!(
                "{}: years outside [{}, {}]: {:?}",
                self.label,
                MIN_YEAR,
                MAX_YEAR,
                self.years_out_of_range
            );
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} rows x {} columns", self.label, self.rows, self.columns)?;
        writeln!(f, "  missing values: {}", self.missing_values)?;
        if !self.missing_columns.is_empty() {
            writeln!(f, "  missing columns: {}", self.missing_columns.join(", "))?;
        }
        if !self.years_out_of_range.is_empty() {
            writeln!(f, "  years out of range: {:?}", self.years_out_of_range)?;
        }
        write!(f, "  status: {}", if self.is_valid() { "OK" } else { "ISSUES FOUND" })
    }
}

fn out_of_range(years: impl IntoIterator<Item = i32>) -> Vec<i32> {
    years
        .into_iter()
        .filter(|y| !(MIN_YEAR..=MAX_YEAR).contains(y))
        .collect()
}

pub fn validate_frame(label: &str, frame: &Frame, expected: &[&str]) -> ValidationReport {
    let report = ValidationReport {
        label: label.to_string(),
        rows: frame.len(),
        columns: frame.columns().len(),
        missing_values: frame.missing_count(),
        missing_columns: expected
            .iter()
            .filter(|c| !frame.has_column(c))
            .map(|c| c.to_string())
            .collect(),
        years_out_of_range: out_of_range(frame.years().iter().copied()),
    };
    report.log();
    report
}

/// Проверка произвольного CSV: пустые ячейки, нужные колонки и
/// диапазон колонки `Year`, если она есть.
pub fn validate_csv<P: AsRef<Path>>(
    label: &str,
    path: P,
    expected: &[&str],
) -> Result<ValidationReport> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    let headers = reader.headers()?.clone();
    let year_idx = headers.iter().position(|h| h == YEAR_COLUMN);

    let mut rows = 0;
    let mut missing_values = 0;
    let mut years = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows += 1;
        missing_values += record
            .iter()
            .filter(|v| v.is_empty() || v.eq_ignore_ascii_case("nan"))
            .count();
        let year = year_idx.and_then(|i| record.get(i));
        if let Some(year) = year.and_then(|v| v.parse::<f64>().ok()) {
            years.push(year as i32);
        }
    }

    let report = ValidationReport {
        label: label.to_string(),
        rows,
        columns: headers.len(),
        missing_values,
        missing_columns: expected
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .map(|c| c.to_string())
            .collect(),
        years_out_of_range: out_of_range(years),
    };
    report.log();
    Ok(report)
}
