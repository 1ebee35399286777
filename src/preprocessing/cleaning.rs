//! Очистка национального датасета: дубликаты, выбросы, интерполяция

use serde::{Deserialize, Serialize};

use crate::data::columns::{GDP_GROWTH, IQR_COLUMNS};
use crate::data::Frame;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub rows_missing_target: usize,
    /// (колонка, количество заменённых выбросов)
    pub outliers: Vec<(String, usize)>,
    pub interpolated_cells: usize,
    pub rows_out: usize,
}

pub struct DataCleaner {
    iqr_multiplier: f64,
}

impl DataCleaner {
    pub fn new(iqr_multiplier: f64) -> Self {
        Self { iqr_multiplier }
    }

    pub fn clean(&self, raw: &Frame) -> Result<(Frame, CleaningReport)> {
        let mut report = CleaningReport {
            rows_in: raw.len(),
            ..Default::default()
        };

        let mut frame = raw.clone();
        report.duplicates_removed = frame.drop_duplicate_rows();

        // Без целевой переменной строка бесполезна
        let gdp = frame.column_vec(GDP_GROWTH)?;
        let before = frame.len();
        frame = frame.filter_rows(|i| !gdp[i].is_nan());
        report.rows_missing_target = before - frame.len();

        // Границы считаются по исходной колонке, а не по уже очищенной
        for column in IQR_COLUMNS {
            if !frame.has_column(column) {
                continue;
            }
            let mut values = frame.column_vec(column)?;
            let removed = self.null_outliers(&mut values);
            tracing::info!("{}: removing {} outlier(s)", column, removed);
            frame.set_column(column, values)?;
            report.outliers.push((column.to_string(), removed));
        }

        frame.sort_by_year();

        let columns: Vec<String> = frame.columns().to_vec();
        for column in &columns {
            let mut values = frame.column_vec(column)?;
            report.interpolated_cells += interpolate_linear(&mut values);
            frame.set_column(column, values)?;
        }

        report.rows_out = frame.len();
        tracing::info!(
            "Cleaned dataset: {} -> {} rows, {} cells interpolated",
            report.rows_in,
            report.rows_out,
            report.interpolated_cells
        );
        Ok((frame, report))
    }

    /// Заменяет значения вне [Q1 - k*IQR, Q3 + k*IQR] на NaN
    pub fn null_outliers(&self, values: &mut [f64]) -> usize {
        let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let (q1, q3) = match (quantile(&present, 0.25), quantile(&present, 0.75)) {
            (Some(q1), Some(q3)) => (q1, q3),
            _ => return 0,
        };
        let iqr = q3 - q1;
        let lower = q1 - self.iqr_multiplier * iqr;
        let upper = q3 + self.iqr_multiplier * iqr;

        let mut removed = 0;
        for value in values.iter_mut() {
            if *value < lower || *value > upper {
                *value = f64::NAN;
                removed += 1;
            }
        }
        removed
    }
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(3.0)
    }
}

/// Квантиль с линейной интерполяцией между порядковыми статистиками
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Линейная интерполяция пропусков по позиции, края заполняются ближайшим значением.
/// Возвращает количество заполненных ячеек.
pub fn interpolate_linear(values: &mut [f64]) -> usize {
    let known: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    let (first, last) = match (known.first(), known.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => return 0,
    };

    let mut filled = 0;
    for i in 0..first {
        values[i] = values[first];
        filled += 1;
    }
    for i in (last + 1)..values.len() {
        values[i] = values[last];
        filled += 1;
    }
    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (va, vb) = (values[a], values[b]);
        for i in (a + 1)..b {
            let t = (i - a) as f64 / (b - a) as f64;
            values[i] = va + (vb - va) * t;
            filled += 1;
        }
    }
    filled
}
