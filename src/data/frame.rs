//! Табличные данные по годам
//!
//! `Frame` хранит числовые показатели, проиндексированные годом. Пропуски
//! представлены `NaN`, как в исходных CSV.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

pub const YEAR_COLUMN: &str = "Year";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    years: Vec<i32>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Frame {
    pub fn new(years: Vec<i32>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != years.len() || values.ncols() != columns.len() {
            return Err(ForecastError::InvalidData(format!(
                "frame shape {:?} does not match {} years x {} columns",
                values.dim(),
                years.len(),
                columns.len()
            )));
        }
        Ok(Self {
            years,
            columns,
            values,
        })
    }

    /// Пустая таблица с заданными годами и без колонок
    pub fn with_years(years: Vec<i32>) -> Self {
        let n = years.len();
        Self {
            years,
            columns: Vec::new(),
            values: Array2::zeros((n, 0)),
        }
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .position(name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))?;
        Ok(self.values.column(idx))
    }

    pub fn column_vec(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.column(name)?.to_vec())
    }

    /// Добавляет колонку или заменяет существующую
    pub fn set_column(&mut self, name: &str, data: Vec<f64>) -> Result<()> {
        if data.len() != self.len() {
            return Err(ForecastError::InvalidData(format!(
                "column '{}' has {} values, frame has {} rows",
                name,
                data.len(),
                self.len()
            )));
        }

        match self.position(name) {
            Some(idx) => {
                for (cell, value) in self.values.column_mut(idx).iter_mut().zip(data) {
                    *cell = value;
                }
            }
            None => {
                let column = Array1::from(data);
                self.values
                    .push_column(column.view())
                    .map_err(|e| ForecastError::InvalidData(e.to_string()))?;
                self.columns.push(name.to_string());
            }
        }
        Ok(())
    }

    pub fn row_index(&self, year: i32) -> Result<usize> {
        self.years
            .iter()
            .position(|&y| y == year)
            .ok_or(ForecastError::MissingYear(year))
    }

    pub fn get(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.position(name)?;
        self.values.get((row, col)).copied()
    }

    pub fn value_at(&self, year: i32, name: &str) -> Result<f64> {
        let row = self.row_index(year)?;
        self.get(row, name)
            .ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    pub fn push_row(&mut self, year: i32, row: &[f64]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ForecastError::InvalidData(format!(
                "row has {} values, frame has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.values
            .push_row(ArrayView1::from(row))
            .map_err(|e| ForecastError::InvalidData(e.to_string()))?;
        self.years.push(year);
        Ok(())
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            years: indices.iter().map(|&i| self.years[i]).collect(),
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Матрица признаков в порядке `names`
    pub fn select_columns(&self, names: &[String]) -> Result<Array2<f64>> {
        let indices = names
            .iter()
            .map(|name| {
                self.position(name)
                    .ok_or_else(|| ForecastError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.values.select(Axis(1), &indices))
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.len()).filter(|&i| keep(i)).collect();
        self.select_rows(&indices)
    }

    pub fn sort_by_year(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.years[i]);
        *self = self.select_rows(&order);
    }

    /// Удаляет полностью совпадающие строки (NaN считается равным NaN)
    pub fn drop_duplicate_rows(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let mut key: Vec<u64> = Vec::with_capacity(self.columns.len() + 1);
            key.push(self.years[i] as u64);
            key.extend(self.values.row(i).iter().map(|v| canonical_bits(*v)));
            if seen.insert(key) {
                keep.push(i);
            }
        }
        let removed = self.len() - keep.len();
        if removed > 0 {
            *self = self.select_rows(&keep);
        }
        removed
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Чтение CSV: колонка `Year` обязательна. Нечитаемые ячейки становятся `NaN`,
    /// полностью текстовые колонки отбрасываются.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let year_idx = headers
            .iter()
            .position(|h| h == YEAR_COLUMN)
            .ok_or_else(|| ForecastError::MissingColumn(YEAR_COLUMN.to_string()))?;

        let mut years = Vec::new();
        let mut cells: Vec<Vec<f64>> = Vec::new();
        // колонка отбрасывается, только если в ней есть текст и нет ни одного числа
        let mut parsed = vec![false; headers.len()];
        let mut text = vec![false; headers.len()];

        for record in reader.records() {
            let record = record?;
            let year = match record.get(year_idx).and_then(|s| s.parse::<f64>().ok()) {
                Some(y) if y.is_finite() => y as i32,
                _ => continue,
            };

            let mut row = Vec::with_capacity(headers.len());
            for idx in 0..headers.len() {
                let raw = record.get(idx).unwrap_or("");
                let value = if raw.is_empty() {
                    f64::NAN
                } else {
                    match raw.parse::<f64>() {
                        Ok(v) => {
                            parsed[idx] = true;
                            v
                        }
                        Err(_) => {
                            text[idx] = true;
                            f64::NAN
                        }
                    }
                };
                row.push(value);
            }
            years.push(year);
            cells.push(row);
        }

        let kept: Vec<usize> = (0..headers.len())
            .filter(|&i| i != year_idx && (parsed[i] || !text[i]))
            .collect();
        let columns: Vec<String> = kept.iter().map(|&i| headers[i].clone()).collect();

        let mut values = Array2::from_elem((years.len(), kept.len()), f64::NAN);
        for (r, row) in cells.iter().enumerate() {
            for (c, &src) in kept.iter().enumerate() {
                values[[r, c]] = row[src];
            }
        }

        Self::new(years, columns, values)
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(file)
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(YEAR_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (i, year) in self.years.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(year.to_string());
            record.extend(self.values.row(i).iter().map(|v| {
                if v.is_nan() {
                    String::new()
                } else {
                    v.to_string()
                }
            }));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}
