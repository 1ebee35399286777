//! Нормализация данных

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataNormalizer {
    center: bool,
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataNormalizer {
    pub fn new() -> Self {
        Self {
            center: true,
            mean: None,
            std: None,
        }
    }

    /// Только масштабирование, без вычитания среднего (для регрессии без свободного члена)
    pub fn scale_only() -> Self {
        Self {
            center: false,
            mean: None,
            std: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.std.is_some()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(ForecastError::InvalidData("empty dataset".to_string()));
        }

        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| ForecastError::InvalidData("failed to compute mean".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < 1e-10 || !val.is_finite() {
                *val = 1.0;
            }
        }

        self.mean = Some(if self.center {
            mean
        } else {
            Array1::zeros(X.ncols())
        });
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(ForecastError::NotTrained),
        };
        if X.ncols() != std.len() {
            return Err(ForecastError::InvalidData(format!(
                "expected {} columns, got {}",
                std.len(),
                X.ncols()
            )));
        }

        // (X - mean) / std
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    /// Переводит коэффициенты, оценённые на масштабированных признаках, в исходный масштаб
    pub fn unscale_coefficients(&self, beta: &Array1<f64>) -> Result<Array1<f64>> {
        let std = self.std.as_ref().ok_or(ForecastError::NotTrained)?;
        if beta.len() != std.len() {
            return Err(ForecastError::InvalidData(format!(
                "expected {} coefficients, got {}",
                std.len(),
                beta.len()
            )));
        }
        Ok(beta / std)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardizes_columns() {
        let X = array![[1.0, 10.0], [3.0, 10.0]];
        let scaled = DataNormalizer::new().fit_transform(&X).unwrap();
        assert_eq!(scaled, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn default_centers_like_new() {
        let X = array![[2.0], [4.0]];
        let scaled = DataNormalizer::default().fit_transform(&X).unwrap();
        assert_eq!(scaled, DataNormalizer::new().fit_transform(&X).unwrap());
        assert_eq!(scaled, array![[-1.0], [1.0]]);
    }

    #[test]
    fn scale_only_keeps_linear_predictions() {
        let X = array![[1.0, 4.0], [2.0, 0.0], [4.0, 2.0]];
        let beta = array![0.5, -1.5];
        let mut normalizer = DataNormalizer::scale_only();
        let scaled = normalizer.fit_transform(&X).unwrap();

        // коэффициенты в масштабированном пространстве
        let std = X.std_axis(Axis(0), 0.0);
        let beta_scaled = &beta * &std;
        let restored = normalizer.unscale_coefficients(&beta_scaled).unwrap();
        for (a, b) in restored.iter().zip(beta.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        let original = X.dot(&beta);
        let via_scaled = scaled.dot(&beta_scaled);
        for (a, b) in original.iter().zip(via_scaled.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn transform_requires_fit() {
        let X = array![[1.0]];
        assert!(DataNormalizer::new().transform(&X).is_err());
    }
}
