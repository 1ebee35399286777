//! Метрики качества прогноза

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// В процентах; строки с нулевым фактом не учитываются
    pub mape: f64,
    pub r2: f64,
    pub n: usize,
}

impl RegressionMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        check_lengths(actual, predicted)?;
        Ok(Self {
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            mape: mape(actual, predicted),
            r2: r2(actual, predicted),
            n: actual.len(),
        })
    }
}

fn check_lengths(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::InvalidData(format!(
            "{} actual values vs {} predictions",
            actual.len(),
            predicted.len()
        )));
    }
    if actual.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    Ok(())
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let mse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    mse.sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let terms: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, p)| ((a - p) / a).abs())
        .collect();
    if terms.is_empty() {
        return f64::NAN;
    }
    terms.iter().sum::<f64>() / terms.len() as f64 * 100.0
}

/// Коэффициент детерминации; для постоянного ряда 1 при точном совпадении, иначе 0
pub fn r2(actual: &[f64], predicted: &[f64]) -> f64 {
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Классификация направления изменения (рост = 1, иначе 0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `[[TN, FP], [FN, TP]]`: строки факт, колонки прогноз
    pub confusion: [[usize; 2]; 2],
    pub n: usize,
}

pub fn directions(values: &[f64]) -> Vec<bool> {
    values.windows(2).map(|w| w[1] - w[0] > 0.0).collect()
}

impl DirectionalMetrics {
    /// Первый год без предыдущего значения пропускается
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        check_lengths(actual, predicted)?;
        if actual.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: actual.len(),
            });
        }

        let mut confusion = [[0usize; 2]; 2];
        for (a, p) in directions(actual).into_iter().zip(directions(predicted)) {
            confusion[a as usize][p as usize] += 1;
        }

        let [[tn, fp], [fn_, tp]] = confusion;
        let n = tn + fp + fn_ + tp;
        // sklearn: 0 при нулевом знаменателе
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Ok(Self {
            accuracy: ratio(tp + tn, n),
            precision,
            recall,
            f1,
            confusion,
            n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn regression_metrics_match_hand_computation() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.5, 2.0, 2.0, 4.5];
        let m = RegressionMetrics::compute(&actual, &predicted).unwrap();

        assert_relative_eq!(m.rmse, (1.5f64 / 4.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(m.mae, 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.mape, (0.5 + 0.0 + 1.0 / 3.0 + 0.125) / 4.0 * 100.0, epsilon = 1e-9);
        assert_relative_eq!(m.r2, 1.0 - 1.5 / 5.0, epsilon = 1e-12);
        assert_eq!(m.n, 4);
    }

    #[test]
    fn mape_ignores_zero_actuals() {
        assert_relative_eq!(mape(&[0.0, 2.0], &[1.0, 1.0]), 50.0, epsilon = 1e-12);
        assert!(mape(&[0.0], &[1.0]).is_nan());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_err());
        assert!(RegressionMetrics::compute(&[], &[]).is_err());
    }

    #[test]
    fn directional_confusion_matrix() {
        // факт: вверх, вниз, вверх, вверх; прогноз: вверх, вверх, вниз, вверх
        let actual = [1.0, 2.0, 1.0, 2.0, 3.0];
        let predicted = [1.0, 2.0, 3.0, 2.0, 3.0];
        let d = DirectionalMetrics::compute(&actual, &predicted).unwrap();

        assert_eq!(d.n, 4);
        assert_eq!(d.confusion, [[0, 1], [1, 2]]);
        assert_relative_eq!(d.accuracy, 0.5);
        assert_relative_eq!(d.precision, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(d.recall, 2.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(d.f1, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn no_predicted_rises_gives_zero_precision() {
        let d = DirectionalMetrics::compute(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert_eq!(d.precision, 0.0);
        assert_eq!(d.f1, 0.0);
        assert_eq!(d.accuracy, 0.0);
    }
}
