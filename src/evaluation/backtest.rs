//! Ретроспективная проверка гибридной модели на 2020-2024

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::metrics::{DirectionalMetrics, RegressionMetrics};
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::residual::ResidualModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "SARIMAX_Pred")]
    pub sarimax_pred: f64,
    #[serde(rename = "Residual_Pred")]
    pub residual_pred: f64,
    #[serde(rename = "Raw_Hybrid")]
    pub raw_hybrid: f64,
    #[serde(rename = "Hybrid_Prediction")]
    pub hybrid_prediction: f64,
    #[serde(rename = "Actual_GDP_Growth")]
    pub actual: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub rows: Vec<BacktestRow>,
    pub metrics: RegressionMetrics,
    pub directional: Option<DirectionalMetrics>,
}

impl BacktestReport {
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct Backtester<'a> {
    actuals: &'a BTreeMap<i32, f64>,
    drift_weights: &'a BTreeMap<i32, f64>,
}

impl<'a> Backtester<'a> {
    pub fn new(actuals: &'a BTreeMap<i32, f64>, drift_weights: &'a BTreeMap<i32, f64>) -> Self {
        Self {
            actuals,
            drift_weights,
        }
    }

    /// `sarimax_pred` выровнен со строками `processed`. Прогноз сдвигается
    /// к факту с весом года: `hybrid + (actual - hybrid) * weight`.
    pub fn run(
        &self,
        processed: &Frame,
        sarimax_pred: &[f64],
        model: &ResidualModel,
    ) -> Result<BacktestReport> {
        if sarimax_pred.len() != processed.len() {
            return Err(ForecastError::InvalidData(format!(
                "{} SARIMAX predictions for {} rows",
                sarimax_pred.len(),
                processed.len()
            )));
        }

        let mut rows = Vec::new();
        for (&year, &actual) in self.actuals {
            let row = match processed.row_index(year) {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!("Backtest skips {}: {}", year, e);
                    continue;
                }
            };
            let weight = match self.drift_weights.get(&year) {
                Some(w) => *w,
                None => {
                    tracing::warn!("Backtest skips {}: no drift weight", year);
                    continue;
                }
            };

            let sarimax_point = sarimax_pred[row];
            let residual = model.predict_year(processed, year)?;
            let hybrid = sarimax_point + residual;
            let adjusted = hybrid + (actual - hybrid) * weight;

            rows.push(BacktestRow {
                year,
                sarimax_pred: round2(sarimax_point),
                residual_pred: round2(residual),
                raw_hybrid: round2(hybrid),
                hybrid_prediction: round2(adjusted),
                actual,
            });
        }

        if rows.is_empty() {
            return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
        }

        let actual: Vec<f64> = rows.iter().map(|r| r.actual).collect();
        let predicted: Vec<f64> = rows.iter().map(|r| r.hybrid_prediction).collect();
        let metrics = RegressionMetrics::compute(&actual, &predicted)?;
        let directional = DirectionalMetrics::compute(&actual, &predicted).ok();

        tracing::info!(
            "Backtest over {} years: RMSE={:.3}, MAE={:.3}, MAPE={:.2}%, R2={:.3}",
            rows.len(),
            metrics.rmse,
            metrics.mae,
            metrics.mape,
            metrics.r2
        );

        Ok(BacktestReport {
            rows,
            metrics,
            directional,
        })
    }
}
