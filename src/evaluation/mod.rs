/// Оценка качества: метрики, бэктест, проверки сценариев и данных

pub mod attribution;
pub mod backtest;
pub mod metrics;
pub mod scenario_checks;
pub mod validation;

pub use attribution::{explain, AttributionReport, FeatureAttribution};
pub use backtest::{BacktestReport, BacktestRow, Backtester};
pub use metrics::{DirectionalMetrics, RegressionMetrics};
pub use scenario_checks::{ScenarioCheckReport, ScenarioValidator};
pub use validation::{validate_csv, validate_frame, ValidationReport};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::columns::GDP_GROWTH;
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::scenario::ScenarioForecast;

/// Качество SARIMAX на истории и величина коррекции по сценариям
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub sarimax: RegressionMetrics,
    /// Итоговый прогноз относительно SARIMAX; MAPE = |коррекция / SARIMAX|
    pub correction: RegressionMetrics,
}

impl ModelEvaluation {
    /// `overrides` заменяет факт отдельных лет перед сравнением
    pub fn compute(
        history: &Frame,
        sarimax_in_sample: &[f64],
        forecasts: &[ScenarioForecast],
        overrides: &BTreeMap<i32, f64>,
    ) -> Result<Self> {
        if sarimax_in_sample.len() != history.len() {
            return Err(ForecastError::InvalidData(format!(
                "{} in-sample predictions for {} rows",
                sarimax_in_sample.len(),
                history.len()
            )));
        }

        let gdp = history.column_vec(GDP_GROWTH)?;
        let (actual, predicted): (Vec<f64>, Vec<f64>) = history
            .years()
            .iter()
            .zip(gdp)
            .zip(sarimax_in_sample)
            .map(|((year, value), pred)| (overrides.get(year).copied().unwrap_or(value), *pred))
            .filter(|(a, p)| a.is_finite() && p.is_finite())
            .unzip();
        let sarimax = RegressionMetrics::compute(&actual, &predicted)?;

        let (base, finals): (Vec<f64>, Vec<f64>) = forecasts
            .iter()
            .flat_map(|f| f.rows.iter().map(|r| (r.sarimax_pred, r.final_forecast)))
            .unzip();
        let correction = RegressionMetrics::compute(&base, &finals)?;

        tracing::info!(
            "SARIMAX in-sample RMSE={:.3}, MAE={:.3}; correction RMSE={:.3}, MAPE={:.2}%",
            sarimax.rmse,
            sarimax.mae,
            correction.rmse,
            correction.mape
        );
        Ok(Self { sarimax, correction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scenario::{ForecastRow, Scenario};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn overrides_replace_actuals_and_corrections_are_measured() {
        let history = Frame::new(
            vec![2019, 2020, 2021],
            vec![GDP_GROWTH.into()],
            array![[4.0], [-6.6], [8.7]],
        )
        .unwrap();
        let in_sample = [4.0, -7.3, 8.7];
        let overrides = BTreeMap::from([(2020, -7.3)]);
        let forecasts = vec![ScenarioForecast {
            scenario: Scenario::Baseline,
            rows: vec![
                ForecastRow {
                    year: 2025,
                    sarimax_pred: 6.0,
                    correction: 0.6,
                    final_forecast: 6.6,
                    lower: 5.0,
                    upper: 8.0,
                },
                ForecastRow {
                    year: 2026,
                    sarimax_pred: 5.0,
                    correction: -0.5,
                    final_forecast: 4.5,
                    lower: 4.0,
                    upper: 6.0,
                },
            ],
        }];

        let eval = ModelEvaluation::compute(&history, &in_sample, &forecasts, &overrides).unwrap();
        assert_relative_eq!(eval.sarimax.rmse, 0.0);
        assert_relative_eq!(eval.correction.mae, 0.55, epsilon = 1e-12);
        assert_relative_eq!(eval.correction.mape, 10.0, epsilon = 1e-9);
    }
}
