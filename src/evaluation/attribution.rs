//! Вклад признаков в коррекцию (SHAP)

#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::residual::ResidualModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub mean_abs_shap: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    pub expected_value: f64,
    pub rows: usize,
    /// По убыванию среднего |SHAP|
    pub features: Vec<FeatureAttribution>,
}

impl AttributionReport {
    pub fn top(&self, n: usize) -> &[FeatureAttribution] {
        &self.features[..n.min(self.features.len())]
    }
}

pub fn explain(model: &ResidualModel, frame: &Frame) -> Result<AttributionReport> {
    if frame.is_empty() {
        return Err(ForecastError::InsufficientData { needed: 1, got: 0 });
    }
    let booster = model.booster();
    let X = model.design_matrix(frame);
    let phi = booster.contributions(&X)?;
    let n_features = model.feature_names().len();
    let gains = booster.feature_importance();

    let mut features: Vec<FeatureAttribution> = model
        .feature_names()
        .iter()
        .enumerate()
        .map(|(j, name)| FeatureAttribution {
            feature: name.clone(),
            mean_abs_shap: phi.column(j).mapv(f64::abs).mean().unwrap_or(0.0),
            gain: gains.iter().find(|(f, _)| f == name).map(|(_, g)| *g).unwrap_or(0.0),
        })
        .collect();
    features.sort_by(|a, b| b.mean_abs_shap.total_cmp(&a.mean_abs_shap));

    if let Some(top) = features.first() {
        tracing::info!(
            "Top residual driver: {} (mean |SHAP| {:.4}) over {} features",
            top.feature,
            top.mean_abs_shap,
            n_features
        );
    }

    Ok(AttributionReport {
        expected_value: booster.expected_value(),
        rows: frame.len(),
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::columns::{GDP_GROWTH, INFLATION, UNEMPLOYMENT};
    use crate::models::gradient_boosting::BoosterParams;
    use crate::models::residual::ResidualTrainer;
    use ndarray::Array2;

    #[test]
    fn informative_feature_ranks_first() {
        let years: Vec<i32> = (1980..2020).collect();
        let n = years.len();
        // остаток определяется только инфляцией
        let values = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => 6.0 + if i % 2 == 0 { 1.0 } else { -1.0 },
            1 => if i % 2 == 0 { 8.0 } else { 2.0 },
            _ => 5.0 + (i % 7) as f64 * 0.01,
        });
        let columns = vec![GDP_GROWTH.into(), INFLATION.into(), UNEMPLOYMENT.into()];
        let frame = Frame::new(years, columns, values).unwrap();
        let sarimax = vec![6.0; n];
        let params = BoosterParams {
            learning_rate: 0.3,
            num_boost_round: 30,
            alpha: 0.0,
            lambda: 1.0,
            ..Default::default()
        };
        let training = ResidualTrainer::new(params, 3).train(&frame, &sarimax).unwrap();

        let report = explain(&training.model, &frame).unwrap();
        assert_eq!(report.features[0].feature, INFLATION);
        assert!(report.features[0].mean_abs_shap > 0.1);
        assert_eq!(report.top(2).len(), 2);
        assert_eq!(report.features.len(), training.model.feature_names().len());
    }
}
