//! Модель коррекции: бустинг на остатках SARIMAX

#![allow(non_snake_case)]

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::columns::{GDP_GROWTH, NON_FEATURE_COLUMNS, RESIDUAL, SARIMAX_PRED};
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::cross_validation::TimeSeriesSplit;
use crate::models::gradient_boosting::{rmse, Booster, BoosterParams, GradientBoostingRegressor};
use crate::preprocessing::feature_engineering::EVENT_FLAG_COLUMNS;
use crate::preprocessing::FeatureEngineer;

/// Предсказание остатка на валидационном фолде
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualPrediction {
    #[serde(rename = "Fold")]
    pub fold: usize,
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "True_Residual")]
    pub true_residual: f64,
    #[serde(rename = "Predicted_Residual")]
    pub predicted_residual: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldScore {
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub rmse: f64,
    pub best_iteration: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualModel {
    booster: Booster,
}

impl ResidualModel {
    pub fn new(booster: Booster) -> Self {
        Self { booster }
    }

    pub fn booster(&self) -> &Booster {
        &self.booster
    }

    pub fn feature_names(&self) -> &[String] {
        self.booster.feature_names()
    }

    /// Матрица признаков по именам. Флаги событий берутся из года,
    /// отсутствующие колонки становятся пропусками.
    pub fn design_matrix(&self, frame: &Frame) -> Array2<f64> {
        build_design(frame, self.feature_names())
    }

    pub fn predict(&self, frame: &Frame) -> Result<Vec<f64>> {
        let X = self.design_matrix(frame);
        Ok(self.booster.predict(&X)?.to_vec())
    }

    pub fn predict_year(&self, frame: &Frame, year: i32) -> Result<f64> {
        let row = frame.row_index(year)?;
        let single = frame.select_rows(&[row]);
        let X = self.design_matrix(&single);
        Ok(self.booster.predict_row(X.row(0)))
    }
}

fn build_design(frame: &Frame, features: &[String]) -> Array2<f64> {
    let mut X = Array2::from_elem((frame.len(), features.len()), f64::NAN);
    for (row, &year) in frame.years().iter().enumerate() {
        let flags = FeatureEngineer::event_flags(year);
        for (col, name) in features.iter().enumerate() {
            X[[row, col]] = match flags.iter().find(|(flag, _)| *flag == name.as_str()) {
                Some((_, value)) => *value,
                None => frame.get(row, name).unwrap_or(f64::NAN),
            };
        }
    }
    X
}

/// Числовые колонки, пригодные как признаки, плюс флаги событий
pub fn feature_columns(frame: &Frame) -> Vec<String> {
    let mut features: Vec<String> = frame
        .columns()
        .iter()
        .filter(|c| !NON_FEATURE_COLUMNS.contains(&c.as_str()))
        .filter(|c| !EVENT_FLAG_COLUMNS.contains(&c.as_str()))
        .cloned()
        .collect();
    features.extend(EVENT_FLAG_COLUMNS.iter().map(|c| c.to_string()));
    features
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualTraining {
    pub model: ResidualModel,
    pub folds: Vec<FoldScore>,
    pub predictions: Vec<ResidualPrediction>,
    pub average_rmse: f64,
}

pub struct ResidualTrainer {
    params: BoosterParams,
    splitter: TimeSeriesSplit,
}

impl ResidualTrainer {
    pub fn new(params: BoosterParams, n_splits: usize) -> Self {
        Self {
            params,
            splitter: TimeSeriesSplit::new(n_splits),
        }
    }

    /// Добавляет `SARIMAX_Pred` и `Residual`, убирает строки без остатка
    pub fn prepare(processed: &Frame, sarimax_pred: &[f64]) -> Result<Frame> {
        if sarimax_pred.len() != processed.len() {
            return Err(ForecastError::InvalidData(format!(
                "{} SARIMAX predictions for {} rows",
                sarimax_pred.len(),
                processed.len()
            )));
        }
        let mut frame = processed.clone();
        let actual = frame.column_vec(GDP_GROWTH)?;
        let residual: Vec<f64> = actual.iter().zip(sarimax_pred).map(|(a, p)| a - p).collect();
        frame.set_column(SARIMAX_PRED, sarimax_pred.to_vec())?;
        frame.set_column(RESIDUAL, residual)?;

        let residual = frame.column_vec(RESIDUAL)?;
        let mut frame = frame.filter_rows(|i| residual[i].is_finite());
        FeatureEngineer::add_event_flags(&mut frame)?;
        Ok(frame)
    }

    pub fn train(&self, processed: &Frame, sarimax_pred: &[f64]) -> Result<ResidualTraining> {
        let frame = Self::prepare(processed, sarimax_pred)?;
        let features = feature_columns(&frame);
        tracing::info!("Residual model features: {:?}", features);

        let X = build_design(&frame, &features);
        let y = frame.column_vec(RESIDUAL)?;
        let folds = self.splitter.split(frame.len())?;

        let regressor = GradientBoostingRegressor::new(self.params.clone());
        let mut scores = Vec::with_capacity(folds.len());
        let mut predictions = Vec::new();
        let mut last_model = None;

        for (k, fold) in folds.iter().enumerate() {
            let train_idx: Vec<usize> = fold.train.clone().collect();
            let test_idx: Vec<usize> = fold.test.clone().collect();
            let X_train = X.select(ndarray::Axis(0), &train_idx);
            let X_test = X.select(ndarray::Axis(0), &test_idx);
            let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
            let y_test: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

            let booster = regressor.fit(
                &X_train,
                &y_train,
                Some((&X_test, &y_test)),
                features.clone(),
            )?;
            let predicted = booster.predict(&X_test)?.to_vec();
            let fold_rmse = rmse(&predicted, &y_test);
            tracing::info!("Fold {} RMSE: {:.3}", k + 1, fold_rmse);

            for ((&index, truth), pred) in test_idx.iter().zip(&y_test).zip(&predicted) {
                predictions.push(ResidualPrediction {
                    fold: k + 1,
                    index,
                    year: frame.years()[index],
                    true_residual: *truth,
                    predicted_residual: *pred,
                });
            }
            scores.push(FoldScore {
                fold: k + 1,
                train_rows: train_idx.len(),
                test_rows: test_idx.len(),
                rmse: fold_rmse,
                best_iteration: booster.best_iteration(),
            });
            last_model = Some(booster);
        }

        // Остаётся модель последнего фолда
        let booster = last_model.ok_or(ForecastError::NotTrained)?;
        let average_rmse = scores.iter().map(|s| s.rmse).sum::<f64>() / scores.len() as f64;
        tracing::info!("Residual model average RMSE: {:.3}", average_rmse);

        Ok(ResidualTraining {
            model: ResidualModel::new(booster),
            folds: scores,
            predictions,
            average_rmse,
        })
    }
}

impl Default for ResidualTrainer {
    fn default() -> Self {
        Self::new(BoosterParams::default(), 3)
    }
}
