/// Типы результатов конвейера, общие для API и файлов отчётов

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluation::{
    AttributionReport, BacktestReport, ModelEvaluation, ScenarioCheckReport, ValidationReport,
};
use crate::models::recommendations::RecommendationReport;
use crate::models::residual::FoldScore;
use crate::models::sarimax::{FittedSarimax, SarimaxOrder};
use crate::models::scenario::{Scenario, ScenarioForecast};
use crate::preprocessing::CleaningReport;
use crate::sectoral::{AgricultureReport, ItSectorReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarimaxSummary {
    pub order: SarimaxOrder,
    pub exog_columns: Vec<String>,
    pub exog_coefficients: Vec<f64>,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    pub sigma2: f64,
    pub aic: f64,
    pub nobs: usize,
    pub converged: bool,
}

impl SarimaxSummary {
    pub fn from_fitted(fitted: &FittedSarimax, exog_columns: &[String]) -> Self {
        Self {
            order: fitted.order(),
            exog_columns: exog_columns.to_vec(),
            exog_coefficients: fitted.exog_coefficients().to_vec(),
            ar: fitted.ar_coefficients().to_vec(),
            ma: fitted.ma_coefficients().to_vec(),
            seasonal_ar: fitted.seasonal_ar_coefficients().to_vec(),
            seasonal_ma: fitted.seasonal_ma_coefficients().to_vec(),
            sigma2: fitted.sigma2(),
            aic: fitted.aic(),
            nobs: fitted.nobs(),
            converged: fitted.converged(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualSummary {
    pub features: Vec<String>,
    pub folds: Vec<FoldScore>,
    pub average_rmse: f64,
    pub n_trees: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub model: ModelEvaluation,
    pub scenario_checks: ScenarioCheckReport,
    pub validation: Vec<ValidationReport>,
}

/// Всё, что строит один прогон конвейера
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifacts {
    pub generated_at: DateTime<Utc>,
    pub cleaning: CleaningReport,
    pub sarimax: SarimaxSummary,
    pub residual: ResidualSummary,
    pub forecasts: Vec<ScenarioForecast>,
    pub recommendations: RecommendationReport,
    pub evaluation: EvaluationSummary,
    pub backtest: Option<BacktestReport>,
    pub attribution: Option<AttributionReport>,
    pub agriculture: Option<AgricultureReport>,
    pub it_sector: Option<ItSectorReport>,
}

impl PipelineArtifacts {
    pub fn forecast(&self, scenario: Scenario) -> Option<&ScenarioForecast> {
        self.forecasts.iter().find(|f| f.scenario == scenario)
    }
}
