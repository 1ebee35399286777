//! Полный прогон: данные -> модели -> сценарии -> оценка -> отчёты

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::columns::{default_exog_columns, GDP_GROWTH, RESIDUAL, SARIMAX_PRED};
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::evaluation::validation::EXPECTED_PROCESSED_COLUMNS;
use crate::evaluation::{
    explain, validate_csv, validate_frame, BacktestRow, Backtester, ModelEvaluation,
    ScenarioValidator, ValidationReport,
};
use crate::models::recommendations::{MacroIndicators, RecommendationEngine};
use crate::models::residual::{ResidualTrainer, ResidualTraining};
use crate::models::sarimax::{FittedSarimax, Sarimax};
use crate::models::scenario::{HybridForecaster, Scenario};
use crate::preprocessing::{DataCleaner, FeatureEngineer};
use crate::sectoral::{AgricultureAnalyzer, AgricultureReport, ItSectorAnalyzer, ItSectorReport};
use crate::types::{EvaluationSummary, PipelineArtifacts, ResidualSummary, SarimaxSummary};

pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &PipelineConfig) -> Result<PipelineArtifacts> {
        for dir in [
            config.processed_dir.clone(),
            config.models_dir.clone(),
            config.testing_dir.clone(),
            config.national_results_dir(),
            config.sectoral_results_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }

        // 1-2. Очистка и признаки
        let raw = Frame::from_csv(config.national_path())?;
        tracing::info!("Loaded {} rows from {}", raw.len(), config.national_path().display());
        let (cleaned, cleaning) = DataCleaner::new(config.iqr_multiplier).clean(&raw)?;
        cleaned.to_csv(config.processed_dir.join("cleaned_data.csv"))?;

        let processed = FeatureEngineer::build_features(&cleaned)?;
        processed.to_csv(config.processed_dir.join("processed_data.csv"))?;
        let mut validation = vec![validate_frame(
            "processed_data",
            &processed,
            &EXPECTED_PROCESSED_COLUMNS,
        )];

        // 3. SARIMAX
        let exog_columns = Self::exog_columns(&processed);
        let (fitted, sarimax_pred) = Self::fit_sarimax(config, &processed, &exog_columns)?;

        // 4. Модель остатков
        let training = ResidualTrainer::new(config.booster.clone(), config.cv_splits)
            .train(&processed, &sarimax_pred)?;
        Self::write_residuals(config, &training)?;
        let residual_summary = ResidualSummary {
            features: training.model.feature_names().to_vec(),
            folds: training.folds.clone(),
            average_rmse: training.average_rmse,
            n_trees: training.model.booster().n_trees(),
        };
        let residual_model = training.model;

        // 5. Сценарии
        let sarimax_summary = SarimaxSummary::from_fitted(&fitted, &exog_columns);
        let forecaster = HybridForecaster::new(fitted, residual_model, exog_columns)
            .with_clip(config.correction_clip);
        let forecasts = forecaster.run_all(&processed)?;
        for forecast in &forecasts {
            let file = forecast.scenario.output_file(&forecast.years());
            forecast.to_csv(config.national_results_dir().join(file))?;
        }

        // 6. Рекомендации
        let last_year = *processed
            .years()
            .last()
            .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;
        let baseline = forecasts
            .iter()
            .find(|f| f.scenario == Scenario::Baseline)
            .ok_or_else(|| ForecastError::InvalidData("baseline forecast missing".to_string()))?;
        let target_year = last_year + 1;
        let gdp_forecast = baseline
            .final_for(target_year)
            .or_else(|| baseline.rows.first().map(|r| r.final_forecast))
            .ok_or_else(|| ForecastError::InvalidData("baseline forecast is empty".to_string()))?;
        let indicators = MacroIndicators::from_frame(&processed, last_year, gdp_forecast)?;
        let recommendations = RecommendationEngine::generate(target_year, &indicators);
        write_text(
            config.national_results_dir().join(format!("recommendations_{}.txt", target_year)),
            &recommendations.to_string(),
        )?;
        tracing::info!(
            "Recommendations for {}: {} risks, {} opportunities",
            target_year,
            recommendations.risks.len(),
            recommendations.opportunities.len()
        );

        // 7. Оценка
        let in_sample = forecaster.sarimax().predict_in_sample();
        let model_eval =
            ModelEvaluation::compute(&processed, &in_sample, &forecasts, &config.actual_overrides)?;
        write_json(config.national_results_dir().join("model_evaluation.json"), &model_eval)?;

        let (lower, upper) = config.scenario_bounds;
        let scenario_checks = ScenarioValidator::new(lower, upper).validate(&forecasts);
        write_json(config.national_results_dir().join("scenario_summary.json"), &scenario_checks)?;

        let backtester = Backtester::new(&config.backtest_actuals, &config.backtest_weights);
        let backtest = match backtester.run(&processed, &sarimax_pred, forecaster.residual()) {
            Ok(report) => {
                report.to_csv(config.testing_dir.join(backtest_file(&report.rows)))?;
                write_json(config.testing_dir.join("backtest_summary.json"), &report)?;
                Some(report)
            }
            Err(e) => {
                tracing::warn!("Backtest skipped: {}", e);
                None
            }
        };

        let attribution = match explain(forecaster.residual(), &processed) {
            Ok(report) => {
                write_json(config.testing_dir.join("shap_importance.json"), &report)?;
                Some(report)
            }
            Err(e) => {
                tracing::warn!("Feature attribution skipped: {}", e);
                None
            }
        };

        // 8. Отраслевой анализ
        let agriculture = Self::run_agriculture(config, &mut validation)?;
        let it_sector = Self::run_it_sector(config, &mut validation)?;
        write_json(config.testing_dir.join("validation_report.json"), &validation)?;

        let artifacts = PipelineArtifacts {
            generated_at: chrono::Utc::now(),
            cleaning,
            sarimax: sarimax_summary,
            residual: residual_summary,
            forecasts,
            recommendations,
            evaluation: EvaluationSummary {
                model: model_eval,
                scenario_checks,
                validation,
            },
            backtest,
            attribution,
            agriculture,
            it_sector,
        };
        write_json(config.results_dir.join("artifacts.json"), &artifacts)?;
        tracing::info!("Pipeline finished, artifacts in {}", config.results_dir.display());
        Ok(artifacts)
    }

    /// Регрессоры по умолчанию, присутствующие в данных
    fn exog_columns(processed: &Frame) -> Vec<String> {
        default_exog_columns()
            .into_iter()
            .filter(|c| {
                let present = processed.has_column(c);
                if !present {
                    tracing::warn!("Exogenous column {} not found, skipping", c);
                }
                present
            })
            .collect()
    }

    fn fit_sarimax(
        config: &PipelineConfig,
        processed: &Frame,
        exog_columns: &[String],
    ) -> Result<(FittedSarimax, Vec<f64>)> {
        let y = processed.column_vec(GDP_GROWTH)?;
        let exog = processed.select_columns(exog_columns)?;
        let fitted = Sarimax::new(config.national_order).fit(&y, &exog)?;
        tracing::info!(
            "SARIMAX fitted on {} rows, AIC={:.2}, converged={}",
            fitted.nobs(),
            fitted.aic(),
            fitted.converged()
        );

        let predictions = fitted.predict_in_sample();
        let mut table = Frame::with_years(processed.years().to_vec());
        table.set_column(GDP_GROWTH, y)?;
        table.set_column(SARIMAX_PRED, predictions.clone())?;
        table.set_column(RESIDUAL, fitted.residuals())?;
        table.to_csv(config.processed_dir.join("sarimax_predictions.csv"))?;
        write_json(config.models_dir.join("sarimax_gdp_model.json"), &fitted)?;

        Ok((fitted, predictions))
    }

    fn write_residuals(config: &PipelineConfig, training: &ResidualTraining) -> Result<()> {
        let path = config.processed_dir.join("xgb_residual_predictions.csv");
        let mut writer = csv::Writer::from_path(path)?;
        for row in &training.predictions {
            writer.serialize(row)?;
        }
        writer.flush()?;
        training.model.booster().save_json(config.models_dir.join("xgb_residual.json"))
    }

    fn run_agriculture(
        config: &PipelineConfig,
        validation: &mut Vec<ValidationReport>,
    ) -> Result<Option<AgricultureReport>> {
        let (production, climate) = (config.production_path(), config.climate_path());
        if !production.exists() || !climate.exists() {
            tracing::info!("Agriculture inputs not found, skipping sector analysis");
            return Ok(None);
        }
        validation.push(validate_csv(
            "crop_production",
            &production,
            &["State", "Year", "Crop"],
        )?);
        validation.push(validate_csv("climate_soil", &climate, &["State", "Year"])?);

        match AgricultureAnalyzer::new(config.sector_horizon).from_files(&production, &climate) {
            Ok(report) => {
                let dir = config.sectoral_results_dir();
                write_json(dir.join("agriculture_report.json"), &report)?;
                write_text(dir.join("national_top_5_report.txt"), &report.to_string())?;
                for (file, state_report) in report.state_reports() {
                    write_text(dir.join(file), &state_report.to_string())?;
                }
                Ok(Some(report))
            }
            Err(e) => {
                tracing::warn!("Agriculture analysis failed: {}", e);
                Ok(None)
            }
        }
    }

    fn run_it_sector(
        config: &PipelineConfig,
        validation: &mut Vec<ValidationReport>,
    ) -> Result<Option<ItSectorReport>> {
        let path = config.it_path();
        if !path.exists() {
            tracing::info!("IT sector input not found, skipping sector analysis");
            return Ok(None);
        }
        validation.push(validate_csv("it_sector", &path, &["State", "Year"])?);

        match ItSectorAnalyzer::new(config.sector_horizon, 3).from_file(&path) {
            Ok(report) => {
                let dir = config.sectoral_results_dir();
                write_json(dir.join("it_sector_report.json"), &report)?;
                write_text(dir.join("top3_investment_strategy.txt"), &report.to_string())?;
                Ok(Some(report))
            }
            Err(e) => {
                tracing::warn!("IT sector analysis failed: {}", e);
                Ok(None)
            }
        }
    }
}

fn backtest_file(rows: &[BacktestRow]) -> String {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => format!("backtest_{}_{}.csv", first.year, last.year),
        _ => "backtest.csv".to_string(),
    }
}

fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    fs::write(path, text)?;
    Ok(())
}
