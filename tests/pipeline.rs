mod common;

use approx::assert_relative_eq;
use gdp_forecast::models::scenario::ForecastRow;
use gdp_forecast::{Booster, Pipeline, Scenario};

#[test]
fn full_run_writes_all_national_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), false);

    let artifacts = Pipeline::run(&config).unwrap();

    for file in [
        config.processed_dir.join("cleaned_data.csv"),
        config.processed_dir.join("processed_data.csv"),
        config.processed_dir.join("sarimax_predictions.csv"),
        config.processed_dir.join("xgb_residual_predictions.csv"),
        config.models_dir.join("sarimax_gdp_model.json"),
        config.models_dir.join("xgb_residual.json"),
        config.national_results_dir().join("gdp_forecast_baseline_2025_2026.csv"),
        config.national_results_dir().join("gdp_forecast_reform_2027_2030.csv"),
        config.national_results_dir().join("gdp_forecast_crisis_2027_2030.csv"),
        config.national_results_dir().join("gdp_forecast_mixed_2027_2030.csv"),
        config.national_results_dir().join("recommendations_2025.txt"),
        config.national_results_dir().join("scenario_summary.json"),
        config.testing_dir.join("backtest_2020_2024.csv"),
        config.testing_dir.join("validation_report.json"),
        config.results_dir.join("artifacts.json"),
    ] {
        assert!(file.exists(), "missing {}", file.display());
    }

    assert_eq!(artifacts.cleaning.rows_out, 45);
    assert_eq!(artifacts.residual.folds.len(), 3);
    assert!(artifacts.agriculture.is_none());
    assert!(artifacts.it_sector.is_none());
}

#[test]
fn scenario_forecasts_follow_standard_horizons_and_clip() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), false);
    let artifacts = Pipeline::run(&config).unwrap();

    assert_eq!(artifacts.forecasts.len(), 4);
    assert_eq!(artifacts.forecast(Scenario::Baseline).unwrap().years(), vec![2025, 2026]);
    for scenario in [Scenario::Reform, Scenario::Crisis, Scenario::Mixed] {
        assert_eq!(artifacts.forecast(scenario).unwrap().years(), vec![2027, 2028, 2029, 2030]);
    }

    for forecast in &artifacts.forecasts {
        for row in &forecast.rows {
            assert!(row.correction.abs() <= config.correction_clip + 1e-12);
            assert_relative_eq!(
                row.final_forecast,
                row.sarimax_pred + row.correction,
                epsilon = 1e-9
            );
            assert!(row.lower <= row.final_forecast && row.final_forecast <= row.upper);
        }
    }

    // CSV совпадает с результатом в памяти
    let path = config.national_results_dir().join("gdp_forecast_crisis_2027_2030.csv");
    let rows: Vec<ForecastRow> = csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .collect::<Result<_, _>>()
        .unwrap();
    let crisis = artifacts.forecast(Scenario::Crisis).unwrap();
    assert_eq!(rows.len(), crisis.rows.len());
    assert_relative_eq!(rows[0].final_forecast, crisis.rows[0].final_forecast, epsilon = 1e-9);
}

#[test]
fn recommendations_and_backtest_use_pipeline_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), false);
    let artifacts = Pipeline::run(&config).unwrap();

    let baseline = artifacts.forecast(Scenario::Baseline).unwrap();
    assert_eq!(artifacts.recommendations.year, 2025);
    assert_relative_eq!(artifacts.recommendations.gdp_forecast, baseline.final_for(2025).unwrap());
    let path = config.national_results_dir().join("recommendations_2025.txt");
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.starts_with("Economic Recommendation Report: Year 2025"));

    let backtest = artifacts.backtest.as_ref().unwrap();
    let years: Vec<i32> = backtest.rows.iter().map(|r| r.year).collect();
    assert_eq!(years, vec![2020, 2021, 2022, 2023, 2024]);
    assert_eq!(backtest.rows[0].actual, -6.6);
    assert!(backtest.metrics.rmse.is_finite());
    assert_eq!(backtest.directional.unwrap().n, 4);

    let attribution = artifacts.attribution.as_ref().unwrap();
    assert_eq!(attribution.features.len(), artifacts.residual.features.len());
    assert!(attribution
        .features
        .windows(2)
        .all(|w| w[0].mean_abs_shap >= w[1].mean_abs_shap));

    assert_eq!(artifacts.evaluation.scenario_checks.checks.len(), 3);
    assert!(artifacts.evaluation.model.sarimax.rmse.is_finite());
}

#[test]
fn saved_residual_model_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), false);
    let artifacts = Pipeline::run(&config).unwrap();

    let booster = Booster::load_json(config.models_dir.join("xgb_residual.json")).unwrap();
    assert_eq!(booster.n_trees(), artifacts.residual.n_trees);
    assert_eq!(booster.feature_names(), artifacts.residual.features.as_slice());
}

#[test]
fn it_sector_runs_when_input_exists() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), true);
    let artifacts = Pipeline::run(&config).unwrap();

    let report = artifacts.it_sector.as_ref().unwrap();
    assert_eq!(report.projections.len(), 2);
    assert!(config.sectoral_results_dir().join("top3_investment_strategy.txt").exists());
    assert!(artifacts.evaluation.validation.iter().any(|v| v.label == "it_sector"));
}

#[test]
fn agriculture_runs_when_inputs_exist() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::config_in(dir.path(), false);
    common::write_agriculture(&config.production_path(), &config.climate_path());
    let artifacts = Pipeline::run(&config).unwrap();

    let report = artifacts.agriculture.as_ref().unwrap();
    assert_eq!(report.states.len(), 2);
    assert!(!report.top_picks.is_empty());

    let sectoral = config.sectoral_results_dir();
    for file in [
        "agriculture_report.json",
        "national_top_5_report.txt",
        "Punjab_report.txt",
        "Tamil_Nadu_report.txt",
    ] {
        assert!(sectoral.join(file).exists(), "missing {}", file);
    }
    let top5 = std::fs::read_to_string(sectoral.join("national_top_5_report.txt")).unwrap();
    assert!(top5.starts_with("TOP"));
    let punjab = std::fs::read_to_string(sectoral.join("Punjab_report.txt")).unwrap();
    assert!(punjab.contains("TOP CROP:"));

    let labels: Vec<&str> = artifacts
        .evaluation
        .validation
        .iter()
        .map(|v| v.label.as_str())
        .collect();
    assert!(labels.contains(&"crop_production"));
    assert!(labels.contains(&"climate_soil"));
    assert!(artifacts.it_sector.is_none());
}

#[test]
fn missing_national_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = gdp_forecast::PipelineConfig::rooted_at(dir.path());
    assert!(Pipeline::run(&config).is_err());
}
