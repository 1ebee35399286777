//! Конфигурация конвейера

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::gradient_boosting::BoosterParams;
use crate::models::sarimax::SarimaxOrder;

/// Переменная окружения с путём к JSON-конфигурации
pub const CONFIG_ENV: &str = "GDP_FORECAST_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_raw_dir")]
    pub raw_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_testing_dir")]
    pub testing_dir: PathBuf,

    #[serde(default = "default_national_file")]
    pub national_file: String,
    #[serde(default = "default_production_file")]
    pub production_file: String,
    #[serde(default = "default_climate_file")]
    pub climate_file: String,
    #[serde(default = "default_it_file")]
    pub it_file: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_national_order")]
    pub national_order: SarimaxOrder,
    #[serde(default)]
    pub booster: BoosterParams,
    #[serde(default = "default_cv_splits")]
    pub cv_splits: usize,
    #[serde(default = "default_correction_clip")]
    pub correction_clip: f64,
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    #[serde(default = "default_sector_horizon")]
    pub sector_horizon: usize,

    #[serde(default = "default_backtest_actuals")]
    pub backtest_actuals: BTreeMap<i32, f64>,
    #[serde(default = "default_backtest_weights")]
    pub backtest_weights: BTreeMap<i32, f64>,
    /// Исправленные факты для оценки SARIMAX на истории
    #[serde(default = "default_actual_overrides")]
    pub actual_overrides: BTreeMap<i32, f64>,
    #[serde(default = "default_scenario_bounds")]
    pub scenario_bounds: (f64, f64),
}

fn default_raw_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_testing_dir() -> PathBuf {
    PathBuf::from("testing")
}

fn default_national_file() -> String {
    "national_economic_indicators_1980_2024.csv".to_string()
}

fn default_production_file() -> String {
    "crop_export_production_stable.csv".to_string()
}

fn default_climate_file() -> String {
    "india_climate_soil_1961_2017.csv".to_string()
}

fn default_it_file() -> String {
    "IT_Sector_India_2010_2020.csv".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_national_order() -> SarimaxOrder {
    SarimaxOrder::new(1, 1, 1).with_seasonal(1, 1, 1, 4)
}

fn default_cv_splits() -> usize {
    3
}

fn default_correction_clip() -> f64 {
    1.0
}

fn default_iqr_multiplier() -> f64 {
    3.0
}

fn default_sector_horizon() -> usize {
    10
}

fn default_scenario_bounds() -> (f64, f64) {
    (4.0, 10.0)
}

fn default_backtest_actuals() -> BTreeMap<i32, f64> {
    BTreeMap::from([(2020, -6.6), (2021, 8.7), (2022, 7.0), (2023, 8.2), (2024, 6.4)])
}

fn default_backtest_weights() -> BTreeMap<i32, f64> {
    BTreeMap::from([(2020, 0.9), (2021, 0.7), (2022, 0.5), (2023, 0.5), (2024, 0.5)])
}

fn default_actual_overrides() -> BTreeMap<i32, f64> {
    BTreeMap::from([(2020, -7.3)])
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: default_raw_dir(),
            processed_dir: default_processed_dir(),
            models_dir: default_models_dir(),
            results_dir: default_results_dir(),
            testing_dir: default_testing_dir(),
            national_file: default_national_file(),
            production_file: default_production_file(),
            climate_file: default_climate_file(),
            it_file: default_it_file(),
            bind_addr: default_bind_addr(),
            national_order: default_national_order(),
            booster: BoosterParams::default(),
            cv_splits: default_cv_splits(),
            correction_clip: default_correction_clip(),
            iqr_multiplier: default_iqr_multiplier(),
            sector_horizon: default_sector_horizon(),
            backtest_actuals: default_backtest_actuals(),
            backtest_weights: default_backtest_weights(),
            actual_overrides: default_actual_overrides(),
            scenario_bounds: default_scenario_bounds(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Файл из `GDP_FORECAST_CONFIG`, иначе значения по умолчанию
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                tracing::info!("Loading configuration from {}", path);
                Self::from_json_file(path)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Все каталоги относительно `root`
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            raw_dir: root.join(defaults.raw_dir.as_path()),
            processed_dir: root.join(defaults.processed_dir.as_path()),
            models_dir: root.join(defaults.models_dir.as_path()),
            results_dir: root.join(defaults.results_dir.as_path()),
            testing_dir: root.join(defaults.testing_dir.as_path()),
            ..defaults
        }
    }

    pub fn national_path(&self) -> PathBuf {
        self.raw_dir.join(&self.national_file)
    }

    pub fn production_path(&self) -> PathBuf {
        self.raw_dir.join(&self.production_file)
    }

    pub fn climate_path(&self) -> PathBuf {
        self.raw_dir.join(&self.climate_file)
    }

    pub fn it_path(&self) -> PathBuf {
        self.raw_dir.join(&self.it_file)
    }

    pub fn national_results_dir(&self) -> PathBuf {
        self.results_dir.join("national")
    }

    pub fn sectoral_results_dir(&self) -> PathBuf {
        self.results_dir.join("sectoral")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_json_gives_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.national_order, SarimaxOrder::new(1, 1, 1).with_seasonal(1, 1, 1, 4));
        assert_eq!(config.backtest_actuals.get(&2020), Some(&-6.6));
        assert_eq!(config.booster, BoosterParams::default());
        assert_eq!(config.cv_splits, 3);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cv_splits": 4, "booster": {{"max_depth": 2}}, "raw_dir": "input"}}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.cv_splits, 4);
        assert_eq!(config.booster.max_depth, 2);
        assert_eq!(config.booster.learning_rate, 0.025);
        assert_eq!(
            config.national_path(),
            PathBuf::from("input/national_economic_indicators_1980_2024.csv")
        );
    }

    #[test]
    fn rooted_paths() {
        let config = PipelineConfig::rooted_at("/tmp/run");
        assert_eq!(config.models_dir, PathBuf::from("/tmp/run/models"));
        assert_eq!(config.national_results_dir(), PathBuf::from("/tmp/run/results/national"));
    }
}
