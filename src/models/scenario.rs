//! Сценарии развития экономики и гибридный прогноз SARIMAX + коррекция

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data::columns::{lag1, lag2, ma3, GDP_GROWTH, REFORM_POLICY_BOOST};
use crate::data::Frame;
use crate::error::{ForecastError, Result};
use crate::models::residual::ResidualModel;
use crate::models::sarimax::FittedSarimax;

const FDI_LAG1: &str = "FDI (Billion USD)_lag1";
const EXPORTS_LAG1: &str = "Exports (Billion USD)_lag1";
const FIXED_CAPITAL: &str = "Fixed Capital Formation (% of GDP)";
const CREDIT_LAG1: &str = "Bank Credit Growth (%)_lag1";
const M3_LAG1: &str = "Money Supply (M3) Growth (%)_lag1";
const GDP_LAG1: &str = "GDP Growth (%)_lag1";
const INFLATION_LAG2: &str = "Inflation Rate (%)_lag2";
const UNEMPLOYMENT_LAG1: &str = "Unemployment Rate (%)_lag1";
const INTEREST_LAG1: &str = "Interest Rate (%)_lag1";

type Drift = &'static [(&'static str, f64)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Baseline,
    Reform,
    Crisis,
    Mixed,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Baseline,
        Scenario::Reform,
        Scenario::Crisis,
        Scenario::Mixed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Baseline => "baseline",
            Scenario::Reform => "reform",
            Scenario::Crisis => "crisis",
            Scenario::Mixed => "mixed",
        }
    }

    /// Приращения показателей в заданном году
    pub fn drift(&self, year: i32) -> Drift {
        match (self, year) {
            (Scenario::Reform, 2027) => {
                &[(FDI_LAG1, 5.0), (EXPORTS_LAG1, 8.0), (FIXED_CAPITAL, 0.8)]
            }
            (Scenario::Reform, 2028) => {
                &[(FDI_LAG1, 6.0), (CREDIT_LAG1, 1.2), (REFORM_POLICY_BOOST, 1.0)]
            }
            (Scenario::Reform, 2029) => &[(EXPORTS_LAG1, 10.0), (M3_LAG1, 0.5)],
            (Scenario::Reform, 2030) => {
                &[(GDP_LAG1, 0.5), (CREDIT_LAG1, 1.0), (FIXED_CAPITAL, 1.0)]
            }

            (Scenario::Crisis, 2027) => {
                &[(INFLATION_LAG2, 1.2), (UNEMPLOYMENT_LAG1, 1.0), (FDI_LAG1, -2.0)]
            }
            (Scenario::Crisis, 2028) => &[(EXPORTS_LAG1, -5.0), (CREDIT_LAG1, -1.5)],
            (Scenario::Crisis, 2029) => &[(GDP_LAG1, -0.6), (REFORM_POLICY_BOOST, -1.0)],
            (Scenario::Crisis, 2030) => &[(M3_LAG1, -0.8), (INTEREST_LAG1, 1.5)],

            (Scenario::Mixed, 2027) => &[(INFLATION_LAG2, 1.0), (EXPORTS_LAG1, -3.0)],
            (Scenario::Mixed, 2028) => &[(GDP_LAG1, -0.3), (CREDIT_LAG1, -1.0)],
            (Scenario::Mixed, 2029) => {
                &[(FDI_LAG1, 3.0), (REFORM_POLICY_BOOST, 0.5), (FIXED_CAPITAL, 0.5)]
            }
            (Scenario::Mixed, 2030) => &[(EXPORTS_LAG1, 5.0), (GDP_LAG1, 0.4)],

            (Scenario::Baseline, 2027) => {
                &[(INFLATION_LAG2, 0.2), (CREDIT_LAG1, 0.5), (GDP_LAG1, -0.2)]
            }
            (Scenario::Baseline, 2028) => {
                &[(INFLATION_LAG2, -0.1), (FDI_LAG1, 2.0), (GDP_LAG1, 0.1)]
            }
            (Scenario::Baseline, 2029) => &[(INTEREST_LAG1, -0.1), (EXPORTS_LAG1, 3.0)],
            (Scenario::Baseline, 2030) => &[(M3_LAG1, 0.3), (FIXED_CAPITAL, 0.5)],

            _ => &[],
        }
    }

    /// Стандартный горизонт сценария
    pub fn default_years(&self) -> Vec<i32> {
        match self {
            Scenario::Baseline => vec![2025, 2026],
            _ => vec![2027, 2028, 2029, 2030],
        }
    }

    pub fn output_file(&self, years: &[i32]) -> String {
        match (years.first(), years.last()) {
            (Some(first), Some(last)) => {
                format!("gdp_forecast_{}_{}_{}.csv", self.name(), first, last)
            }
            _ => format!("gdp_forecast_{}.csv", self.name()),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "baseline" => Ok(Scenario::Baseline),
            "reform" => Ok(Scenario::Reform),
            "crisis" => Ok(Scenario::Crisis),
            "mixed" => Ok(Scenario::Mixed),
            other => Err(ForecastError::InvalidData(format!("unknown scenario '{}'", other))),
        }
    }
}

/// Будущие признаки: каждая строка копирует предыдущую смоделированную,
/// добавляет дрейф года и обновляет лаги ВВП.
pub fn simulate_future_features(
    history: &Frame,
    years: &[i32],
    scenario: Scenario,
) -> Result<Frame> {
    let n = history.len();
    if n < 2 {
        return Err(ForecastError::InsufficientData { needed: 2, got: n });
    }

    let gdp = history.column_vec(GDP_GROWTH)?;
    let tail = &gdp[n.saturating_sub(3)..];
    let historic_ma3 = tail.iter().sum::<f64>() / tail.len() as f64;

    // Схема: исторические колонки, затем недостающие колонки дрейфа и лагов
    let mut columns: Vec<String> = history.columns().to_vec();
    fn ensure(name: &str, columns: &mut Vec<String>) {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }
    for &year in years {
        for (name, _) in scenario.drift(year) {
            ensure(name, &mut columns);
        }
    }
    for name in [lag1(GDP_GROWTH), lag2(GDP_GROWTH), ma3(GDP_GROWTH)] {
        ensure(&name, &mut columns);
    }
    ensure(REFORM_POLICY_BOOST, &mut columns);

    let expand = |row: usize| -> Vec<f64> {
        columns
            .iter()
            .map(|c| history.get(row, c).unwrap_or(f64::NAN))
            .collect()
    };
    let idx = |name: &str| columns.iter().position(|c| c == name);

    let require = |name: &str| {
        idx(name).ok_or_else(|| ForecastError::MissingColumn(name.to_string()))
    };
    let gdp_col = require(GDP_GROWTH)?;
    let lag1_col = require(lag1(GDP_GROWTH).as_str())?;
    let lag2_col = require(lag2(GDP_GROWTH).as_str())?;
    let ma3_col = require(ma3(GDP_GROWTH).as_str())?;
    let boost_col = require(REFORM_POLICY_BOOST)?;

    let mut last = expand(n - 1);
    let mut second_last = expand(n - 2);
    let mut simulated = Frame::new(Vec::new(), columns.clone(), Array2::zeros((0, columns.len())))?;

    for &year in years {
        let mut row = last.clone();

        for (name, delta) in scenario.drift(year) {
            if let Some(c) = idx(*name) {
                // новая колонка получает значение дрейфа
                row[c] = if row[c].is_nan() { *delta } else { row[c] + delta };
            }
        }

        row[lag1_col] = last[gdp_col];
        row[lag2_col] = second_last[gdp_col];
        row[ma3_col] = (row[lag1_col] + row[lag2_col] + historic_ma3) / 3.0;

        if row[boost_col].is_nan() {
            row[boost_col] = 0.0;
        }

        simulated.push_row(year, &row)?;
        second_last = std::mem::replace(&mut last, row);
    }

    tracing::debug!("Simulated {} rows for {} scenario", simulated.len(), scenario);
    Ok(simulated)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "SARIMAX_Pred")]
    pub sarimax_pred: f64,
    #[serde(rename = "Correction")]
    pub correction: f64,
    #[serde(rename = "Final GDP Forecast (%)")]
    pub final_forecast: f64,
    #[serde(rename = "Lower_95")]
    pub lower: f64,
    #[serde(rename = "Upper_95")]
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioForecast {
    pub scenario: Scenario,
    pub rows: Vec<ForecastRow>,
}

impl ScenarioForecast {
    pub fn finals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.final_forecast).collect()
    }

    pub fn mean_final(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(|r| r.final_forecast).sum::<f64>() / self.rows.len() as f64
    }

    pub fn final_for(&self, year: i32) -> Option<f64> {
        self.rows.iter().find(|r| r.year == year).map(|r| r.final_forecast)
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// SARIMAX задаёт тренд, модель остатков добавляет ограниченную коррекцию
#[derive(Debug, Clone)]
pub struct HybridForecaster {
    sarimax: FittedSarimax,
    residual: ResidualModel,
    exog_columns: Vec<String>,
    clip: f64,
}

impl HybridForecaster {
    pub fn new(sarimax: FittedSarimax, residual: ResidualModel, exog_columns: Vec<String>) -> Self {
        Self {
            sarimax,
            residual,
            exog_columns,
            clip: 1.0,
        }
    }

    pub fn with_clip(mut self, clip: f64) -> Self {
        self.clip = clip.abs();
        self
    }

    pub fn sarimax(&self) -> &FittedSarimax {
        &self.sarimax
    }

    pub fn residual(&self) -> &ResidualModel {
        &self.residual
    }

    /// Прогноз для подготовленных будущих признаков, шаги считаются от конца выборки
    pub fn forecast(&self, future: &Frame) -> Result<Vec<ForecastRow>> {
        let exog = future.select_columns(&self.exog_columns)?;
        let baseline = self.sarimax.forecast(future.len(), &exog)?;
        let corrections = self.residual.predict(future)?;

        Ok(future
            .years()
            .iter()
            .enumerate()
            .map(|(i, &year)| {
                let correction = corrections[i].clamp(-self.clip, self.clip);
                ForecastRow {
                    year,
                    sarimax_pred: baseline.mean[i],
                    correction,
                    final_forecast: baseline.mean[i] + correction,
                    lower: baseline.lower[i] + correction,
                    upper: baseline.upper[i] + correction,
                }
            })
            .collect())
    }

    pub fn run(
        &self,
        history: &Frame,
        scenario: Scenario,
        years: &[i32],
    ) -> Result<ScenarioForecast> {
        let future = simulate_future_features(history, years, scenario)?;
        let rows = self.forecast(&future)?;
        tracing::info!(
            "{} forecast {:?}: {:?}",
            scenario,
            years,
            rows.iter().map(|r| (r.final_forecast * 100.0).round() / 100.0).collect::<Vec<_>>()
        );
        Ok(ScenarioForecast { scenario, rows })
    }

    /// Все четыре сценария на стандартных горизонтах
    pub fn run_all(&self, history: &Frame) -> Result<Vec<ScenarioForecast>> {
        Scenario::ALL
            .iter()
            .map(|s| self.run(history, *s, &s.default_years()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gradient_boosting::BoosterParams;
    use crate::models::residual::ResidualTrainer;
    use crate::models::sarimax::{Sarimax, SarimaxOrder};

    fn history() -> Frame {
        let n = 30;
        let years: Vec<i32> = (1995..1995 + n as i32).collect();
        let columns = vec![
            GDP_GROWTH.to_string(),
            GDP_LAG1.to_string(),
            GDP_LAG1.replace("lag1", "lag2"),
            FDI_LAG1.to_string(),
            INFLATION_LAG2.to_string(),
        ];
        let values = Array2::from_shape_fn((n, 5), |(i, j)| {
            let t = i as f64;
            match j {
                0 => 6.0 + (t * 0.7).sin(),
                1 => 6.0 + ((t - 1.0) * 0.7).sin(),
                2 => 6.0 + ((t - 2.0) * 0.7).sin(),
                3 => 20.0 + t,
                _ => 5.0 + (t * 0.3).cos(),
            }
        });
        Frame::new(years, columns, values).unwrap()
    }

    #[test]
    fn drift_accumulates_across_years() {
        let hist = history();
        let last_fdi = hist.value_at(2024, FDI_LAG1).unwrap();
        let future =
            simulate_future_features(&hist, &[2027, 2028, 2029], Scenario::Reform).unwrap();

        assert_eq!(future.years(), &[2027, 2028, 2029]);
        assert!((future.value_at(2027, FDI_LAG1).unwrap() - (last_fdi + 5.0)).abs() < 1e-12);
        assert!((future.value_at(2028, FDI_LAG1).unwrap() - (last_fdi + 11.0)).abs() < 1e-12);
        assert!((future.value_at(2029, FDI_LAG1).unwrap() - (last_fdi + 11.0)).abs() < 1e-12);
    }

    #[test]
    fn absent_columns_are_created_from_drift() {
        let future = simulate_future_features(&history(), &[2027, 2028], Scenario::Reform).unwrap();
        assert_eq!(future.value_at(2027, FIXED_CAPITAL).unwrap(), 0.8);
        assert_eq!(future.value_at(2028, FIXED_CAPITAL).unwrap(), 0.8);
        assert_eq!(future.value_at(2027, REFORM_POLICY_BOOST).unwrap(), 0.0);
        assert_eq!(future.value_at(2028, REFORM_POLICY_BOOST).unwrap(), 1.0);
    }

    #[test]
    fn gdp_lags_roll_forward() {
        let hist = history();
        let last = hist.value_at(2024, GDP_GROWTH).unwrap();
        let second = hist.value_at(2023, GDP_GROWTH).unwrap();
        let third = hist.value_at(2022, GDP_GROWTH).unwrap();
        let historic_ma3 = (last + second + third) / 3.0;

        let future = simulate_future_features(&hist, &[2025, 2026], Scenario::Baseline).unwrap();
        let lag2_name = lag2(GDP_GROWTH);
        assert_eq!(future.value_at(2025, GDP_LAG1).unwrap(), last);
        assert_eq!(future.value_at(2025, &lag2_name).unwrap(), second);
        // простые строки копируют ВВП последнего исторического года
        assert_eq!(future.value_at(2026, GDP_LAG1).unwrap(), last);
        assert_eq!(future.value_at(2026, &lag2_name).unwrap(), last);
        let expected = (last + second + historic_ma3) / 3.0;
        assert!((future.value_at(2025, &ma3(GDP_GROWTH)).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn baseline_near_term_has_no_drift() {
        let hist = history();
        let future = simulate_future_features(&hist, &[2025, 2026], Scenario::Baseline).unwrap();
        assert_eq!(
            future.value_at(2026, INFLATION_LAG2).unwrap(),
            hist.value_at(2024, INFLATION_LAG2).unwrap()
        );
    }

    #[test]
    fn scenario_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
        }
        assert!("boom".parse::<Scenario>().is_err());
        assert_eq!(
            Scenario::Reform.output_file(&Scenario::Reform.default_years()),
            "gdp_forecast_reform_2027_2030.csv"
        );
    }

    #[test]
    fn hybrid_adds_clipped_correction() {
        let hist = history();
        let exog_columns = vec![INFLATION_LAG2.to_string()];
        let y = hist.column_vec(GDP_GROWTH).unwrap();
        let exog = hist.select_columns(&exog_columns).unwrap();
        let sarimax = Sarimax::new(SarimaxOrder::new(0, 1, 0)).fit(&y, &exog).unwrap();

        // остаток 3 всюду; коррекция ограничивается единицей
        let shifted: Vec<f64> = y.iter().map(|v| v - 3.0).collect();
        let params = BoosterParams {
            num_boost_round: 20,
            ..Default::default()
        };
        let training = ResidualTrainer::new(params, 3).train(&hist, &shifted).unwrap();

        let forecaster = HybridForecaster::new(sarimax, training.model, exog_columns);
        let forecast = forecaster.run(&hist, Scenario::Crisis, &[2027, 2028]).unwrap();

        assert_eq!(forecast.rows.len(), 2);
        for row in &forecast.rows {
            assert!((row.correction - 1.0).abs() < 1e-12);
            assert!((row.final_forecast - row.sarimax_pred - 1.0).abs() < 1e-12);
            assert!(row.lower < row.final_forecast && row.final_forecast < row.upper);
        }
    }
}
