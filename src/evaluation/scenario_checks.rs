//! Проверки согласованности сценариев

use serde::{Deserialize, Serialize};

use crate::models::scenario::{Scenario, ScenarioForecast};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCheckReport {
    /// Средний итоговый прогноз по каждому сценарию
    pub averages: Vec<(Scenario, f64)>,
    pub checks: Vec<ScenarioCheck>,
}

impl ScenarioCheckReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn average(&self, scenario: Scenario) -> Option<f64> {
        self.averages.iter().find(|(s, _)| *s == scenario).map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioValidator {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Default for ScenarioValidator {
    fn default() -> Self {
        Self {
            lower_bound: 4.0,
            upper_bound: 10.0,
        }
    }
}

impl ScenarioValidator {
    pub fn new(lower_bound: f64, upper_bound: f64) -> Self {
        Self { lower_bound, upper_bound }
    }

    /// Ожидаемый порядок: реформы выше базы, кризис ниже смешанного.
    /// Отсутствующий сценарий даёт проваленную проверку.
    pub fn validate(&self, forecasts: &[ScenarioForecast]) -> ScenarioCheckReport {
        let averages: Vec<(Scenario, f64)> = forecasts
            .iter()
            .filter(|f| !f.rows.is_empty())
            .map(|f| (f.scenario, f.mean_final()))
            .collect();
        let avg = |s: Scenario| averages.iter().find(|(x, _)| *x == s).map(|(_, v)| *v);

        let mut checks = vec![
            ordering_check(
                "reform_above_baseline",
                (avg(Scenario::Reform), "reform"),
                (avg(Scenario::Baseline), "baseline"),
            ),
            ordering_check(
                "crisis_below_mixed",
                (avg(Scenario::Mixed), "mixed"),
                (avg(Scenario::Crisis), "crisis"),
            ),
        ];

        let bounds = self.lower_bound..=self.upper_bound;
        let mut out_of_range = Vec::new();
        for f in forecasts {
            for r in f.rows.iter().filter(|r| !bounds.contains(&r.final_forecast)) {
                out_of_range.push(format!("{} {}: {:.2}", f.scenario, r.year, r.final_forecast));
            }
        }
        checks.push(ScenarioCheck {
            name: "forecasts_within_bounds".to_string(),
            passed: out_of_range.is_empty(),
            detail: if out_of_range.is_empty() {
                format!("all forecasts within [{}, {}]", self.lower_bound, self.upper_bound)
            } else {
                format!(
                    "outside [{}, {}]: {}",
                    self.lower_bound,
                    self.upper_bound,
                    out_of_range.join(", ")
                )
            },
        });

        for check in checks.iter().filter(|c| !c.passed) {
            tracing::warn!("Scenario check {} failed: {}", check.name, check.detail);
        }

        ScenarioCheckReport { averages, checks }
    }
}

/// Проверка `higher > lower` для пар (среднее, имя сценария)
fn ordering_check(
    name: &str,
    (higher, higher_name): (Option<f64>, &str),
    (lower, lower_name): (Option<f64>, &str),
) -> ScenarioCheck {
    let (passed, detail) = match (higher, lower) {
        (Some(h), Some(l)) => (
            h > l,
            format!("{} avg {:.2} vs {} avg {:.2}", higher_name, h, lower_name, l),
        ),
        _ => (false, format!("missing {} or {} forecast", higher_name, lower_name)),
    };
    ScenarioCheck {
        name: name.to_string(),
        passed,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scenario::ForecastRow;

    fn forecast(scenario: Scenario, finals: &[(i32, f64)]) -> ScenarioForecast {
        ScenarioForecast {
            scenario,
            rows: finals
                .iter()
                .map(|&(year, value)| ForecastRow {
                    year,
                    sarimax_pred: value,
                    correction: 0.0,
                    final_forecast: value,
                    lower: value - 1.0,
                    upper: value + 1.0,
                })
                .collect(),
        }
    }

    #[test]
    fn consistent_scenarios_pass() {
        let forecasts = vec![
            forecast(Scenario::Baseline, &[(2025, 6.5), (2026, 6.7)]),
            forecast(Scenario::Reform, &[(2027, 7.5), (2028, 8.0)]),
            forecast(Scenario::Crisis, &[(2027, 4.5), (2028, 5.0)]),
            forecast(Scenario::Mixed, &[(2027, 6.0), (2028, 6.2)]),
        ];
        let report = ScenarioValidator::default().validate(&forecasts);
        assert!(report.all_passed());
        assert_eq!(report.average(Scenario::Reform), Some(7.75));
    }

    #[test]
    fn inverted_ordering_and_bounds_fail() {
        let forecasts = vec![
            forecast(Scenario::Baseline, &[(2025, 7.0)]),
            forecast(Scenario::Reform, &[(2027, 6.0)]),
            forecast(Scenario::Crisis, &[(2027, 3.5)]),
            forecast(Scenario::Mixed, &[(2027, 6.0)]),
        ];
        let report = ScenarioValidator::default().validate(&forecasts);
        let failed: Vec<&str> = report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(failed, vec!["reform_above_baseline", "forecasts_within_bounds"]);
    }

    #[test]
    fn missing_scenario_fails_its_check() {
        let forecasts = vec![forecast(Scenario::Crisis, &[(2027, 5.0)])];
        let report = ScenarioValidator::default().validate(&forecasts);
        assert!(!report.all_passed());
        assert!(report.checks[1].detail.contains("missing"));
    }
}
