//! Анализ IT-сектора: прогноз выручки по штатам и стратегия для лидеров роста

use std::fmt;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::agriculture::read_records;
use super::{nan_mean, nan_std, unique_in_order};
use crate::error::{ForecastError, Result};
use crate::models::sarimax::{Sarimax, SarimaxForecast, SarimaxOrder};

#[derive(Debug, Clone, Deserialize)]
pub struct ItRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "State_IT_Revenue(Cr)", deserialize_with = "csv::invalid_option")]
    pub revenue: Option<f64>,
    #[serde(rename = "Repo_Rate(%)", deserialize_with = "csv::invalid_option")]
    pub repo_rate: Option<f64>,
    #[serde(rename = "Global_Economic_Index", deserialize_with = "csv::invalid_option")]
    pub global_index: Option<f64>,
    #[serde(rename = "Urban_Unemployment_Rate(%)", deserialize_with = "csv::invalid_option")]
    pub unemployment: Option<f64>,
    #[serde(rename = "Internet_Penetration(%)", deserialize_with = "csv::invalid_option")]
    pub internet_penetration: Option<f64>,
}

/// Полная строка без пропусков
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItObservation {
    pub year: i32,
    pub revenue: f64,
    pub repo_rate: f64,
    pub global_index: f64,
    pub unemployment: f64,
    pub internet_penetration: f64,
}

impl ItRecord {
    pub fn complete(&self) -> Option<ItObservation> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        Some(ItObservation {
            year: self.year,
            revenue: finite(self.revenue)?,
            repo_rate: finite(self.repo_rate)?,
            global_index: finite(self.global_index)?,
            unemployment: finite(self.unemployment)?,
            internet_penetration: finite(self.internet_penetration)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateProjection {
    pub state: String,
    pub current_revenue: f64,
    pub avg_growth: f64,
    pub unemployment: f64,
    pub internet_penetration: f64,
    pub projected_growth: f64,
    pub historical_years: Vec<i32>,
    pub historical_revenue: Vec<f64>,
    pub forecast_years: Vec<i32>,
    pub forecast: SarimaxForecast,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NationalAverages {
    pub unemployment: f64,
    pub internet_penetration: f64,
    pub growth: f64,
}

impl NationalAverages {
    /// Средние по отобранным штатам, с которыми сравнивается каждая стратегия
    pub fn over(projections: &[StateProjection]) -> Self {
        let mean = |f: fn(&StateProjection) -> f64| {
            nan_mean(&projections.iter().map(f).collect::<Vec<_>>())
        };
        Self {
            unemployment: mean(|p| p.unemployment),
            internet_penetration: mean(|p| p.internet_penetration),
            growth: mean(|p| p.projected_growth),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentStrategy {
    pub rank: usize,
    pub state: String,
    pub growth_rate: f64,
    pub exceeds_national_growth: bool,
    pub unemployment: f64,
    pub internet_penetration: f64,
    pub revenue_volatility: f64,
    pub confidence_width: f64,
    pub allocation: Vec<(String, u8)>,
    pub initiatives: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItSectorReport {
    /// Штаты по убыванию прогнозируемого роста
    pub projections: Vec<StateProjection>,
    pub national: NationalAverages,
    pub strategies: Vec<InvestmentStrategy>,
}

pub struct ItSectorAnalyzer {
    horizon: usize,
    top_n: usize,
}

impl ItSectorAnalyzer {
    pub fn new(horizon: usize, top_n: usize) -> Self {
        Self { horizon, top_n }
    }

    pub fn from_file<P: AsRef<Path>>(&self, path: P) -> Result<ItSectorReport> {
        let records: Vec<ItRecord> = read_records(path)?;
        self.analyze(&records)
    }

    pub fn analyze(&self, records: &[ItRecord]) -> Result<ItSectorReport> {
        let complete: Vec<(&str, ItObservation)> = records
            .iter()
            .filter_map(|r| r.complete().map(|o| (r.state.as_str(), o)))
            .collect();
        tracing::info!(
            "IT sector data: {} of {} rows complete",
            complete.len(),
            records.len()
        );

        let mut projections = Vec::new();
        for state in unique_in_order(complete.iter().map(|(s, _)| *s)) {
            let mut rows: Vec<ItObservation> = complete
                .iter()
                .filter(|(s, _)| *s == state)
                .map(|(_, o)| *o)
                .collect();
            rows.sort_by_key(|o| o.year);

            match self.analyze_state(&state, &rows) {
                Ok(projection) => projections.push(projection),
                Err(e) => tracing::warn!("Error processing {}: {}", state, e),
            }
        }

        if projections.is_empty() {
            return Err(ForecastError::InvalidData(
                "no state could be projected".to_string(),
            ));
        }

        projections.sort_by(|a, b| b.projected_growth.total_cmp(&a.projected_growth));

        let top = &projections[..self.top_n.min(projections.len())];
        let national = NationalAverages::over(top);

        let strategies = projections
            .iter()
            .take(self.top_n)
            .enumerate()
            .map(|(i, p)| investment_strategy(i + 1, p, &national))
            .collect();

        Ok(ItSectorReport {
            projections,
            national,
            strategies,
        })
    }

    pub fn analyze_state(&self, state: &str, rows: &[ItObservation]) -> Result<StateProjection> {
        let revenue: Vec<f64> = rows.iter().map(|o| o.revenue).collect();
        let exog = Array2::from_shape_fn((rows.len(), 2), |(i, j)| {
            if j == 0 {
                rows[i].repo_rate
            } else {
                rows[i].global_index
            }
        });
        let fitted = Sarimax::new(SarimaxOrder::new(1, 1, 1)).fit(&revenue, &exog)?;

        // экзогенные показатели держатся на последнем значении
        let last = rows[rows.len() - 1];
        let future_exog = Array2::from_shape_fn((self.horizon, 2), |(_, j)| {
            if j == 0 {
                last.repo_rate
            } else {
                last.global_index
            }
        });
        let forecast = fitted.forecast(self.horizon, &future_exog)?;

        let growth: Vec<f64> = revenue_growth(&revenue);
        let current = last.revenue;
        let projected_growth = (forecast.average() - current) / current;

        Ok(StateProjection {
            state: state.to_string(),
            current_revenue: current,
            avg_growth: nan_mean(&growth),
            unemployment: last.unemployment,
            internet_penetration: last.internet_penetration,
            projected_growth,
            historical_years: rows.iter().map(|o| o.year).collect(),
            historical_revenue: revenue,
            forecast_years: (1..=self.horizon as i32).map(|h| last.year + h).collect(),
            forecast,
        })
    }
}

impl Default for ItSectorAnalyzer {
    fn default() -> Self {
        Self::new(10, 3)
    }
}

/// Относительное изменение выручки, для первого года 0
pub fn revenue_growth(revenue: &[f64]) -> Vec<f64> {
    let mut growth = Vec::with_capacity(revenue.len());
    for (i, value) in revenue.iter().enumerate() {
        if i == 0 {
            growth.push(0.0);
        } else {
            let change = (value - revenue[i - 1]) / revenue[i - 1];
            growth.push(if change.is_finite() { change } else { 0.0 });
        }
    }
    growth
}

pub fn investment_strategy(
    rank: usize,
    projection: &StateProjection,
    national: &NationalAverages,
) -> InvestmentStrategy {
    let growth_rate = projection.projected_growth;
    let revenue = &projection.historical_revenue;
    let revenue_volatility = nan_std(revenue, 0) / nan_mean(revenue);

    let initiatives: &[&str] = if growth_rate > 0.2 {
        &[
            "Create special economic zone for tech companies",
            "Offer 5-year tax holiday for new IT investments",
        ]
    } else if growth_rate > 0.1 {
        &[
            "Upgrade existing IT parks with 5G infrastructure",
            "Subsidize tech education programs",
        ]
    } else {
        &[
            "Implement business retention grants",
            "Develop regional innovation hubs",
        ]
    };

    InvestmentStrategy {
        rank,
        state: projection.state.clone(),
        growth_rate,
        exceeds_national_growth: growth_rate > national.growth,
        unemployment: projection.unemployment,
        internet_penetration: projection.internet_penetration,
        revenue_volatility,
        confidence_width: projection.forecast.mean_interval_width(),
        allocation: vec![
            ("established IT firms".to_string(), 50),
            ("digital infrastructure".to_string(), 30),
            ("workforce development".to_string(), 20),
        ],
        initiatives: initiatives.iter().map(|s| s.to_string()).collect(),
    }
}

impl fmt::Display for ItSectorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "STRATEGIC INVESTMENT PLAN FOR TOP {} STATES", self.strategies.len())?;
        for s in &self.strategies {
            writeln!(f)?;
            writeln!(
                f,
                "#{}: {} (Projected Growth: {:.2}%)",
                s.rank,
                s.state,
                s.growth_rate * 100.0
            )?;
            writeln!(f, "WHY INVEST HERE?")?;
            writeln!(
                f,
                "- Growth rate ({:.2}%) {} the national average ({:.2}%)",
                s.growth_rate * 100.0,
                if s.exceeds_national_growth { "exceeds" } else { "is below" },
                self.national.growth * 100.0
            )?;
            writeln!(
                f,
                "- Urban Unemployment Rate: {:.2}% (National Avg: {:.2}%)",
                s.unemployment, self.national.unemployment
            )?;
            writeln!(
                f,
                "- Internet Penetration: {:.2}% (National Avg: {:.2}%)",
                s.internet_penetration, self.national.internet_penetration
            )?;
            writeln!(f, "- Revenue Volatility: {:.2}%", s.revenue_volatility * 100.0)?;
            writeln!(f, "- Forecast Confidence Interval Width: {:.2} Cr", s.confidence_width)?;
            writeln!(f, "CORE ALLOCATION:")?;
            for (target, share) in &s.allocation {
                writeln!(f, "- {}% to {}", share, target)?;
            }
            writeln!(f, "SPECIAL INITIATIVES:")?;
            for initiative in &s.initiatives {
                writeln!(f, "- {}", initiative)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, year: i32, revenue: f64) -> ItRecord {
        let t = (year - 2010) as f64;
        ItRecord {
            state: state.to_string(),
            year,
            revenue: Some(revenue),
            repo_rate: Some(6.0 + (t * 0.7).sin() * 0.5),
            global_index: Some(100.0 + t + (t * 1.3).cos()),
            unemployment: Some(5.0 + t * 0.1),
            internet_penetration: Some(30.0 + t * 4.0),
        }
    }

    fn records() -> Vec<ItRecord> {
        let mut rows = Vec::new();
        for year in 2010..=2020 {
            let t = (year - 2010) as f64;
            rows.push(record("Karnataka", year, 1000.0 * 1.15f64.powf(t) + (t * 1.7).sin() * 20.0));
            rows.push(record("Kerala", year, 500.0 + 5.0 * t + (t * 0.9).cos() * 8.0));
        }
        // неполная строка отбрасывается
        let mut broken = record("Goa", 2015, 10.0);
        broken.repo_rate = None;
        rows.push(broken);
        rows
    }

    #[test]
    fn growth_starts_at_zero() {
        let growth = revenue_growth(&[100.0, 110.0, 99.0]);
        assert_eq!(growth[0], 0.0);
        assert!((growth[1] - 0.1).abs() < 1e-12);
        assert!((growth[2] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let mut rec = record("Goa", 2015, 10.0);
        assert!(rec.complete().is_some());
        rec.internet_penetration = Some(f64::NAN);
        assert!(rec.complete().is_none());
    }

    #[test]
    fn states_are_ranked_by_projected_growth() {
        let report = ItSectorAnalyzer::default().analyze(&records()).unwrap();

        assert_eq!(report.projections.len(), 2);
        assert!(report.projections[0].projected_growth >= report.projections[1].projected_growth);
        assert_eq!(report.strategies.len(), 2);
        assert!(report.projections.iter().all(|p| p.forecast.len() == 10));
        assert_eq!(report.projections[0].forecast_years[0], 2021);
    }

    fn projection(state: &str, unemployment: f64, projected_growth: f64) -> StateProjection {
        StateProjection {
            state: state.into(),
            current_revenue: 100.0,
            avg_growth: 0.1,
            unemployment,
            internet_penetration: unemployment * 10.0,
            projected_growth,
            historical_years: vec![2019, 2020],
            historical_revenue: vec![90.0, 110.0],
            forecast_years: vec![2021],
            forecast: SarimaxForecast {
                mean: vec![115.0],
                lower: vec![105.0],
                upper: vec![125.0],
            },
        }
    }

    #[test]
    fn national_averages_cover_selected_states_only() {
        // уже отсортированы по убыванию роста: D > C > B > A
        let projections = vec![
            projection("D", 11.0, 0.4),
            projection("C", 8.0, 0.3),
            projection("B", 5.0, 0.2),
            projection("A", 2.0, 0.1),
        ];
        let national = NationalAverages::over(&projections[..3]);

        assert!((national.unemployment - 8.0).abs() < 1e-12);
        assert!((national.internet_penetration - 80.0).abs() < 1e-12);
        assert!((national.growth - 0.3).abs() < 1e-12);

        let strategy = investment_strategy(3, &projections[2], &national);
        assert!(!strategy.exceeds_national_growth);
    }

    #[test]
    fn report_averages_use_top_states() {
        let mut rows = records();
        for year in 2010..=2020 {
            let t = (year - 2010) as f64;
            rows.push(record("Goa", year, 200.0 + 2.0 * t + (t * 1.1).sin() * 3.0));
            rows.push(record("Punjab", year, 300.0 * 1.05f64.powf(t) + (t * 0.6).cos() * 5.0));
        }
        let report = ItSectorAnalyzer::new(10, 3).analyze(&rows).unwrap();
        assert_eq!(report.projections.len(), 4);

        let expected = NationalAverages::over(&report.projections[..3]);
        assert_eq!(report.national.growth, expected.growth);
        assert_eq!(report.national.unemployment, expected.unemployment);
        assert!(report.national.growth > NationalAverages::over(&report.projections).growth);
        assert_eq!(report.strategies.len(), 3);
    }

    #[test]
    fn initiatives_follow_growth_bands() {
        let projection = StateProjection {
            state: "Telangana".into(),
            current_revenue: 100.0,
            avg_growth: 0.1,
            unemployment: 6.0,
            internet_penetration: 50.0,
            projected_growth: 0.15,
            historical_years: vec![2019, 2020],
            historical_revenue: vec![90.0, 110.0],
            forecast_years: vec![2021],
            forecast: SarimaxForecast {
                mean: vec![115.0],
                lower: vec![105.0],
                upper: vec![125.0],
            },
        };
        let national = NationalAverages {
            unemployment: 6.0,
            internet_penetration: 40.0,
            growth: 0.2,
        };

        let strategy = investment_strategy(1, &projection, &national);
        assert_eq!(strategy.initiatives[0], "Upgrade existing IT parks with 5G infrastructure");
        assert!(!strategy.exceeds_national_growth);
        assert!((strategy.revenue_volatility - 0.1).abs() < 1e-12);
        assert_eq!(strategy.confidence_width, 20.0);
        assert_eq!(strategy.allocation.iter().map(|(_, s)| *s as u32).sum::<u32>(), 100);

        let text = ItSectorReport {
            projections: vec![projection],
            national,
            strategies: vec![strategy],
        }
        .to_string();
        assert!(text.contains("is below the national average"));
        assert!(text.contains("- 50% to established IT firms"));
    }
}
