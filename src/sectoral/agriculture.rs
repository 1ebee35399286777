//! Анализ сельского хозяйства: прогноз производства культур по штатам,
//! оценка инвестиционной привлекательности и обоснование выбора.
//!
//! Для каждой пары штат/культура строится SARIMAX(1,1,1) с экзогенными
//! экспортом и осадками. Балл учитывает прогноз, цену, рост, качество почвы
//! и волатильность цены.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{mode, nan_mean, nan_std, rank_descending, unique_in_order};
use crate::error::{ForecastError, Result};
use crate::models::sarimax::{Sarimax, SarimaxForecast, SarimaxOrder};

#[derive(Debug, Clone, Deserialize)]
pub struct ProductionRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Production Quantity", deserialize_with = "csv::invalid_option")]
    pub production: Option<f64>,
    #[serde(rename = "Export Volume", deserialize_with = "csv::invalid_option")]
    pub export_volume: Option<f64>,
    #[serde(rename = "Wholesale Price", deserialize_with = "csv::invalid_option")]
    pub wholesale_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClimateRecord {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Annual Rainfall (mm)", deserialize_with = "csv::invalid_option")]
    pub rainfall: Option<f64>,
    #[serde(rename = "Soil pH Level", deserialize_with = "csv::invalid_option")]
    pub soil_ph: Option<f64>,
    #[serde(rename = "Organic Matter (%)", deserialize_with = "csv::invalid_option")]
    pub organic_matter: Option<f64>,
    #[serde(rename = "Soil Type", default)]
    pub soil_type: Option<String>,
}

/// Строка объединённых данных производства и климата
#[derive(Debug, Clone, PartialEq)]
pub struct CropObservation {
    pub state: String,
    pub year: i32,
    pub crop: String,
    pub production: f64,
    pub export_volume: f64,
    pub wholesale_price: f64,
    pub rainfall: f64,
    pub soil_ph: f64,
    pub organic_matter: f64,
    pub soil_type: Option<String>,
}

pub fn read_records<T, P>(path: P) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Левое соединение по (штат, год); строки без производства, экспорта
/// или осадков отбрасываются
pub fn merge_records(
    production: &[ProductionRecord],
    climate: &[ClimateRecord],
) -> Vec<CropObservation> {
    let mut by_key: HashMap<(&str, i32), Vec<&ClimateRecord>> = HashMap::new();
    for record in climate {
        by_key
            .entry((record.state.as_str(), record.year))
            .or_default()
            .push(record);
    }

    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let mut merged = Vec::new();
    for p in production {
        let matches = by_key.get(&(p.state.as_str(), p.year));
        let climates: Vec<Option<&ClimateRecord>> = match matches {
            Some(list) => list.iter().map(|c| Some(*c)).collect(),
            None => vec![None],
        };

        for c in climates {
            let rainfall = c.and_then(|c| finite(c.rainfall));
            let (production_qty, export_volume, rainfall) =
                match (finite(p.production), finite(p.export_volume), rainfall) {
                    (Some(a), Some(b), Some(r)) => (a, b, r),
                    _ => continue,
                };
            merged.push(CropObservation {
                state: p.state.clone(),
                year: p.year,
                crop: p.crop.clone(),
                production: production_qty,
                export_volume,
                wholesale_price: finite(p.wholesale_price).unwrap_or(f64::NAN),
                rainfall,
                soil_ph: c.and_then(|c| finite(c.soil_ph)).unwrap_or(f64::NAN),
                organic_matter: c.and_then(|c| finite(c.organic_matter)).unwrap_or(f64::NAN),
                soil_type: c.and_then(|c| c.soil_type.clone()).filter(|s| !s.is_empty()),
            });
        }
    }
    merged
}

/// Баллы почвы: pH до 3, органика до 2
pub fn soil_score(ph: f64, organic_matter: f64) -> u8 {
    let mut score = 0;
    if (6.0..=7.0).contains(&ph) {
        score += 3;
    } else if (5.5..6.0).contains(&ph) || (ph > 7.0 && ph <= 7.5) {
        score += 2;
    }
    if organic_matter >= 2.0 {
        score += 2;
    } else if (1.0..2.0).contains(&organic_matter) {
        score += 1;
    }
    score
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropAssessment {
    pub state: String,
    pub crop: String,
    pub current_production: f64,
    pub forecasted_production: f64,
    pub growth_rate: f64,
    pub avg_price: f64,
    pub price_volatility: f64,
    pub export_dependence: f64,
    pub rainfall_variability: f64,
    pub soil_ph: f64,
    pub organic_matter: f64,
    pub soil_score: u8,
    pub dominant_soil: String,
    pub score: f64,
    pub state_rank: f64,
    pub national_rank: f64,
    pub forecast_years: Vec<i32>,
    pub forecast: SarimaxForecast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentPick {
    pub rank: usize,
    pub state: String,
    pub crop: String,
    pub score: f64,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgricultureReport {
    /// Культуры каждого штата по рангу внутри штата
    pub states: BTreeMap<String, Vec<CropAssessment>>,
    /// Все культуры по национальному рангу
    pub national: Vec<CropAssessment>,
    pub top_picks: Vec<InvestmentPick>,
}

pub struct AgricultureAnalyzer {
    horizon: usize,
    min_observations: usize,
    top_n: usize,
}

impl AgricultureAnalyzer {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            min_observations: 5,
            top_n: 5,
        }
    }

    pub fn from_files<P: AsRef<Path>>(
        &self,
        production: P,
        climate: P,
    ) -> Result<AgricultureReport> {
        let production: Vec<ProductionRecord> = read_records(production)?;
        let climate: Vec<ClimateRecord> = read_records(climate)?;
        let merged = merge_records(&production, &climate);
        tracing::info!(
            "Agriculture data: {} production rows, {} merged observations",
            production.len(),
            merged.len()
        );
        self.analyze(&merged)
    }

    pub fn analyze(&self, observations: &[CropObservation]) -> Result<AgricultureReport> {
        let mut states = BTreeMap::new();
        let mut national = Vec::new();

        for state in unique_in_order(observations.iter().map(|o| o.state.as_str())) {
            let rows: Vec<&CropObservation> =
                observations.iter().filter(|o| o.state == state).collect();
            let assessed = self.analyze_state(&state, &rows);
            if assessed.is_empty() {
                tracing::warn!("No valid crop data for {}", state);
                continue;
            }
            if let Some(top) = assessed.first() {
                tracing::info!("{}: top crop {} (score {:.2})", state, top.crop, top.score);
            }
            national.extend(assessed.iter().cloned());
            states.insert(state, assessed);
        }

        if national.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: self.min_observations,
                got: 0,
            });
        }

        let scores: Vec<f64> = national.iter().map(|a| a.score).collect();
        for (assessment, rank) in national.iter_mut().zip(rank_descending(&scores)) {
            assessment.national_rank = rank;
        }
        national.sort_by(|a, b| a.national_rank.total_cmp(&b.national_rank));
        for assessed in states.values_mut() {
            for a in assessed.iter_mut() {
                if let Some(n) = national.iter().find(|n| n.state == a.state && n.crop == a.crop) {
                    a.national_rank = n.national_rank;
                }
            }
        }

        let top_picks = national
            .iter()
            .take(self.top_n)
            .enumerate()
            .map(|(i, a)| InvestmentPick {
                rank: i + 1,
                state: a.state.clone(),
                crop: a.crop.clone(),
                score: a.score,
                rationale: investment_rationale(&a.state, &a.crop, observations, &national),
            })
            .collect();

        Ok(AgricultureReport {
            states,
            national,
            top_picks,
        })
    }

    /// Оценка культур штата; культуры, для которых модель не строится, пропускаются
    pub fn analyze_state(&self, state: &str, rows: &[&CropObservation]) -> Vec<CropAssessment> {
        let mut results = Vec::new();

        for crop in unique_in_order(rows.iter().map(|o| o.crop.as_str())) {
            let mut crop_rows: Vec<&CropObservation> =
                rows.iter().copied().filter(|o| o.crop == crop).collect();
            if crop_rows.len() < self.min_observations {
                continue;
            }
            crop_rows.sort_by_key(|o| o.year);

            match self.assess_crop(state, &crop, &crop_rows) {
                Ok(assessment) => results.push(assessment),
                Err(e) => tracing::debug!("Skipping {} in {}: {}", crop, state, e),
            }
        }

        let scores: Vec<f64> = results.iter().map(|a| a.score).collect();
        for (assessment, rank) in results.iter_mut().zip(rank_descending(&scores)) {
            assessment.state_rank = rank;
        }
        results.sort_by(|a, b| a.state_rank.total_cmp(&b.state_rank));
        results
    }

    fn assess_crop(
        &self,
        state: &str,
        crop: &str,
        rows: &[&CropObservation],
    ) -> Result<CropAssessment> {
        let production: Vec<f64> = rows.iter().map(|o| o.production).collect();
        let exports: Vec<f64> = rows.iter().map(|o| o.export_volume).collect();
        let rainfall: Vec<f64> = rows.iter().map(|o| o.rainfall).collect();
        let prices: Vec<f64> = rows.iter().map(|o| o.wholesale_price).collect();

        let exog = Array2::from_shape_fn((rows.len(), 2), |(i, j)| {
            if j == 0 {
                exports[i]
            } else {
                rainfall[i]
            }
        });
        let fitted = Sarimax::new(SarimaxOrder::new(1, 1, 1)).fit(&production, &exog)?;

        let tail_mean = |values: &[f64]| {
            let tail = &values[values.len().saturating_sub(3)..];
            tail.iter().sum::<f64>() / tail.len() as f64
        };
        let (future_export, future_rain) = (tail_mean(&exports), tail_mean(&rainfall));
        let future_exog = Array2::from_shape_fn((self.horizon, 2), |(_, j)| {
            if j == 0 {
                future_export
            } else {
                future_rain
            }
        });
        let forecast = fitted.forecast(self.horizon, &future_exog)?;

        let current = production[production.len() - 1];
        let forecasted = forecast.average();
        let growth_rate = (forecasted - current) / current;
        let avg_price = nan_mean(&prices);
        let price_volatility = nan_std(&prices, 1) / avg_price;
        let export_dependence = nan_mean(&exports) / nan_mean(&production);
        let rainfall_variability = nan_std(&rainfall, 1) / nan_mean(&rainfall);

        let soil_ph = nan_mean(&rows.iter().map(|o| o.soil_ph).collect::<Vec<_>>());
        let organic_matter = nan_mean(&rows.iter().map(|o| o.organic_matter).collect::<Vec<_>>());
        let soil = soil_score(soil_ph, organic_matter);
        let dominant_soil = mode(rows.iter().filter_map(|o| o.soil_type.as_deref()))
            .unwrap_or_else(|| "Unknown".to_string());

        let base_score = forecasted * avg_price * (1.0 + growth_rate);
        let score = base_score * (1.0 + f64::from(soil) / 5.0) * (1.0 - price_volatility / 2.0);

        let last_year = rows[rows.len() - 1].year;
        Ok(CropAssessment {
            state: state.to_string(),
            crop: crop.to_string(),
            current_production: current,
            forecasted_production: forecasted,
            growth_rate,
            avg_price,
            price_volatility,
            export_dependence,
            rainfall_variability,
            soil_ph,
            organic_matter,
            soil_score: soil,
            dominant_soil,
            score,
            state_rank: 0.0,
            national_rank: 0.0,
            forecast_years: (1..=self.horizon as i32).map(|h| last_year + h).collect(),
            forecast,
        })
    }
}

impl Default for AgricultureAnalyzer {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Обоснование инвестиций: доля рынка, экспорт, осадки, почва и цена
pub fn investment_rationale(
    state: &str,
    crop: &str,
    observations: &[CropObservation],
    national: &[CropAssessment],
) -> Vec<String> {
    let rows: Vec<&CropObservation> = observations
        .iter()
        .filter(|o| o.state == state && o.crop == crop)
        .collect();
    if rows.is_empty() {
        return vec![format!("No data available for {} in {}.", crop, state)];
    }

    let column = |f: fn(&CropObservation) -> f64| rows.iter().map(|o| f(o)).collect::<Vec<f64>>();
    let production = column(|o| o.production);
    let national_production: f64 = observations
        .iter()
        .filter(|o| o.crop == crop)
        .map(|o| o.production)
        .sum();
    let state_production: f64 = production.iter().sum();
    let market_share = if national_production > 0.0 {
        state_production / national_production * 100.0
    } else {
        0.0
    };

    let export_ratio = nan_mean(&column(|o| o.export_volume)) / nan_mean(&production) * 100.0;
    let rainfall = column(|o| o.rainfall);
    let rainfall_var = nan_std(&rainfall, 1) / nan_mean(&rainfall) * 100.0;
    let soil_ph = nan_mean(&column(|o| o.soil_ph));
    let organic_matter = nan_mean(&column(|o| o.organic_matter));

    let national_price = nan_mean(
        &national
            .iter()
            .filter(|a| a.crop == crop)
            .map(|a| a.avg_price)
            .collect::<Vec<_>>(),
    );
    let state_price = nan_mean(&column(|o| o.wholesale_price));
    let price_premium = if national_price > 0.0 {
        (state_price - national_price) / national_price * 100.0
    } else {
        0.0
    };

    let mut points = Vec::new();

    points.push(if market_share > 20.0 {
        format!("Market Leader: Accounts for {:.1}% of India's {} production", market_share, crop)
    } else if market_share > 10.0 {
        format!(
            "Significant Producer: Contributes {:.1}% of national {} output",
            market_share, crop
        )
    } else {
        format!("Growing Producer: Holds {:.1}% share in {} market", market_share, crop)
    });

    points.push(if export_ratio > 30.0 {
        format!("Export Powerhouse: {:.1}% of production is exported globally", export_ratio)
    } else if export_ratio > 15.0 {
        format!("Growing Exporter: {:.1}% export ratio shows international demand", export_ratio)
    } else {
        format!(
            "Domestic Focus: Primarily serves local markets (export ratio: {:.1}%)",
            export_ratio
        )
    });

    points.push(if rainfall_var < 15.0 {
        format!("Climate Stable: Highly predictable rainfall (variability: {:.1}%)", rainfall_var)
    } else if rainfall_var < 30.0 {
        format!("Moderate Climate Risk: Rainfall varies by {:.1}% annually", rainfall_var)
    } else {
        format!(
            "Climate Challenge: High rainfall variability ({:.1}%) requires irrigation planning",
            rainfall_var
        )
    });

    let moderate_ph = (5.5..6.0).contains(&soil_ph) || (soil_ph > 7.0 && soil_ph <= 7.5);
    points.push(if (6.0..=7.0).contains(&soil_ph) && organic_matter >= 2.0 {
        format!(
            "Premium Soil: Ideal pH ({:.1}) and high organic content ({:.1}%)",
            soil_ph, organic_matter
        )
    } else if moderate_ph {
        format!(
            "Good Soil: Moderate pH ({:.1}) and organic matter ({:.1}%)",
            soil_ph, organic_matter
        )
    } else {
        format!("Soil Improvement Needed: pH {:.1}, organic matter {:.1}%", soil_ph, organic_matter)
    });

    points.push(if price_premium > 10.0 {
        format!("Premium Pricing: Local prices are {:.1}% above national average", price_premium)
    } else if price_premium > 0.0 {
        format!("Slight Price Advantage: State commands a {:.1}% price premium", price_premium)
    } else if price_premium < -10.0 {
        format!("Price Disadvantage: Prices are {:.1}% below national average", price_premium.abs())
    } else {
        "Competitive Pricing: Prices align closely with national averages".to_string()
    });

    let special = match (state, crop) {
        ("Punjab", "Wheat") => {
            Some("Punjab Special: Benefits from established wheat procurement system")
        }
        ("Maharashtra", "Grapes") => {
            Some("Maharashtra Advantage: World-class grape processing infrastructure")
        }
        _ => None,
    };
    points.extend(special.map(str::to_string));

    points
}

impl AgricultureReport {
    /// Отчёты по штатам вместе с именами файлов `{state}_report.txt`
    pub fn state_reports(&self) -> impl Iterator<Item = (String, StateReport<'_>)> {
        self.states.iter().map(|(state, crops)| {
            let file = format!("{}_report.txt", state.replace(' ', "_"));
            (file, StateReport { state, crops })
        })
    }
}

/// Отчёт по одному штату: лучшая культура и три первые по рангу
#[derive(Debug, Clone, Copy)]
pub struct StateReport<'a> {
    pub state: &'a str,
    pub crops: &'a [CropAssessment],
}

impl fmt::Display for StateReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AGRICULTURAL ANALYSIS FOR {} (10-YEAR FORECAST)", self.state.to_uppercase())?;
        let Some(top) = self.crops.first() else {
            writeln!(f)?;
            return writeln!(f, "No valid crop data available for this state.");
        };
        writeln!(f)?;
        writeln!(f, "TOP CROP: {}", top.crop.to_uppercase())?;
        writeln!(f, "Current Production: {:.2} tonnes", top.current_production)?;
        writeln!(f, "Forecasted Production (10yr avg): {:.2} tonnes", top.forecasted_production)?;
        writeln!(f, "10-Year Growth Rate: {:.2}%", top.growth_rate * 100.0)?;
        writeln!(f, "Average Price: {:.2}", top.avg_price)?;
        writeln!(f, "Soil Score: {}/5", top.soil_score)?;
        writeln!(f, "10-Year Investment Score: {:.2}", top.score)?;
        writeln!(f)?;
        writeln!(f, "TOP 3 CROPS IN THIS STATE:")?;
        for a in self.crops.iter().take(3) {
            writeln!(
                f,
                " - {}: Score={:.2}, Growth={:.2}%, Price={:.2}",
                a.crop,
                a.score,
                a.growth_rate * 100.0,
                a.avg_price
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for AgricultureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "TOP {} AGRICULTURAL INVESTMENT OPPORTUNITIES ACROSS INDIA",
            self.top_picks.len()
        )?;
        for pick in &self.top_picks {
            let detail = self
                .national
                .iter()
                .find(|a| a.state == pick.state && a.crop == pick.crop);
            writeln!(f)?;
            writeln!(f, "#{}: {} in {}", pick.rank, pick.crop, pick.state)?;
            if let Some(a) = detail {
                writeln!(f, "Current Production: {:.2} tonnes", a.current_production)?;
                writeln!(
                    f,
                    "Forecasted Production (10yr avg): {:.2} tonnes",
                    a.forecasted_production
                )?;
                writeln!(f, "Growth Rate: {:.2}%", a.growth_rate * 100.0)?;
                writeln!(f, "Average Price: {:.2}", a.avg_price)?;
                writeln!(f, "Soil Score: {}/5", a.soil_score)?;
                writeln!(f, "Investment Score: {:.2}", a.score)?;
            }
            writeln!(f, "Why invest in {} in {}?", pick.crop, pick.state)?;
            for point in &pick.rationale {
                writeln!(f, "- {}", point)?;
            }
        }
        Ok(())
    }
}
