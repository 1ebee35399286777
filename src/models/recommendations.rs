/// Генератор экономических рекомендаций по прогнозу ВВП

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::columns::{
    lag1, lag2, BANK_CREDIT, EXPORTS, FDI, FISCAL_DEFICIT, INFLATION, INTEREST_RATE, M3_GROWTH,
    UNEMPLOYMENT,
};
use crate::data::Frame;
use crate::error::Result;

const NO_RISKS: &str = "No significant macroeconomic risks projected.";
const NO_OPPORTUNITIES: &str = "No major opportunities identified.";
const NO_RECOMMENDATIONS: &str = "Maintain current policy direction with caution.";

/// Показатели, по которым строится отчёт
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroIndicators {
    pub inflation: f64,
    pub interest_rate: f64,
    pub unemployment: f64,
    pub fiscal_deficit: f64,
    pub credit_growth: f64,
    pub fdi: f64,
    pub m3_growth: f64,
    pub exports: f64,
    pub gdp_forecast: f64,
}

impl MacroIndicators {
    /// Лаги последнего исторического года и итоговый прогноз ВВП
    pub fn from_frame(processed: &Frame, year: i32, gdp_forecast: f64) -> Result<Self> {
        Ok(Self {
            inflation: processed.value_at(year, &lag2(INFLATION))?,
            interest_rate: processed.value_at(year, &lag1(INTEREST_RATE))?,
            unemployment: processed.value_at(year, &lag1(UNEMPLOYMENT))?,
            fiscal_deficit: processed.value_at(year, &lag1(FISCAL_DEFICIT))?,
            credit_growth: processed.value_at(year, &lag1(BANK_CREDIT))?,
            fdi: processed.value_at(year, &lag1(FDI))?,
            m3_growth: processed.value_at(year, &lag1(M3_GROWTH))?,
            exports: processed.value_at(year, &lag1(EXPORTS))?,
            gdp_forecast,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub year: i32,
    pub gdp_forecast: f64,
    pub risks: Vec<String>,
    pub opportunities: Vec<String>,
    pub recommendations: Vec<String>,
}

impl fmt::Display for RecommendationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Economic Recommendation Report: Year {}", self.year)?;
        writeln!(f, "GDP Forecast: {:.2}%", self.gdp_forecast)?;

        let sections = [
            ("Key Risks", &self.risks, NO_RISKS),
            ("Economic Opportunities", &self.opportunities, NO_OPPORTUNITIES),
            ("Strategic Recommendations", &self.recommendations, NO_RECOMMENDATIONS),
        ];
        for (title, items, fallback) in sections {
            writeln!(f)?;
            writeln!(f, "{}:", title)?;
            if items.is_empty() {
                writeln!(f, "- {}", fallback)?;
            }
            for item in items {
                writeln!(f, "- {}", item)?;
            }
        }
        Ok(())
    }
}

pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn generate(year: i32, data: &MacroIndicators) -> RecommendationReport {
        let report = RecommendationReport {
            year,
            gdp_forecast: data.gdp_forecast,
            risks: Self::risks(data),
            opportunities: Self::opportunities(data),
            recommendations: Self::recommendations(data),
        };
        tracing::info!(
            "Recommendations for {}: {} risks, {} opportunities, {} actions",
            year,
            report.risks.len(),
            report.opportunities.len(),
            report.recommendations.len()
        );
        report
    }

    fn risks(data: &MacroIndicators) -> Vec<String> {
        let rules = [
            (
                data.inflation > 6.0,
                "High inflation may suppress real incomes and consumer confidence.",
            ),
            (
                data.unemployment > 7.0,
                "Elevated unemployment levels could signal labor market stress.",
            ),
            (
                data.interest_rate > 7.5,
                "Tight monetary policy may affect capital expenditure and borrowing.",
            ),
            (
                data.fiscal_deficit > 6.5,
                "Rising fiscal deficit may lead to debt sustainability concerns.",
            ),
            (
                data.gdp_forecast < 6.0,
                "Growth may not be strong enough to offset structural weaknesses.",
            ),
        ];
        collect(&rules)
    }

    fn opportunities(data: &MacroIndicators) -> Vec<String> {
        let rules = [
            (
                data.fdi > 60.0,
                "Strong FDI inflows indicate sustained global investor confidence in India.",
            ),
            (
                data.credit_growth > 10.0,
                "High credit growth reflects strong business and consumer lending activity.",
            ),
            (data.m3_growth > 8.0, "Ample liquidity suggests supportive monetary environment."),
            (data.exports > 400.0, "Robust exports could buffer external imbalances."),
            (
                data.gdp_forecast > 6.5,
                "Above-average GDP growth expected; India remains on a strong upward trajectory.",
            ),
        ];
        collect(&rules)
    }

    fn recommendations(data: &MacroIndicators) -> Vec<String> {
        let rules = [
            (
                data.inflation < 5.0 && data.credit_growth > 10.0,
                "Continue supportive credit policies to sustain expansion momentum.",
            ),
            (
                data.fdi > 60.0,
                "Encourage long-term capital formation in infrastructure and technology.",
            ),
            (
                data.fiscal_deficit > 6.0,
                "Tighten expenditure controls to maintain fiscal sustainability.",
            ),
            (
                data.unemployment > 6.0,
                "Invest in labor-intensive sectors like manufacturing and construction.",
            ),
        ];
        collect(&rules)
    }
}

fn collect(rules: &[(bool, &str)]) -> Vec<String> {
    rules
        .iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, text)| text.to_string())
        .collect()
}
