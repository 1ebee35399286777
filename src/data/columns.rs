//! Имена колонок национального датасета

pub const GDP_GROWTH: &str = "GDP Growth (%)";
pub const INFLATION: &str = "Inflation Rate (%)";
pub const INTEREST_RATE: &str = "Interest Rate (%)";
pub const EXCHANGE_RATE: &str = "Exchange Rate (USD/INR)";
pub const FISCAL_DEFICIT: &str = "Fiscal Deficit (% of GDP)";
pub const UNEMPLOYMENT: &str = "Unemployment Rate (%)";
pub const M3_GROWTH: &str = "Money Supply (M3) Growth (%)";
pub const BANK_CREDIT: &str = "Bank Credit Growth (%)";
pub const EXPORTS: &str = "Exports (Billion USD)";
pub const IMPORTS: &str = "Imports (Billion USD)";
pub const FDI: &str = "FDI (Billion USD)";
pub const FIXED_CAPITAL: &str = "Fixed Capital Formation (% of GDP)";

pub const GDP_TREND_ROLLMEAN5: &str = "GDP_Trend_RollMean5";
pub const GDP_CHANGE_YOY: &str = "GDP_Change_YoY";
pub const REFORM_POLICY_BOOST: &str = "Reform_Policy_Boost";

pub const CRISIS_2020: &str = "Crisis_2020";
pub const RECOVERY_2021_2022: &str = "Recovery_2021_2022";
pub const POLICY_PUSH_2023: &str = "Policy_Push_2023";

pub const SARIMAX_PRED: &str = "SARIMAX_Pred";
pub const RESIDUAL: &str = "Residual";

/// Колонки, в которых выбросы заменяются пропусками
pub const IQR_COLUMNS: [&str; 5] = [
    GDP_GROWTH,
    INFLATION,
    INTEREST_RATE,
    FISCAL_DEFICIT,
    UNEMPLOYMENT,
];

/// Макропоказатели, для которых строятся лаги и скользящие средние
pub const MACRO_COLUMNS: [&str; 11] = [
    GDP_GROWTH,
    INFLATION,
    INTEREST_RATE,
    EXCHANGE_RATE,
    FISCAL_DEFICIT,
    UNEMPLOYMENT,
    M3_GROWTH,
    BANK_CREDIT,
    EXPORTS,
    IMPORTS,
    FDI,
];

/// Колонки, не являющиеся признаками модели остатков
pub const NON_FEATURE_COLUMNS: [&str; 4] = [super::YEAR_COLUMN, GDP_GROWTH, SARIMAX_PRED, RESIDUAL];

pub fn lag1(column: &str) -> String {
    format!("{}_lag1", column)
}

pub fn lag2(column: &str) -> String {
    format!("{}_lag2", column)
}

pub fn ma3(column: &str) -> String {
    format!("{}_ma3", column)
}

/// Экзогенные регрессоры национальной SARIMAX
pub fn default_exog_columns() -> Vec<String> {
    vec![
        lag2(INFLATION),
        lag1(FISCAL_DEFICIT),
        lag1(INTEREST_RATE),
        lag1(M3_GROWTH),
        lag1(EXCHANGE_RATE),
        lag1(UNEMPLOYMENT),
        lag1(BANK_CREDIT),
        lag1(FDI),
        lag1(EXPORTS),
        FIXED_CAPITAL.to_string(),
    ]
}
