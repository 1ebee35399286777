/// Модели прогнозирования ВВП

pub mod cross_validation;
pub mod gradient_boosting;
pub mod linalg;
pub mod optimizer;
pub mod recommendations;
pub mod residual;
pub mod sarimax;
pub mod scenario;

pub use cross_validation::TimeSeriesSplit;
pub use gradient_boosting::{Booster, BoosterParams, GradientBoostingRegressor};
pub use recommendations::{MacroIndicators, RecommendationEngine, RecommendationReport};
pub use residual::{ResidualModel, ResidualTrainer, ResidualTraining};
pub use sarimax::{FittedSarimax, Sarimax, SarimaxForecast, SarimaxOrder};
pub use scenario::{simulate_future_features, HybridForecaster, Scenario, ScenarioForecast};
