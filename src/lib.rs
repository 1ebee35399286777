//! India GDP forecast - гибридная модель SARIMAX + бустинг остатков

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod sectoral;
pub mod server;
pub mod types;

pub use error::{ForecastError, Result};
pub use models::*;
pub use preprocessing::*;
pub use types::*;

// Re-export для удобства
pub use config::PipelineConfig;
pub use data::Frame;
pub use pipeline::Pipeline;
