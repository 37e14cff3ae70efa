pub mod catalog;
pub mod config;
pub mod error;
pub mod numeric;
pub mod projection;
pub mod types;

#[cfg(feature = "three_statement")]
pub mod three_statement;

#[cfg(feature = "working_capital")]
pub mod working_capital;

#[cfg(feature = "diagnostics")]
pub mod diagnostics;

pub use config::ModelConfig;
pub use error::FinPlanError;
pub use types::*;

/// Standard result type for all finplan operations
pub type FinPlanResult<T> = Result<T, FinPlanError>;
