use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinPlanError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FinPlanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        FinPlanError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FinPlanError {
    fn from(e: serde_json::Error) -> Self {
        FinPlanError::SerializationError(e.to_string())
    }
}
