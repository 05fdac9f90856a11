use thiserror::Error;

use crate::config::ConfigurationError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeadflowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for LeadflowError {
    fn from(err: sqlx::Error) -> Self {
        LeadflowError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for LeadflowError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        LeadflowError::DatabaseError(format!("Migration failed: {err}"))
    }
}

impl From<serde_json::Error> for LeadflowError {
    fn from(err: serde_json::Error) -> Self {
        LeadflowError::ValidationError(format!("JSON serialization error: {err}"))
    }
}

impl From<StoreError> for LeadflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                LeadflowError::NotFound(format!("{entity} {id}"))
            }
            other => LeadflowError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for LeadflowError {
    fn from(err: ConfigurationError) -> Self {
        LeadflowError::ConfigurationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LeadflowError>;
