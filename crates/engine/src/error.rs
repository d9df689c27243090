use countrydesk_core::CoreError;
use countrydesk_storage::StorageError;
use thiserror::Error;

use crate::creation::ValidationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("country not found: {0}")]
    CountryNotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// The target document vanished between load and save.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::CountryNotFound(_) | EngineError::Storage(StorageError::NotFound(_))
        )
    }
}
