//! Store error types

use std::time::Duration;
use thiserror::Error;

use crate::model::TemplateId;

/// Errors that can occur while talking to a template store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Template not found: {0}")]
    NotFound(TemplateId),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if a repeated attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Api { status, .. } => matches!(*status, 408 | 429) || *status >= 500,
            StoreError::Network(_) => true,
            StoreError::Timeout(_) => true,
            StoreError::NotFound(_) => false,
            StoreError::InvalidResponse(_) => false,
            StoreError::Json(_) => false,
        }
    }
}
