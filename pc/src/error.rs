//! Session error types

use templatestore::{StoreError, TemplateId, TemplateType};
use thiserror::Error;

use crate::classifier::TemplateAction;

/// Errors surfaced by the template session
///
/// None of these end the session: validation and authorization failures
/// are decided locally without a store call, remote failures leave the
/// previous state in place.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation failed: {field} is required")]
    Validation { field: &'static str },

    #[error("Cannot {action} template {id}: not permitted for its owner")]
    Authorization { action: TemplateAction, id: TemplateId },

    #[error("Template store failed: {0}")]
    Remote(#[from] StoreError),

    #[error("No template is open in the editor")]
    NoDraft,

    #[error("The open template is read-only")]
    ReadOnlyDraft,

    #[error("Delete was not confirmed")]
    NotConfirmed,

    #[error("Template type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: TemplateType,
        actual: TemplateType,
    },
}

impl SessionError {
    /// Failures caused by the store rather than by the request itself
    pub fn is_remote(&self) -> bool {
        matches!(self, SessionError::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = SessionError::Validation { field: "template" };
        assert!(err.to_string().contains("template is required"));
    }

    #[test]
    fn test_authorization_message() {
        let err = SessionError::Authorization {
            action: TemplateAction::Delete,
            id: TemplateId::new("sys-1"),
        };
        let msg = err.to_string();
        assert!(msg.contains("delete"));
        assert!(msg.contains("sys-1"));
        assert!(!err.is_remote());
    }

    #[test]
    fn test_store_errors_convert_to_remote() {
        let err: SessionError = StoreError::InvalidResponse("empty".to_string()).into();
        assert!(err.is_remote());
    }
}
