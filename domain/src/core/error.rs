//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// Check if this error was raised for an unknown export format
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, DomainError::UnsupportedFormat(_))
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_display() {
        let error = DomainError::UnsupportedFormat("xml".to_string());
        assert_eq!(error.to_string(), "Unsupported format: xml");
    }

    #[test]
    fn test_is_unsupported_format_check() {
        assert!(DomainError::UnsupportedFormat("xml".to_string()).is_unsupported_format());
        assert!(!DomainError::InvalidPayload("null".to_string()).is_unsupported_format());
        assert!(!DomainError::Serialization("eof".to_string()).is_unsupported_format());
    }
}
