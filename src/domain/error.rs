use thiserror::Error;

/// Core domain errors
///
/// `Clone` so a single origin failure can be handed to every caller waiting
/// on a coalesced fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A compensating write failed, so cache and origin may disagree.
    #[error("Inconsistency: {message} (after: {cause})")]
    Inconsistency { message: String, cause: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn inconsistency(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Inconsistency {
            message: message.into(),
            cause: cause.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when cache and origin may have diverged and someone should look.
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, Self::Inconsistency { .. })
    }
}
