use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Login failure. Unknown email and wrong password share this variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Any structural, signature or temporal token failure.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Wrong token type: expected {expected} token")]
    WrongTokenType { expected: &'static str },

    /// Store, hashing or signing infrastructure failure
    #[error("Upstream failure: {message}")]
    Upstream { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn wrong_token_type(expected: &'static str) -> Self {
        Self::WrongTokenType { expected }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error is caused by infrastructure rather than the caller
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Configuration { .. })
    }
}
