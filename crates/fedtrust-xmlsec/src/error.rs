//! Error types for criteria resolution and key handling.

/// Resolution errors.
///
/// "No match" is never an error: resolvers return an empty sequence instead.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Criteria are missing, malformed, or contradict each other.
    #[error("invalid criteria: {message}")]
    InvalidCriteria { message: String },

    /// The backing store could not be read.
    #[error("backing store unavailable: {message}")]
    Unavailable { message: String },
}

impl ResolverError {
    /// Invalid criteria with a message.
    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::InvalidCriteria {
            message: message.into(),
        }
    }

    /// Unavailable backing store with a message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether a caller may retry the same call later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Key material and signature errors.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// A KeyInfo child carried key material that could not be decoded.
    #[error("invalid key material in {element}: {reason}")]
    InvalidKeyMaterial { element: String, reason: String },

    /// The key or signature algorithm is not supported.
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Cryptographic validation failed.
    #[error("signature verification failed: {reason}")]
    SignatureInvalid { reason: String },

    /// The signed element could not be put into canonical form.
    #[error("canonicalization failed: {reason}")]
    Canonicalization { reason: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SecurityError {
    pub(crate) fn invalid_key(element: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidKeyMaterial {
            element: element.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn signature_invalid(reason: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            reason: reason.into(),
        }
    }
}

/// Result type for key and signature operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
