//! Error types for metadata resolution and filtering.

use fedtrust_xmlsec::{ResolverError, SecurityError};

/// Metadata errors.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Backing store or criteria failure.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Key material or signature failure.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// A filter rejected a metadata element.
    #[error("rejected by {filter}: {reason}")]
    Filtered { filter: String, reason: String },

    /// A trusted-names policy script failed to compile or evaluate.
    #[error("policy evaluation failed ({engine}): {message}")]
    PolicyEvaluation { engine: String, message: String },

    /// A metadata document violates a structural invariant.
    #[error("invalid metadata for {entity_id}: {reason}")]
    InvalidMetadata { entity_id: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl MetadataError {
    pub(crate) fn filtered(filter: &str, reason: impl Into<String>) -> Self {
        Self::Filtered {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn policy(engine: &str, message: impl ToString) -> Self {
        Self::PolicyEvaluation {
            engine: engine.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
