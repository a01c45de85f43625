//! Error types for codec operations.
//!
//! Every decode failure is a mismatch between the structure a codec expects and
//! the structure it found in the shared document. It is surfaced to the caller,
//! never replaced by a default value, because it means the document is
//! corrupted or participants disagree about the schema.

use thiserror::Error;

/// Structured error types for codec operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CodecError {
    /// A shared map has no entry under the expected key
    #[error("Decode mismatch: missing key '{key}'")]
    MissingKey { key: String },

    /// A shared array has no item at the expected index
    #[error("Decode mismatch: missing item at index {index}")]
    MissingItem { index: usize },

    /// A scalar of the wrong kind was found
    #[error("Decode mismatch: expected {expected} scalar, found {found}")]
    ScalarMismatch {
        expected: &'static str,
        found: String,
    },

    /// A slot holds different content than the codec expects
    #[error("Decode mismatch: expected {expected}, found {found}")]
    NodeMismatch { expected: String, found: String },

    /// An enum ordinal outside the codec's member table
    #[error("Decode mismatch: ordinal {ordinal} out of range for {codec} with {len} members")]
    OrdinalOutOfRange {
        codec: &'static str,
        ordinal: i64,
        len: usize,
    },

    /// A value that is not part of the codec's member table was encoded
    #[error("Value is not a listed member of {codec}")]
    UnlistedMember { codec: &'static str },
}

impl CodecError {
    /// Check if this error means the document does not match the codec
    pub fn is_decode_mismatch(&self) -> bool {
        !matches!(self, CodecError::UnlistedMember { .. })
    }

    /// Check if this error indicates a missing key or item
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            CodecError::MissingKey { .. } | CodecError::MissingItem { .. }
        )
    }

    /// Check if this error is related to scalar or node kinds
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            CodecError::ScalarMismatch { .. } | CodecError::NodeMismatch { .. }
        )
    }

    /// Get the key if this is a key-related error
    pub fn key(&self) -> Option<&str> {
        match self {
            CodecError::MissingKey { key } => Some(key),
            _ => None,
        }
    }
}

// Conversion from CodecError to the main Error type
impl From<CodecError> for crate::Error {
    fn from(err: CodecError) -> Self {
        crate::Error::Codec(err)
    }
}
