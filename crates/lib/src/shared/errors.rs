//! Error types for shared-document engine operations.
//!
//! Engine failures are never recovered by this library: once an engine
//! reports one, the document may be left partially mutated, so the error is
//! handed back to whoever started the operation.

use thiserror::Error;

use super::NodeKind;

/// Structured error types for shared-document engines.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine's internal lock was poisoned by a panicking writer
    #[error("Shared document lock poisoned")]
    LockPoisoned,

    /// A node handle does not belong to this document
    #[error("Unknown {kind} node: {node}")]
    UnknownNode { kind: NodeKind, node: usize },

    /// An array index past the end of the array
    #[error("Index {index} out of bounds for shared array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A remote update could not be decoded or merged
    #[error("Invalid document update: {reason}")]
    InvalidUpdate { reason: String },

    /// A top-level container already exists with the other kind
    #[error("Root '{name}' is a {actual}, expected a {expected}")]
    RootKindMismatch {
        name: String,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// The engine does not support the requested operation
    #[error("Operation '{operation}' is not supported by the {engine} engine")]
    Unsupported {
        engine: &'static str,
        operation: &'static str,
    },
}

impl EngineError {
    /// Check if this error indicates a node or index was not found
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownNode { .. } | EngineError::IndexOutOfBounds { .. }
        )
    }

    /// Check if this error was caused by a malformed remote update
    pub fn is_invalid_update(&self) -> bool {
        matches!(self, EngineError::InvalidUpdate { .. })
    }

    /// Check if this error means the engine cannot perform the operation at all
    pub fn is_unsupported(&self) -> bool {
        matches!(self, EngineError::Unsupported { .. })
    }
}

// Conversion from EngineError to the main Error type
impl From<EngineError> for crate::Error {
    fn from(err: EngineError) -> Self {
        crate::Error::Engine(err)
    }
}
