//! Error types for store operations.

use thiserror::Error;

use super::BoxError;

/// Structured error types for store operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The application's transformation returned an error
    ///
    /// The store's current value and its document are left unchanged.
    #[error("Transformation failed in store '{store}': {source}")]
    TransformationFailed { store: String, source: BoxError },

    /// The store's worker is no longer running
    #[error("Store '{store}' is closed")]
    Closed { store: String },

    /// The handler's listener is no longer running
    #[error("Handler listener has stopped")]
    HandlerClosed,

    /// Store configuration could not be parsed
    #[error("Invalid store configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl StoreError {
    /// Check if this error was raised by an application transformation
    pub fn is_transformation_failure(&self) -> bool {
        matches!(self, StoreError::TransformationFailed { .. })
    }

    /// Check if this error means the store or a handler has shut down
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            StoreError::Closed { .. } | StoreError::HandlerClosed
        )
    }

    /// Get the store id if this error is tied to a specific store
    pub fn store(&self) -> Option<&str> {
        match self {
            StoreError::TransformationFailed { store, .. } | StoreError::Closed { store } => {
                Some(store)
            }
            _ => None,
        }
    }
}

// Conversion from StoreError to the main Error type
impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
