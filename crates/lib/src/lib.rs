//!
//! Collab: typed codecs and a serialized update store over collaborative documents.
//! This library projects an application's immutable domain model onto a CRDT-backed
//! document tree and reconstructs it again, applying local changes as minimal edits.
//!
//! ## Core Concepts
//!
//! * **Shared documents (`shared::SharedDoc`)**: The capability surface an external CRDT engine
//!   provides: shared maps, shared arrays, transactions and a change-update feed.
//!     * **YrsDoc (`shared::YrsDoc`)**: Y-CRDT engine binding (requires the "y-crdt" feature).
//!     * **MemoryDoc (`shared::MemoryDoc`)**: A non-replicating in-memory tree with an operation log.
//! * **Codecs (`codec::Codec`)**: Stateless bidirectional mappings between a domain value and a
//!   shared node. Scalars, enums, records (`composite_codec!`) and lists compose recursively.
//! * **Stores (`store::Store`)**: Own the current value of one document and apply queued
//!   `Update`s one at a time, reconciling the document after each one.
//! * **Handlers (`store::Handler`)**: Turn asynchronous input events into queued updates.

pub mod codec;
pub mod constants;
pub mod shared;
pub mod store;

pub use codec::{Codec, CodecError};
pub use shared::{DocUpdate, EngineError, Origin, SharedDoc};
pub use store::{Store, StoreConfig, StoreError, Update};

/// Y-CRDT types re-exported for convenience when the "y-crdt" feature is enabled.
///
/// This module re-exports the `yrs` crate so that client code
/// doesn't need to add `yrs` as a separate dependency when using `YrsDoc`.
#[cfg(feature = "y-crdt")]
pub mod y_crdt {
    pub use yrs::*;
}

/// Result type used throughout the Collab library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Collab library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A shared node does not have the structure a codec expects
    #[error(transparent)]
    Codec(codec::CodecError),

    /// The shared-document engine failed to read, mutate or merge
    #[error(transparent)]
    Engine(shared::EngineError),

    /// Structured store errors from the store module
    #[error(transparent)]
    Store(store::StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Codec(_) => "codec",
            Error::Engine(_) => "shared",
            Error::Store(_) => "store",
        }
    }

    /// Check if this error means the document does not match the codec.
    ///
    /// This indicates document corruption or a codec version mismatch between
    /// participants.
    pub fn is_decode_mismatch(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_decode_mismatch(),
            _ => false,
        }
    }

    /// Check if this error was raised by the shared-document engine.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Error::Engine(_))
    }

    /// Check if this error is an application transformation that failed.
    pub fn is_transformation_failure(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_transformation_failure(),
            _ => false,
        }
    }

    /// Check if this error means the store or handler is no longer running.
    pub fn is_closed(&self) -> bool {
        match self {
            Error::Store(store_err) => store_err.is_closed(),
            _ => false,
        }
    }

    /// Check if this error indicates a requested key or index was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Codec(codec_err) => codec_err.is_missing(),
            Error::Engine(engine_err) => engine_err.is_not_found(),
            _ => false,
        }
    }
}
