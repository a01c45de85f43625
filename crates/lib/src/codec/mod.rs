//! Bidirectional mappings between domain values and shared nodes.
//!
//! A [`Codec`] is a stateless description of how one value type is laid out in
//! the shared document. Codecs compose: a record codec delegates each field to
//! that field's codec, a list codec delegates each item to its item codec, and
//! only scalar and enum codecs touch leaf values.
//!
//! | Codec | Node | Layout |
//! |-------|------|--------|
//! | [`ScalarCodec`] | map | scalar under the reserved key `""` |
//! | [`EnumCodec`] | map | member ordinal under the reserved key `""` |
//! | `composite_codec!` | map | one child node per field |
//! | [`ListCodec`] | array | one child node per item |

use crate::{
    Result,
    shared::{NodeOf, Prelim, Scalar, Shared, SharedTxn, Slot},
};

mod errors;
pub use errors::CodecError;

mod scalar;
pub use scalar::{BOOL, FLOAT, INT, ScalarCodec, TEXT};

mod enumeration;
pub use enumeration::EnumCodec;

mod list;
pub use list::{ListCodec, ListEdits};

#[doc(hidden)]
pub mod composite;

/// A bidirectional mapping between values of `T` and shared nodes.
///
/// Codecs carry no value and no document state, so one instance can be shared
/// by any number of documents and stores.
pub trait Codec<T>: Send + Sync {
    /// Describes a brand-new node representing `value`.
    ///
    /// The prelim is allocated by the engine when it is inserted; no existing
    /// node is reused or touched.
    fn create_shared(&self, value: &T) -> Result<Prelim>;

    /// Mutates the existing node `shared` in place so that it represents `value`.
    ///
    /// Only the edits needed to reach `value` are applied, and `shared` itself
    /// is never replaced, so nodes keep their identity across updates.
    fn update_shared<X: SharedTxn>(
        &self,
        txn: &mut X,
        shared: &NodeOf<X>,
        value: &T,
    ) -> Result<()>;

    /// Reconstructs a value from the current contents of `shared`.
    ///
    /// Fails with a decode mismatch when the node does not have the structure
    /// this codec writes.
    fn decode_shared<X: SharedTxn>(&self, txn: &X, shared: &NodeOf<X>) -> Result<T>;
}

impl<T, C: Codec<T> + ?Sized> Codec<T> for &C {
    fn create_shared(&self, value: &T) -> Result<Prelim> {
        (**self).create_shared(value)
    }

    fn update_shared<X: SharedTxn>(
        &self,
        txn: &mut X,
        shared: &NodeOf<X>,
        value: &T,
    ) -> Result<()> {
        (**self).update_shared(txn, shared, value)
    }

    fn decode_shared<X: SharedTxn>(&self, txn: &X, shared: &NodeOf<X>) -> Result<T> {
        (**self).decode_shared(txn, shared)
    }
}

/// Returns the map handle of `shared`, or a decode mismatch for arrays.
pub fn expect_map<M, A>(shared: &Shared<M, A>) -> Result<&M> {
    shared.as_map().ok_or_else(|| {
        CodecError::NodeMismatch {
            expected: "map".to_string(),
            found: shared.kind().to_string(),
        }
        .into()
    })
}

/// Returns the array handle of `shared`, or a decode mismatch for maps.
pub fn expect_array<M, A>(shared: &Shared<M, A>) -> Result<&A> {
    shared.as_array().ok_or_else(|| {
        CodecError::NodeMismatch {
            expected: "array".to_string(),
            found: shared.kind().to_string(),
        }
        .into()
    })
}

/// Returns the node stored under `key` of `map`.
pub fn child_node<X: SharedTxn>(txn: &X, map: &X::Map, key: &str) -> Result<NodeOf<X>> {
    match txn.map_get(map, key) {
        Some(Slot::Node(node)) => Ok(node),
        Some(other) => Err(CodecError::NodeMismatch {
            expected: "node".to_string(),
            found: other.kind(),
        }
        .into()),
        None => Err(CodecError::MissingKey {
            key: key.to_string(),
        }
        .into()),
    }
}

/// Returns the scalar stored under `key` of `map`.
pub fn scalar_at<X: SharedTxn>(txn: &X, map: &X::Map, key: &str) -> Result<Scalar> {
    match txn.map_get(map, key) {
        Some(Slot::Scalar(scalar)) => Ok(scalar),
        Some(other) => Err(CodecError::NodeMismatch {
            expected: "scalar".to_string(),
            found: other.kind(),
        }
        .into()),
        None => Err(CodecError::MissingKey {
            key: key.to_string(),
        }
        .into()),
    }
}

/// Integral value of a scalar.
///
/// JavaScript peers write every number as a float, so integral floats are
/// accepted as well.
pub(crate) fn integral(scalar: &Scalar) -> Option<i64> {
    match scalar {
        Scalar::Int(value) => Some(*value),
        Scalar::Float(value)
            if value.fract() == 0.0 && *value >= i64::MIN as f64 && *value < i64::MAX as f64 =>
        {
            Some(*value as i64)
        }
        _ => None,
    }
}
