//! Codecs for single leaf values.
//!
//! A scalar is wrapped in its own shared map and stored under the reserved key
//! [`VALUE_KEY`], so that every codec, leaves included, maps to a shared node
//! that can be updated in place.

use std::fmt;

use tracing::trace;

use super::{Codec, CodecError, expect_map, integral, scalar_at};
use crate::{
    Result,
    constants::VALUE_KEY,
    shared::{Content, NodeOf, Prelim, Scalar, SharedTxn, Slot},
};

/// Codec for values stored as one [`Scalar`].
///
/// The encode and decode functions describe how `T` is represented as a
/// scalar. The provided constants cover the common kinds; others can be
/// declared the same way:
///
/// ```
/// use collab::{codec::ScalarCodec, shared::Scalar};
///
/// fn encode(value: &u8) -> Scalar {
///     Scalar::Int(i64::from(*value))
/// }
///
/// fn decode(scalar: &Scalar) -> Option<u8> {
///     scalar.as_int().and_then(|value| u8::try_from(value).ok())
/// }
///
/// const BYTE: ScalarCodec<u8> = ScalarCodec::new("byte", encode, decode);
/// ```
pub struct ScalarCodec<T> {
    kind: &'static str,
    encode: fn(&T) -> Scalar,
    decode: fn(&Scalar) -> Option<T>,
}

impl<T> ScalarCodec<T> {
    pub const fn new(
        kind: &'static str,
        encode: fn(&T) -> Scalar,
        decode: fn(&Scalar) -> Option<T>,
    ) -> Self {
        Self {
            kind,
            encode,
            decode,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl<T> Clone for ScalarCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScalarCodec<T> {}

impl<T> fmt::Debug for ScalarCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec")
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T> Codec<T> for ScalarCodec<T> {
    fn create_shared(&self, value: &T) -> Result<Prelim> {
        Ok(Prelim::map().with_entry(VALUE_KEY, (self.encode)(value)))
    }

    fn update_shared<X: SharedTxn>(
        &self,
        txn: &mut X,
        shared: &NodeOf<X>,
        value: &T,
    ) -> Result<()> {
        let map = expect_map(shared)?;
        let target = (self.encode)(value);

        if let Some(Slot::Scalar(current)) = txn.map_get(map, VALUE_KEY)
            && unchanged(&current, &target)
        {
            trace!(kind = self.kind, "Scalar unchanged, skipping write");
            return Ok(());
        }

        txn.map_set(map, VALUE_KEY, Content::Scalar(target))?;
        Ok(())
    }

    fn decode_shared<X: SharedTxn>(&self, txn: &X, shared: &NodeOf<X>) -> Result<T> {
        let map = expect_map(shared)?;
        let scalar = scalar_at(txn, map, VALUE_KEY)?;
        (self.decode)(&scalar).ok_or_else(|| {
            CodecError::ScalarMismatch {
                expected: self.kind,
                found: scalar.kind().to_string(),
            }
            .into()
        })
    }
}

/// Floats are compared bitwise so that `-0.0` still replaces `0.0`.
fn unchanged(current: &Scalar, target: &Scalar) -> bool {
    match (current, target) {
        (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
        _ => current == target,
    }
}

/// 64-bit integers.
pub const INT: ScalarCodec<i64> = ScalarCodec::new("int", encode_int, integral);

/// 64-bit floats.
pub const FLOAT: ScalarCodec<f64> = ScalarCodec::new("float", encode_float, decode_float);

/// Booleans.
pub const BOOL: ScalarCodec<bool> = ScalarCodec::new("bool", encode_bool, decode_bool);

/// UTF-8 strings.
pub const TEXT: ScalarCodec<String> = ScalarCodec::new("text", encode_text, decode_text);

fn encode_int(value: &i64) -> Scalar {
    Scalar::Int(*value)
}

fn encode_float(value: &f64) -> Scalar {
    Scalar::Float(*value)
}

fn decode_float(scalar: &Scalar) -> Option<f64> {
    scalar.as_float()
}

fn encode_bool(value: &bool) -> Scalar {
    Scalar::Bool(*value)
}

fn decode_bool(scalar: &Scalar) -> Option<bool> {
    scalar.as_bool()
}

fn encode_text(value: &String) -> Scalar {
    Scalar::Text(value.clone())
}

fn decode_text(scalar: &Scalar) -> Option<String> {
    scalar.as_text().map(str::to_string)
}
