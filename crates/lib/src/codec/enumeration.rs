//! Codec for closed sets of values.

use std::fmt;

use super::{Codec, CodecError, expect_map, integral, scalar_at};
use crate::{
    Result,
    constants::VALUE_KEY,
    shared::{Content, NodeOf, Prelim, Scalar, SharedTxn, Slot},
};

/// Codec for a value drawn from a fixed, ordered member table.
///
/// A member is stored as its zero-based ordinal in the table, wrapped like a
/// scalar under the reserved key. Reordering the table therefore changes the
/// meaning of existing documents; new members must be appended.
pub struct EnumCodec<E: 'static> {
    name: &'static str,
    members: &'static [E],
}

impl<E: 'static> EnumCodec<E> {
    pub const fn new(name: &'static str, members: &'static [E]) -> Self {
        Self { name, members }
    }

    pub fn members(&self) -> &'static [E] {
        self.members
    }

    /// Ordinal of `value` in the member table.
    pub fn ordinal(&self, value: &E) -> Result<i64>
    where
        E: PartialEq,
    {
        self.members
            .iter()
            .position(|member| member == value)
            .map(|index| index as i64)
            .ok_or_else(|| CodecError::UnlistedMember { codec: self.name }.into())
    }

    /// Member stored at `ordinal`.
    pub fn member(&self, ordinal: i64) -> Result<&'static E> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| self.members.get(index))
            .ok_or_else(|| {
                CodecError::OrdinalOutOfRange {
                    codec: self.name,
                    ordinal,
                    len: self.members.len(),
                }
                .into()
            })
    }
}

impl<E: 'static> Clone for EnumCodec<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: 'static> Copy for EnumCodec<E> {}

impl<E: 'static> fmt::Debug for EnumCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumCodec")
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish()
    }
}

impl<E: 'static> Codec<E> for EnumCodec<E>
where
    E: PartialEq + Clone + Sync,
{
    fn create_shared(&self, value: &E) -> Result<Prelim> {
        let ordinal = self.ordinal(value)?;
        Ok(Prelim::map().with_entry(VALUE_KEY, Scalar::Int(ordinal)))
    }

    fn update_shared<X: SharedTxn>(
        &self,
        txn: &mut X,
        shared: &NodeOf<X>,
        value: &E,
    ) -> Result<()> {
        let map = expect_map(shared)?;
        let ordinal = self.ordinal(value)?;

        if let Some(Slot::Scalar(current)) = txn.map_get(map, VALUE_KEY)
            && integral(&current) == Some(ordinal)
        {
            return Ok(());
        }

        txn.map_set(map, VALUE_KEY, Content::Scalar(Scalar::Int(ordinal)))?;
        Ok(())
    }

    fn decode_shared<X: SharedTxn>(&self, txn: &X, shared: &NodeOf<X>) -> Result<E> {
        let map = expect_map(shared)?;
        let scalar = scalar_at(txn, map, VALUE_KEY)?;
        let ordinal = integral(&scalar).ok_or_else(|| CodecError::ScalarMismatch {
            expected: "int",
            found: scalar.kind().to_string(),
        })?;
        self.member(ordinal).cloned()
    }
}
