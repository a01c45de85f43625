//! Codec for ordered sequences.
//!
//! Lists are reconciled positionally: the item at index `i` of the new value
//! updates the live node at index `i` in place. Nothing is matched by identity
//! or content, so an insertion near the front of a list rewrites every later
//! item rather than inserting one node.

use tracing::trace;

use super::{Codec, CodecError, expect_array};
use crate::{
    Result,
    shared::{Content, NodeOf, Prelim, SharedTxn, Slot},
};

/// Edits performed while reconciling a shared array with a new list value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListEdits {
    /// Existing items handed to the item codec for an in-place update.
    ///
    /// The item codec writes only what differs, so an unchanged item is
    /// counted here without producing any document edit.
    pub reconciled: usize,
    /// Trailing items removed
    pub deleted: usize,
    /// New items appended in one batch
    pub appended: usize,
}

/// Codec for `Vec<T>`, delegating each item to an item codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListCodec<C> {
    item: C,
}

impl<C> ListCodec<C> {
    pub const fn new(item: C) -> Self {
        Self { item }
    }

    pub fn item(&self) -> &C {
        &self.item
    }

    /// Brings the array `shared` in line with `value` and reports what changed.
    ///
    /// Items present on both sides are updated in place. Items only present in
    /// `value` are appended with one batched push, and items only present in the
    /// array are deleted from the highest index down so that earlier deletions
    /// never shift the indices of later ones.
    pub fn reconcile<T, X>(&self, txn: &mut X, shared: &NodeOf<X>, value: &[T]) -> Result<ListEdits>
    where
        C: Codec<T>,
        X: SharedTxn,
    {
        let array = expect_array(shared)?;
        let existing = txn.array_len(array);
        let mut edits = ListEdits::default();

        for (index, item) in value.iter().enumerate().take(existing) {
            let node = item_node(txn, array, index)?;
            self.item.update_shared(txn, &node, item)?;
            edits.reconciled += 1;
        }

        for index in (value.len()..existing).rev() {
            txn.array_delete(array, index)?;
            edits.deleted += 1;
        }

        if value.len() > existing {
            let staged = value[existing..]
                .iter()
                .map(|item| self.item.create_shared(item).map(Content::Node))
                .collect::<Result<Vec<_>>>()?;
            edits.appended = staged.len();
            txn.array_push(array, staged)?;
        }

        trace!(
            reconciled = edits.reconciled,
            deleted = edits.deleted,
            appended = edits.appended,
            "Reconciled shared array"
        );
        Ok(edits)
    }
}

impl<T, C: Codec<T>> Codec<Vec<T>> for ListCodec<C> {
    fn create_shared(&self, value: &Vec<T>) -> Result<Prelim> {
        let items = value
            .iter()
            .map(|item| self.item.create_shared(item).map(Content::Node))
            .collect::<Result<Vec<_>>>()?;
        Ok(Prelim::Array(items))
    }

    fn update_shared<X: SharedTxn>(
        &self,
        txn: &mut X,
        shared: &NodeOf<X>,
        value: &Vec<T>,
    ) -> Result<()> {
        self.reconcile(txn, shared, value).map(|_| ())
    }

    fn decode_shared<X: SharedTxn>(&self, txn: &X, shared: &NodeOf<X>) -> Result<Vec<T>> {
        let array = expect_array(shared)?;
        (0..txn.array_len(array))
            .map(|index| {
                let node = item_node(txn, array, index)?;
                self.item.decode_shared(txn, &node)
            })
            .collect()
    }
}

fn item_node<X: SharedTxn>(txn: &X, array: &X::Array, index: usize) -> Result<NodeOf<X>> {
    match txn.array_get(array, index) {
        Some(Slot::Node(node)) => Ok(node),
        Some(other) => Err(CodecError::NodeMismatch {
            expected: "node".to_string(),
            found: other.kind(),
        }
        .into()),
        None => Err(CodecError::MissingItem { index }.into()),
    }
}
