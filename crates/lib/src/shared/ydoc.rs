//! Y-CRDT shared-document engine.
//!
//! `YrsDoc` binds the capability surface to a [`yrs::Doc`]. Shared maps and
//! shared arrays are `MapRef`/`ArrayRef` handles, scalars are stored as
//! `Any` values, and prelims are integrated by inserting empty `MapPrelim` /
//! `ArrayPrelim` placeholders and populating the resulting live node within the
//! same transaction. Merge semantics are entirely yrs'.

use std::fmt;

use yrs::{
    Any, Array as _, ArrayPrelim, ArrayRef, Doc, Map as _, MapPrelim, MapRef, Out, ReadTxn,
    StateVector, Transact, TransactionMut, Update, updates::decoder::Decode,
};

use super::{
    Content, DocUpdate, EngineError, Origin, Prelim, Scalar, Shared, SharedDoc, SharedTxn, Slot,
    UpdateFeed,
};
use crate::Result;

type YrsSlot = Slot<MapRef, ArrayRef>;

fn scalar_to_any(scalar: Scalar) -> Any {
    match scalar {
        Scalar::Int(value) => Any::BigInt(value),
        Scalar::Float(value) => Any::Number(value),
        Scalar::Bool(value) => Any::Bool(value),
        Scalar::Text(value) => Any::from(value),
    }
}

fn any_to_slot(any: Any) -> YrsSlot {
    match any {
        Any::BigInt(value) => Slot::Scalar(Scalar::Int(value)),
        Any::Number(value) => Slot::Scalar(Scalar::Float(value)),
        Any::Bool(value) => Slot::Scalar(Scalar::Bool(value)),
        Any::String(value) => Slot::Scalar(Scalar::Text(value.to_string())),
        Any::Null => Slot::Other("null"),
        Any::Undefined => Slot::Other("undefined"),
        _ => Slot::Other("json"),
    }
}

fn out_to_slot(out: Out) -> YrsSlot {
    match out {
        Out::Any(any) => any_to_slot(any),
        Out::YMap(map) => Slot::Node(Shared::Map(map)),
        Out::YArray(array) => Slot::Node(Shared::Array(array)),
        Out::YText(_) => Slot::Other("text"),
        _ => Slot::Other("shared type"),
    }
}

fn insert_into_map(
    txn: &mut TransactionMut<'_>,
    map: &MapRef,
    key: &str,
    content: Content,
) -> YrsSlot {
    match content {
        Content::Scalar(scalar) => {
            map.insert(txn, key, scalar_to_any(scalar.clone()));
            Slot::Scalar(scalar)
        }
        Content::Node(Prelim::Map(entries)) => {
            let child = map.insert(txn, key, MapPrelim::default());
            for (child_key, child_content) in entries {
                insert_into_map(txn, &child, &child_key, child_content);
            }
            Slot::Node(Shared::Map(child))
        }
        Content::Node(Prelim::Array(items)) => {
            let child = map.insert(txn, key, ArrayPrelim::default());
            for item in items {
                push_into_array(txn, &child, item);
            }
            Slot::Node(Shared::Array(child))
        }
    }
}

fn push_into_array(txn: &mut TransactionMut<'_>, array: &ArrayRef, content: Content) {
    match content {
        Content::Scalar(scalar) => {
            array.push_back(txn, scalar_to_any(scalar));
        }
        Content::Node(Prelim::Map(entries)) => {
            let child = array.push_back(txn, MapPrelim::default());
            for (child_key, child_content) in entries {
                insert_into_map(txn, &child, &child_key, child_content);
            }
        }
        Content::Node(Prelim::Array(items)) => {
            let child = array.push_back(txn, ArrayPrelim::default());
            for item in items {
                push_into_array(txn, &child, item);
            }
        }
    }
}

/// Transaction over a [`YrsDoc`].
///
/// Commits when dropped; yrs cannot roll back, so edits applied before an
/// error are kept.
pub struct YrsTxn<'doc> {
    txn: TransactionMut<'doc>,
    dirty: bool,
}

impl SharedTxn for YrsTxn<'_> {
    type Map = MapRef;
    type Array = ArrayRef;

    fn map_get(&self, map: &MapRef, key: &str) -> Option<YrsSlot> {
        map.get(&self.txn, key).map(out_to_slot)
    }

    fn map_set(&mut self, map: &MapRef, key: &str, content: Content) -> Result<YrsSlot> {
        self.dirty = true;
        Ok(insert_into_map(&mut self.txn, map, key, content))
    }

    fn map_len(&self, map: &MapRef) -> usize {
        map.len(&self.txn) as usize
    }

    fn array_get(&self, array: &ArrayRef, index: usize) -> Option<YrsSlot> {
        let index = u32::try_from(index).ok()?;
        array.get(&self.txn, index).map(out_to_slot)
    }

    fn array_push(&mut self, array: &ArrayRef, items: Vec<Content>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.dirty = true;
        for item in items {
            push_into_array(&mut self.txn, array, item);
        }
        Ok(())
    }

    fn array_delete(&mut self, array: &ArrayRef, index: usize) -> Result<()> {
        let len = self.array_len(array);
        if index >= len {
            return Err(EngineError::IndexOutOfBounds { index, len }.into());
        }
        self.dirty = true;
        // In bounds, so the index fits the u32 length
        array.remove(&mut self.txn, index as u32);
        Ok(())
    }

    fn array_len(&self, array: &ArrayRef) -> usize {
        array.len(&self.txn) as usize
    }
}

/// A shared document backed by a [`yrs::Doc`].
pub struct YrsDoc {
    doc: Doc,
    feed: UpdateFeed,
}

impl Default for YrsDoc {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for YrsDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YrsDoc")
            .field("client_id", &self.doc.client_id())
            .field("subscribers", &self.feed.receiver_count())
            .finish()
    }
}

impl YrsDoc {
    /// Creates a document around a fresh `yrs::Doc`.
    pub fn new() -> Self {
        Self::from_doc(Doc::new())
    }

    /// Wraps an existing `yrs::Doc`.
    pub fn from_doc(doc: Doc) -> Self {
        Self {
            doc,
            feed: UpdateFeed::default(),
        }
    }

    /// The underlying yrs document.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }
}

impl SharedDoc for YrsDoc {
    type Map = MapRef;
    type Array = ArrayRef;
    type Txn<'doc> = YrsTxn<'doc>;

    fn get_map(&self, name: &str) -> Result<MapRef> {
        Ok(self.doc.get_or_insert_map(name))
    }

    fn get_array(&self, name: &str) -> Result<ArrayRef> {
        Ok(self.doc.get_or_insert_array(name))
    }

    fn transact<R, F>(&self, origin: &Origin, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<R>,
    {
        let mut txn = YrsTxn {
            txn: self.doc.transact_mut_with(origin.as_str()),
            dirty: false,
        };
        let result = f(&mut txn);

        let update = txn.dirty.then(|| txn.txn.encode_update_v1());
        drop(txn);
        if let Some(update) = update {
            tracing::trace!(origin = %origin, size = update.len(), "Yrs transaction committed");
            self.feed.publish(DocUpdate {
                update,
                origin: origin.clone(),
            });
        }
        result
    }

    fn apply_update(&self, origin: &Origin, update: &[u8]) -> Result<()> {
        let decoded = Update::decode_v1(update).map_err(|e| EngineError::InvalidUpdate {
            reason: e.to_string(),
        })?;
        {
            let mut txn = self.doc.transact_mut_with(origin.as_str());
            txn.apply_update(decoded)
                .map_err(|e| EngineError::InvalidUpdate {
                    reason: e.to_string(),
                })?;
        }
        self.feed.publish(DocUpdate {
            update: update.to_vec(),
            origin: origin.clone(),
        });
        Ok(())
    }

    fn encode_state(&self) -> Result<Vec<u8>> {
        let txn = self.doc.transact();
        Ok(txn.encode_state_as_update_v1(&StateVector::default()))
    }

    fn updates(&self) -> &UpdateFeed {
        &self.feed
    }
}
