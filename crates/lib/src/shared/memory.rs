//! In-memory shared-document engine.
//!
//! `MemoryDoc` keeps the document tree in plain arenas behind a mutex. It does
//! not replicate or merge anything, but it gives every node a stable identity.
//! A document created with [`MemoryDoc::with_op_log`] also records each
//! structural operation, which is how tests check exactly which edits a codec
//! emitted.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

use super::{
    Content, DocUpdate, EngineError, NodeKind, Origin, Prelim, Scalar, Shared, SharedDoc,
    SharedTxn, Slot, UpdateFeed,
};
use crate::Result;

/// Identity of a shared map inside a [`MemoryDoc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MapId(usize);

/// Identity of a shared array inside a [`MemoryDoc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArrayId(usize);

/// A structural operation recorded by a [`MemoryDoc`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MemoryOp {
    /// A value was written under `key`
    MapSet { map: MapId, key: String },
    /// `count` items were appended in one batch
    ArrayPush { array: ArrayId, count: usize },
    /// The item at `index` was removed
    ArrayDelete { array: ArrayId, index: usize },
}

#[derive(Debug, Clone)]
enum Entry {
    Scalar(Scalar),
    Map(MapId),
    Array(ArrayId),
}

impl Entry {
    fn slot(&self) -> Slot<MapId, ArrayId> {
        match self {
            Entry::Scalar(scalar) => Slot::Scalar(scalar.clone()),
            Entry::Map(id) => Slot::Node(Shared::Map(*id)),
            Entry::Array(id) => Slot::Node(Shared::Array(*id)),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    maps: Vec<BTreeMap<String, Entry>>,
    arrays: Vec<Vec<Entry>>,
    roots: HashMap<String, Shared<MapId, ArrayId>>,
    /// Present only when operation logging is enabled
    log: Option<Vec<MemoryOp>>,
}

impl MemoryState {
    fn alloc_map(&mut self) -> MapId {
        self.maps.push(BTreeMap::new());
        MapId(self.maps.len() - 1)
    }

    fn alloc_array(&mut self) -> ArrayId {
        self.arrays.push(Vec::new());
        ArrayId(self.arrays.len() - 1)
    }

    /// Allocates fresh nodes for every prelim inside `content`.
    fn integrate(&mut self, content: Content) -> Entry {
        match content {
            Content::Scalar(scalar) => Entry::Scalar(scalar),
            Content::Node(Prelim::Map(entries)) => {
                let id = self.alloc_map();
                for (key, child) in entries {
                    let child = self.integrate(child);
                    self.maps[id.0].insert(key, child);
                }
                Entry::Map(id)
            }
            Content::Node(Prelim::Array(items)) => {
                let id = self.alloc_array();
                for item in items {
                    let item = self.integrate(item);
                    self.arrays[id.0].push(item);
                }
                Entry::Array(id)
            }
        }
    }

    fn map_mut(&mut self, map: MapId) -> Result<&mut BTreeMap<String, Entry>> {
        self.maps.get_mut(map.0).ok_or_else(|| {
            EngineError::UnknownNode {
                kind: NodeKind::Map,
                node: map.0,
            }
            .into()
        })
    }

    fn array_mut(&mut self, array: ArrayId) -> Result<&mut Vec<Entry>> {
        self.arrays.get_mut(array.0).ok_or_else(|| {
            EngineError::UnknownNode {
                kind: NodeKind::Array,
                node: array.0,
            }
            .into()
        })
    }

    fn snapshot(&self, entry: &Entry) -> serde_json::Value {
        match entry {
            Entry::Scalar(Scalar::Int(value)) => serde_json::Value::from(*value),
            Entry::Scalar(Scalar::Float(value)) => serde_json::Value::from(*value),
            Entry::Scalar(Scalar::Bool(value)) => serde_json::Value::from(*value),
            Entry::Scalar(Scalar::Text(value)) => serde_json::Value::from(value.as_str()),
            Entry::Map(id) => serde_json::Value::Object(
                self.maps[id.0]
                    .iter()
                    .map(|(key, child)| (key.clone(), self.snapshot(child)))
                    .collect(),
            ),
            Entry::Array(id) => serde_json::Value::Array(
                self.arrays[id.0]
                    .iter()
                    .map(|item| self.snapshot(item))
                    .collect(),
            ),
        }
    }
}

/// Transaction over a [`MemoryDoc`].
///
/// Holds the document lock for its whole lifetime.
pub struct MemoryTxn<'doc> {
    state: MutexGuard<'doc, MemoryState>,
    ops: Vec<MemoryOp>,
}

impl SharedTxn for MemoryTxn<'_> {
    type Map = MapId;
    type Array = ArrayId;

    fn map_get(&self, map: &MapId, key: &str) -> Option<Slot<MapId, ArrayId>> {
        self.state.maps.get(map.0)?.get(key).map(Entry::slot)
    }

    fn map_set(
        &mut self,
        map: &MapId,
        key: &str,
        content: Content,
    ) -> Result<Slot<MapId, ArrayId>> {
        self.state.map_mut(*map)?;
        let entry = self.state.integrate(content);
        let slot = entry.slot();
        self.state.map_mut(*map)?.insert(key.to_string(), entry);
        self.ops.push(MemoryOp::MapSet {
            map: *map,
            key: key.to_string(),
        });
        Ok(slot)
    }

    fn map_len(&self, map: &MapId) -> usize {
        self.state.maps.get(map.0).map_or(0, BTreeMap::len)
    }

    fn array_get(&self, array: &ArrayId, index: usize) -> Option<Slot<MapId, ArrayId>> {
        self.state.arrays.get(array.0)?.get(index).map(Entry::slot)
    }

    fn array_push(&mut self, array: &ArrayId, items: Vec<Content>) -> Result<()> {
        self.state.array_mut(*array)?;
        if items.is_empty() {
            return Ok(());
        }
        let count = items.len();
        let entries: Vec<Entry> = items
            .into_iter()
            .map(|item| self.state.integrate(item))
            .collect();
        self.state.array_mut(*array)?.extend(entries);
        self.ops.push(MemoryOp::ArrayPush {
            array: *array,
            count,
        });
        Ok(())
    }

    fn array_delete(&mut self, array: &ArrayId, index: usize) -> Result<()> {
        let items = self.state.array_mut(*array)?;
        if index >= items.len() {
            return Err(EngineError::IndexOutOfBounds {
                index,
                len: items.len(),
            }
            .into());
        }
        items.remove(index);
        self.ops.push(MemoryOp::ArrayDelete {
            array: *array,
            index,
        });
        Ok(())
    }

    fn array_len(&self, array: &ArrayId) -> usize {
        self.state.arrays.get(array.0).map_or(0, Vec::len)
    }
}

/// A non-replicating shared document kept in memory.
///
/// Update payloads published on the feed are the JSON encoding of the
/// operations performed by each transaction.
#[derive(Debug, Default)]
pub struct MemoryDoc {
    state: Mutex<MemoryState>,
    feed: UpdateFeed,
}

impl MemoryDoc {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty document that records every operation until it is
    /// drained with [`take_ops`](Self::take_ops).
    pub fn with_op_log() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                log: Some(Vec::new()),
                ..MemoryState::default()
            }),
            feed: UpdateFeed::default(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| EngineError::LockPoisoned.into())
    }

    /// Operations recorded since the log was last drained, oldest first.
    ///
    /// Always empty unless the document was created with
    /// [`with_op_log`](Self::with_op_log).
    pub fn ops(&self) -> Result<Vec<MemoryOp>> {
        Ok(self.lock()?.log.clone().unwrap_or_default())
    }

    /// Returns the recorded operations and clears the log.
    pub fn take_ops(&self) -> Result<Vec<MemoryOp>> {
        Ok(self.lock()?.log.as_mut().map(std::mem::take).unwrap_or_default())
    }

    pub fn is_logging_ops(&self) -> Result<bool> {
        Ok(self.lock()?.log.is_some())
    }

    fn root(&self, name: &str, kind: NodeKind) -> Result<Shared<MapId, ArrayId>> {
        let mut state = self.lock()?;
        if let Some(root) = state.roots.get(name) {
            if root.kind() != kind {
                return Err(EngineError::RootKindMismatch {
                    name: name.to_string(),
                    expected: kind,
                    actual: root.kind(),
                }
                .into());
            }
            return Ok(root.clone());
        }
        let root = match kind {
            NodeKind::Map => Shared::Map(state.alloc_map()),
            NodeKind::Array => Shared::Array(state.alloc_array()),
        };
        state.roots.insert(name.to_string(), root.clone());
        Ok(root)
    }
}

impl SharedDoc for MemoryDoc {
    type Map = MapId;
    type Array = ArrayId;
    type Txn<'doc> = MemoryTxn<'doc>;

    fn get_map(&self, name: &str) -> Result<MapId> {
        match self.root(name, NodeKind::Map)? {
            Shared::Map(id) => Ok(id),
            Shared::Array(id) => Err(EngineError::UnknownNode {
                kind: NodeKind::Map,
                node: id.0,
            }
            .into()),
        }
    }

    fn get_array(&self, name: &str) -> Result<ArrayId> {
        match self.root(name, NodeKind::Array)? {
            Shared::Array(id) => Ok(id),
            Shared::Map(id) => Err(EngineError::UnknownNode {
                kind: NodeKind::Array,
                node: id.0,
            }
            .into()),
        }
    }

    fn transact<R, F>(&self, origin: &Origin, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<R>,
    {
        let mut txn = MemoryTxn {
            state: self.lock()?,
            ops: Vec::new(),
        };
        let result = f(&mut txn);

        let MemoryTxn { mut state, ops } = txn;
        if !ops.is_empty() {
            if let Some(log) = state.log.as_mut() {
                log.extend(ops.iter().cloned());
            }
            drop(state);
            let update =
                serde_json::to_vec(&ops).map_err(|e| EngineError::InvalidUpdate {
                    reason: e.to_string(),
                })?;
            tracing::trace!(origin = %origin, ops = ops.len(), "Memory transaction committed");
            self.feed.publish(DocUpdate {
                update,
                origin: origin.clone(),
            });
        }
        result
    }

    fn apply_update(&self, _origin: &Origin, _update: &[u8]) -> Result<()> {
        Err(EngineError::Unsupported {
            engine: "memory",
            operation: "apply_update",
        }
        .into())
    }

    /// Encodes the document as a JSON object keyed by root name.
    fn encode_state(&self) -> Result<Vec<u8>> {
        let state = self.lock()?;
        let snapshot: serde_json::Map<String, serde_json::Value> = state
            .roots
            .iter()
            .map(|(name, root)| {
                let entry = match root {
                    Shared::Map(id) => Entry::Map(*id),
                    Shared::Array(id) => Entry::Array(*id),
                };
                (name.clone(), state.snapshot(&entry))
            })
            .collect();
        serde_json::to_vec(&snapshot).map_err(|e| {
            EngineError::InvalidUpdate {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn updates(&self) -> &UpdateFeed {
        &self.feed
    }
}
