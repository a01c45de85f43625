//! Capability surface of the shared-document engine.
//!
//! Codecs never talk to a concrete CRDT library. They are written against the
//! two traits defined here:
//!
//! * [`SharedTxn`]: reads and mutations of shared maps and shared arrays inside
//!   one open transaction.
//! * [`SharedDoc`]: the document root, which hands out named top-level
//!   containers, batches mutations into transactions, merges remote updates and
//!   publishes a [`DocUpdate`] for every change.
//!
//! A node of the shared tree is the tagged union [`Shared`] with exactly two
//! variants, map-like and array-like. New nodes are described as a detached
//! [`Prelim`] and allocated by the engine when the prelim is inserted into an
//! existing map or array.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Result, constants::UPDATE_FEED_CAPACITY};

mod errors;
pub use errors::EngineError;

mod memory;
pub use memory::{ArrayId, MapId, MemoryDoc, MemoryOp, MemoryTxn};

#[cfg(feature = "y-crdt")]
mod ydoc;
#[cfg(feature = "y-crdt")]
pub use ydoc::{YrsDoc, YrsTxn};

/// Leaf values stored inside shared containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating-point number
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// UTF-8 text
    Text(String),
}

impl Scalar {
    /// Human readable name of the scalar kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Text(_) => "text",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Scalar::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// The two kinds of shared container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Map,
    Array,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Map => f.write_str("map"),
            NodeKind::Array => f.write_str("array"),
        }
    }
}

/// A live node of the shared document tree.
///
/// `M` and `A` are the engine's handle types for shared maps and shared
/// arrays. Handles address the node itself, so a handle obtained once keeps
/// pointing at the same structural position across later transactions.
#[derive(Debug, Clone, PartialEq)]
pub enum Shared<M, A> {
    Map(M),
    Array(A),
}

impl<M, A> Shared<M, A> {
    pub fn kind(&self) -> NodeKind {
        match self {
            Shared::Map(_) => NodeKind::Map,
            Shared::Array(_) => NodeKind::Array,
        }
    }

    pub fn as_map(&self) -> Option<&M> {
        match self {
            Shared::Map(map) => Some(map),
            Shared::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&A> {
        match self {
            Shared::Array(array) => Some(array),
            Shared::Map(_) => None,
        }
    }
}

/// The content found at a key of a shared map or an index of a shared array.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<M, A> {
    /// A leaf value
    Scalar(Scalar),
    /// A nested shared container
    Node(Shared<M, A>),
    /// Engine content this library does not model (null, rich text, XML, ...)
    Other(&'static str),
}

impl<M, A> Slot<M, A> {
    /// Human readable name of the content kind, used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Slot::Scalar(scalar) => scalar.kind().to_string(),
            Slot::Node(node) => node.kind().to_string(),
            Slot::Other(kind) => (*kind).to_string(),
        }
    }

    pub fn into_node(self) -> Option<Shared<M, A>> {
        match self {
            Slot::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// A brand-new node that has not been integrated into a document yet.
///
/// Inserting a prelim into a shared map or array allocates one fresh live node
/// for the prelim itself and for every prelim nested inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum Prelim {
    Map(BTreeMap<String, Content>),
    Array(Vec<Content>),
}

impl Prelim {
    /// An empty map prelim.
    pub fn map() -> Self {
        Prelim::Map(BTreeMap::new())
    }

    /// An empty array prelim.
    pub fn array() -> Self {
        Prelim::Array(Vec::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Prelim::Map(_) => NodeKind::Map,
            Prelim::Array(_) => NodeKind::Array,
        }
    }

    /// Adds an entry to a map prelim. Ignored for array prelims.
    pub fn with_entry(mut self, key: impl Into<String>, content: impl Into<Content>) -> Self {
        if let Prelim::Map(entries) = &mut self {
            entries.insert(key.into(), content.into());
        }
        self
    }
}

/// Content that can be written into a shared container.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Scalar(Scalar),
    Node(Prelim),
}

impl From<Scalar> for Content {
    fn from(scalar: Scalar) -> Self {
        Content::Scalar(scalar)
    }
}

impl From<Prelim> for Content {
    fn from(prelim: Prelim) -> Self {
        Content::Node(prelim)
    }
}

/// Opaque token naming who caused a transaction.
///
/// Stores tag their own transactions with their id; remote updates carry the
/// origin chosen by whoever hands them to [`SharedDoc::apply_update`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(Arc<str>);

impl Origin {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Origin(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::new("local")
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(name: &str) -> Self {
        Origin::new(name)
    }
}

/// A change to a shared document, as published on its update feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocUpdate {
    /// Engine-specific encoding of the change
    pub update: Vec<u8>,
    /// Who caused the change
    pub origin: Origin,
}

/// Broadcast feed of [`DocUpdate`]s shared by every engine.
#[derive(Debug, Clone)]
pub struct UpdateFeed {
    sender: broadcast::Sender<DocUpdate>,
}

impl Default for UpdateFeed {
    fn default() -> Self {
        Self::new(UPDATE_FEED_CAPACITY)
    }
}

impl UpdateFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every update published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DocUpdate> {
        self.sender.subscribe()
    }

    /// Publish an update to all current subscribers.
    pub fn publish(&self, update: DocUpdate) {
        let size = update.update.len();
        match self.sender.send(update) {
            Ok(receivers) => tracing::trace!(size, receivers, "Published document update"),
            Err(_) => tracing::trace!(size, "Document update dropped, no subscribers"),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Node handle type of a transaction.
pub type NodeOf<X> = Shared<<X as SharedTxn>::Map, <X as SharedTxn>::Array>;

/// Slot type of a transaction.
pub type SlotOf<X> = Slot<<X as SharedTxn>::Map, <X as SharedTxn>::Array>;

/// Reads and mutations of shared containers inside one open transaction.
///
/// Every mutation performed through the same transaction becomes visible to
/// remote peers as one atomic change.
pub trait SharedTxn {
    /// Handle to a live shared map
    type Map: Clone;
    /// Handle to a live shared array
    type Array: Clone;

    /// Returns the content stored under `key`, if any.
    fn map_get(&self, map: &Self::Map, key: &str) -> Option<Slot<Self::Map, Self::Array>>;

    /// Stores `content` under `key`, allocating new nodes for any prelims.
    ///
    /// Returns the slot now stored under `key`; for node content this is the
    /// handle of the freshly allocated node.
    fn map_set(
        &mut self,
        map: &Self::Map,
        key: &str,
        content: Content,
    ) -> Result<Slot<Self::Map, Self::Array>>;

    /// Number of entries in the map.
    fn map_len(&self, map: &Self::Map) -> usize;

    /// Returns the content stored at `index`, if any.
    fn array_get(&self, array: &Self::Array, index: usize) -> Option<Slot<Self::Map, Self::Array>>;

    /// Appends `items` to the end of the array as one batched operation.
    fn array_push(&mut self, array: &Self::Array, items: Vec<Content>) -> Result<()>;

    /// Removes the item at `index`, shifting later items down by one.
    fn array_delete(&mut self, array: &Self::Array, index: usize) -> Result<()>;

    /// Number of items in the array.
    fn array_len(&self, array: &Self::Array) -> usize;
}

/// The root of a shared document.
///
/// Implementations own the authoritative merge state; this library only
/// creates, reads and mutates containers through transactions.
pub trait SharedDoc: Send + Sync + 'static {
    type Map: Clone + Send + Sync + 'static;
    type Array: Clone + Send + Sync + 'static;
    type Txn<'doc>: SharedTxn<Map = Self::Map, Array = Self::Array>
    where
        Self: 'doc;

    /// Returns the top-level shared map called `name`, creating it if needed.
    fn get_map(&self, name: &str) -> Result<Self::Map>;

    /// Returns the top-level shared array called `name`, creating it if needed.
    fn get_array(&self, name: &str) -> Result<Self::Array>;

    /// Runs `f` inside one transaction tagged with `origin`.
    ///
    /// When `f` changed the document, one [`DocUpdate`] is published after the
    /// transaction commits. The engine commits whatever `f` applied even when
    /// `f` returns an error.
    fn transact<R, F>(&self, origin: &Origin, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<R>;

    /// Runs `f` against a transaction that performs no mutations.
    fn read<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Self::Txn<'_>) -> Result<R>,
    {
        self.transact(&Origin::default(), |txn| f(&*txn))
    }

    /// Merges an update produced by a remote peer.
    fn apply_update(&self, origin: &Origin, update: &[u8]) -> Result<()>;

    /// Encodes the complete document state as a single update.
    fn encode_state(&self) -> Result<Vec<u8>>;

    /// The document's change-update feed.
    fn updates(&self) -> &UpdateFeed;

    /// Subscribe to the document's change-update feed.
    fn subscribe(&self) -> broadcast::Receiver<DocUpdate> {
        self.updates().subscribe()
    }
}

impl<D: SharedDoc> SharedDoc for Arc<D> {
    type Map = D::Map;
    type Array = D::Array;
    type Txn<'doc>
        = D::Txn<'doc>
    where
        Self: 'doc;

    fn get_map(&self, name: &str) -> Result<Self::Map> {
        (**self).get_map(name)
    }

    fn get_array(&self, name: &str) -> Result<Self::Array> {
        (**self).get_array(name)
    }

    fn transact<R, F>(&self, origin: &Origin, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self::Txn<'_>) -> Result<R>,
    {
        (**self).transact(origin, f)
    }

    fn apply_update(&self, origin: &Origin, update: &[u8]) -> Result<()> {
        (**self).apply_update(origin, update)
    }

    fn encode_state(&self) -> Result<Vec<u8>> {
        (**self).encode_state()
    }

    fn updates(&self) -> &UpdateFeed {
        (**self).updates()
    }
}
