//! Serialized update pipeline over one shared document.
//!
//! A [`Store`] owns the current value of a collaborative document. Every
//! change goes through its queue: the store's worker takes one [`Update`] at a
//! time, runs the transformation against the current value, reconciles the
//! document with the result through the root codec inside one engine
//! transaction, and only then takes the next update.
//!
//! Updates are produced either directly with [`Store::enqueue`] or by
//! [`Handler`]s, which turn asynchronous application events into updates.
//!
//! ```no_run
//! # use collab::{Store, Update, codec::INT, shared::MemoryDoc};
//! # async fn example() -> collab::Result<()> {
//! let store = Store::new(MemoryDoc::new(), INT, 0)?;
//!
//! let increment = store.handle(|count: i64, by: i64| async move { Ok(count + by) });
//! increment.call(2).await?;
//!
//! let next = store.enqueue(Update::map(|count| count * 10)).await?;
//! # Ok(())
//! # }
//! ```

use std::{
    error::Error as StdError,
    fmt,
    future::Future,
    marker::PhantomData,
    sync::{Arc, OnceLock},
};

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::debug;

use crate::{
    Error, Result,
    codec::{Codec, CodecError},
    shared::{Content, DocUpdate, SharedDoc, SharedTxn, UpdateFeed},
};

mod errors;
pub use errors::StoreError;

mod config;
pub use config::StoreConfig;

mod update;
pub use update::Update;

mod handler;
pub use handler::{EmittingHandler, Emitter, ErrorHandler, Handler};
use handler::{Enqueuer, log_error};

mod worker;
use worker::{StoreCommand, StoreWorker, resolve_root};

/// Error type returned by application transformations.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Stream of a store's values, starting with the current one.
///
/// Slow consumers skip intermediate values and always see the latest.
pub type DataStream<D> = WatchStream<D>;

struct StoreInner<D> {
    id: String,
    config: StoreConfig,
    commands: mpsc::Sender<StoreCommand<D>>,
    state: watch::Receiver<D>,
    feed: UpdateFeed,
    on_error: ErrorHandler,
    update: OnceLock<Handler<D>>,
}

/// Owns the current value of one shared document and applies updates to it
/// one at a time.
///
/// Cloning a store yields another handle to the same worker. The worker shuts
/// down once every handle is dropped; handlers do not keep it alive.
pub struct Store<D> {
    inner: Arc<StoreInner<D>>,
}

impl<D> Clone for Store<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> fmt::Debug for Store<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .field("closed", &self.inner.commands.is_closed())
            .finish()
    }
}

impl<D> Store<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Creates a store with the default configuration, writing `initial` as a
    /// new root node of `doc`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<Doc, C>(doc: Doc, codec: C, initial: D) -> Result<Self>
    where
        Doc: SharedDoc,
        C: Codec<D> + 'static,
    {
        Self::builder(codec).create(doc, initial)
    }

    /// Starts configuring a store using `codec` as its root codec.
    pub fn builder<C>(codec: C) -> StoreBuilder<D, C>
    where
        C: Codec<D> + 'static,
    {
        StoreBuilder::new(codec)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The latest value.
    pub fn current(&self) -> D {
        self.inner.state.borrow().clone()
    }

    /// Stream yielding the current value and then every later one.
    pub fn data(&self) -> DataStream<D> {
        WatchStream::new(self.inner.state.clone())
    }

    /// Applies `update` and returns the resulting value.
    ///
    /// Once the update has reached the store's queue it runs to completion
    /// even if the returned future is dropped.
    pub async fn enqueue(&self, update: Update<D>) -> Result<D> {
        let (response, result) = oneshot::channel();
        self.send(StoreCommand::Apply { update, response }).await?;
        result.await.map_err(|_| self.closed())?
    }

    /// Built-in handler replacing the current value with each event.
    ///
    /// The handler's listener is started on first use.
    pub fn update(&self) -> &Handler<D> {
        self.inner
            .update
            .get_or_init(|| Handler::spawn(self, |_, next: D| async move { Ok(next) }))
    }

    /// Creates a handler applying `f` to the current value for every event.
    pub fn handle<A, F, Fut>(&self, f: F) -> Handler<A>
    where
        A: Send + 'static,
        F: Fn(D, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<D, BoxError>> + Send + 'static,
    {
        Handler::spawn(self, f)
    }

    /// Creates a handler whose transformation can emit events of type `E`.
    pub fn handle_and_emit<A, E, F, Fut>(&self, f: F) -> EmittingHandler<A, E>
    where
        A: Send + 'static,
        E: Clone + Send + 'static,
        F: Fn(D, A, Emitter<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<D, BoxError>> + Send + 'static,
    {
        EmittingHandler::spawn(self, f)
    }

    /// Merges an update produced by a remote peer and refreshes the current
    /// value from the document.
    ///
    /// Runs through the queue, so it never interleaves with a local update.
    pub async fn apply_remote(&self, update: &[u8], origin: impl Into<crate::Origin>) -> Result<D> {
        let (response, result) = oneshot::channel();
        self.send(StoreCommand::ApplyRemote {
            update: update.to_vec(),
            origin: origin.into(),
            response,
        })
        .await?;
        result.await.map_err(|_| self.closed())?
    }

    /// Encodes the complete document state, for a peer joining the session.
    pub async fn encode_state(&self) -> Result<Vec<u8>> {
        let (response, result) = oneshot::channel();
        self.send(StoreCommand::EncodeState { response }).await?;
        result.await.map_err(|_| self.closed())?
    }

    /// Subscribe to the document's change-update feed.
    pub fn subscribe(&self) -> broadcast::Receiver<DocUpdate> {
        self.inner.feed.subscribe()
    }

    /// The callback receiving failures of handler-driven updates.
    pub fn error_handler(&self) -> &ErrorHandler {
        &self.inner.on_error
    }

    pub(crate) fn enqueuer(&self) -> Enqueuer<D> {
        Enqueuer::new(self.inner.commands.downgrade(), Arc::clone(&self.inner.on_error))
    }

    async fn send(&self, command: StoreCommand<D>) -> Result<()> {
        self.inner
            .commands
            .send(command)
            .await
            .map_err(|_| self.closed())
    }

    fn closed(&self) -> Error {
        StoreError::Closed {
            store: self.inner.id.clone(),
        }
        .into()
    }
}

/// Builder for [`Store`].
pub struct StoreBuilder<D, C> {
    codec: C,
    config: StoreConfig,
    on_error: Option<ErrorHandler>,
    _value: PhantomData<fn() -> D>,
}

impl<D, C> StoreBuilder<D, C>
where
    D: Clone + Send + Sync + 'static,
    C: Codec<D> + 'static,
{
    fn new(codec: C) -> Self {
        Self {
            codec,
            config: StoreConfig::default(),
            on_error: None,
            _value: PhantomData,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = Some(id.into());
        self
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.config.root = root.into();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.key = key.into();
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Sets the callback receiving failures of handler-driven updates.
    ///
    /// Defaults to logging the error.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Creates the store, writing `initial` as a new root node of `doc`.
    ///
    /// An existing root node under the configured key is replaced. Must be
    /// called from within a Tokio runtime.
    pub fn create<Doc: SharedDoc>(self, doc: Doc, initial: D) -> Result<Store<D>> {
        let id = self.config.resolve_id();
        let map = doc.get_map(&self.config.root)?;
        let prelim = self.codec.create_shared(&initial)?;

        let root = doc.transact(&crate::Origin::new(id.as_str()), |txn| {
            let slot = txn.map_set(&map, &self.config.key, Content::Node(prelim))?;
            let kind = slot.kind();
            slot.into_node().ok_or_else(|| {
                CodecError::NodeMismatch {
                    expected: "node".to_string(),
                    found: kind,
                }
                .into()
            })
        })?;

        debug!(store = %id, root = %self.config.root, key = %self.config.key, "Created root node");
        Ok(self.spawn(id, doc, root, initial))
    }

    /// Joins an existing document, decoding the initial value from its root
    /// node.
    ///
    /// Fails with a decode mismatch when the root node is missing or does not
    /// match the codec. Must be called from within a Tokio runtime.
    pub fn open<Doc: SharedDoc>(self, doc: Doc) -> Result<Store<D>> {
        let id = self.config.resolve_id();
        let root = resolve_root(&doc, &self.config)?;
        let initial = doc.read(|txn| self.codec.decode_shared(txn, &root))?;

        debug!(store = %id, root = %self.config.root, key = %self.config.key, "Opened root node");
        Ok(self.spawn(id, doc, root, initial))
    }

    fn spawn<Doc: SharedDoc>(
        self,
        id: String,
        doc: Doc,
        root: crate::shared::Shared<Doc::Map, Doc::Array>,
        initial: D,
    ) -> Store<D> {
        let (commands, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let (state, watcher) = watch::channel(initial);
        let feed = doc.updates().clone();

        let worker = StoreWorker::new(
            id.clone(),
            self.config.clone(),
            doc,
            self.codec,
            root,
            state,
            receiver,
        );
        tokio::spawn(worker.run());

        Store {
            inner: Arc::new(StoreInner {
                id,
                config: self.config,
                commands,
                state: watcher,
                feed,
                on_error: self.on_error.unwrap_or_else(log_error),
                update: OnceLock::new(),
            }),
        }
    }
}

impl<D, C: fmt::Debug> fmt::Debug for StoreBuilder<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
