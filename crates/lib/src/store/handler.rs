//! Adapters turning asynchronous events into queued updates.
//!
//! A handler owns a listener task. Every event it receives, whether through
//! [`Handler::call`] or a stream attached with [`Handler::listen`], is wrapped
//! in an [`Update`] and enqueued on the store. The listener waits for each
//! update to complete before taking the next event, so the events of one
//! handler are applied in arrival order.
//!
//! Failures never reach the code that sent the event. They are passed to the
//! store's [`ErrorHandler`] and the listener keeps going.

use std::{fmt, future::Future, sync::Arc};

use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, debug, debug_span, trace};

use super::{BoxError, Store, StoreCommand, StoreError, Update};
use crate::{Error, Result, constants::EMIT_CAPACITY};

/// Callback receiving every failure of a handler-driven update.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// The default [`ErrorHandler`]: logs the failure.
pub(crate) fn log_error() -> ErrorHandler {
    Arc::new(|err: &Error| {
        tracing::error!(module = err.module(), error = %err, "Store update failed");
    })
}

/// Enqueues updates on a store without keeping it alive.
pub(crate) struct Enqueuer<D> {
    commands: mpsc::WeakSender<StoreCommand<D>>,
    on_error: ErrorHandler,
}

impl<D> Enqueuer<D> {
    pub(crate) fn new(commands: mpsc::WeakSender<StoreCommand<D>>, on_error: ErrorHandler) -> Self {
        Self { commands, on_error }
    }

    /// Applies `update` and reports failures to the error handler.
    ///
    /// Returns `false` once the store has shut down.
    pub(crate) async fn enqueue(&self, update: Update<D>) -> bool {
        let Some(commands) = self.commands.upgrade() else {
            return false;
        };
        let (response, result) = oneshot::channel();
        if commands
            .send(StoreCommand::Apply { update, response })
            .await
            .is_err()
        {
            return false;
        }
        drop(commands);

        match result.await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                (self.on_error)(&err);
                true
            }
            Err(_) => false,
        }
    }
}

/// Fire-and-forget entry point turning events of type `A` into updates.
pub struct Handler<A> {
    events: mpsc::Sender<A>,
}

impl<A> Clone for Handler<A> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<A> fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("closed", &self.events.is_closed())
            .finish()
    }
}

impl<A: Send + 'static> Handler<A> {
    pub(crate) fn spawn<D, F, Fut>(store: &Store<D>, f: F) -> Self
    where
        D: Clone + Send + Sync + 'static,
        F: Fn(D, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<D, BoxError>> + Send + 'static,
    {
        let (events, mut incoming) = mpsc::channel(store.config().queue_capacity.max(1));
        let enqueuer = store.enqueuer();
        let f = Arc::new(f);

        tokio::spawn(
            async move {
                debug!("Handler listener started");
                while let Some(event) = incoming.recv().await {
                    let f = Arc::clone(&f);
                    let update = Update::new(move |current| (*f)(current, event));
                    if !enqueuer.enqueue(update).await {
                        debug!("Store closed, stopping handler listener");
                        break;
                    }
                }
                trace!("Handler listener stopped");
            }
            .instrument(debug_span!("handler", store = %store.id())),
        );

        Self { events }
    }

    /// Sends an event to the listener.
    ///
    /// Returns once the event is queued, not once its update has been applied.
    pub async fn call(&self, event: A) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| StoreError::HandlerClosed.into())
    }

    /// Forwards every item of `stream` to the listener.
    ///
    /// The forwarder stops when the stream ends or the listener is gone.
    pub fn listen<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = A> + Send + 'static,
    {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                if events.send(event).await.is_err() {
                    break;
                }
            }
        })
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Publishes events from inside a transformation.
pub struct Emitter<E> {
    sender: broadcast::Sender<E>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl<E> Emitter<E> {
    /// Emits `event` to every current subscriber and returns how many there were.
    pub fn emit(&self, event: E) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

/// A [`Handler`] whose transformation can also emit events of type `E`.
pub struct EmittingHandler<A, E> {
    handler: Handler<A>,
    emitter: Emitter<E>,
}

impl<A, E> Clone for EmittingHandler<A, E> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<A, E> fmt::Debug for EmittingHandler<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmittingHandler")
            .field("handler", &self.handler)
            .field("emitter", &self.emitter)
            .finish()
    }
}

impl<A, E> EmittingHandler<A, E>
where
    A: Send + 'static,
    E: Clone + Send + 'static,
{
    pub(crate) fn spawn<D, F, Fut>(store: &Store<D>, f: F) -> Self
    where
        D: Clone + Send + Sync + 'static,
        F: Fn(D, A, Emitter<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<D, BoxError>> + Send + 'static,
    {
        let (sender, _) = broadcast::channel(EMIT_CAPACITY);
        let emitter = Emitter { sender };
        let listener_emitter = emitter.clone();
        let handler = Handler::spawn(store, move |current, event| {
            f(current, event, listener_emitter.clone())
        });
        Self { handler, emitter }
    }

    /// Sends an event to the listener.
    pub async fn call(&self, event: A) -> Result<()> {
        self.handler.call(event).await
    }

    /// Forwards every item of `stream` to the listener.
    pub fn listen<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = A> + Send + 'static,
    {
        self.handler.listen(stream)
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.emitter.sender.subscribe()
    }

    pub fn emitter(&self) -> &Emitter<E> {
        &self.emitter
    }

    pub fn handler(&self) -> &Handler<A> {
        &self.handler
    }
}
