//! The store's worker task.
//!
//! The worker exclusively owns the shared document, the root codec, the root
//! node and the writable end of the current-value channel. Commands are taken
//! from the queue one at a time and each runs to completion before the next is
//! received, which is what makes updates of one store mutually exclusive.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{Instrument, debug, info, info_span, trace, warn};

use super::{StoreConfig, StoreError, Update};
use crate::{
    Result,
    codec::{Codec, child_node},
    shared::{Origin, Shared, SharedDoc},
};

/// Commands handled by the store's worker
pub(crate) enum StoreCommand<D> {
    /// Apply a local update
    Apply {
        update: Update<D>,
        response: oneshot::Sender<Result<D>>,
    },
    /// Merge an update produced by a remote peer
    ApplyRemote {
        update: Vec<u8>,
        origin: Origin,
        response: oneshot::Sender<Result<D>>,
    },
    /// Encode the complete document state
    EncodeState {
        response: oneshot::Sender<Result<Vec<u8>>>,
    },
}

// Manual Debug impl required because `Update` wraps a closure and
// `oneshot::Sender` does not implement Debug.
impl<D> std::fmt::Debug for StoreCommand<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apply { update, .. } => f.debug_struct("Apply").field("update", update).finish(),
            Self::ApplyRemote { update, origin, .. } => f
                .debug_struct("ApplyRemote")
                .field("origin", origin)
                .field("size", &update.len())
                .finish(),
            Self::EncodeState { .. } => write!(f, "EncodeState"),
        }
    }
}

/// Returns the node stored under the configured key of the configured root map.
pub(crate) fn resolve_root<Doc: SharedDoc>(
    doc: &Doc,
    config: &StoreConfig,
) -> Result<Shared<Doc::Map, Doc::Array>> {
    let map = doc.get_map(&config.root)?;
    doc.read(|txn| child_node(txn, &map, &config.key))
}

pub(crate) struct StoreWorker<D, Doc: SharedDoc, C> {
    id: String,
    origin: Origin,
    config: StoreConfig,
    doc: Doc,
    codec: C,
    root: Shared<Doc::Map, Doc::Array>,
    state: watch::Sender<D>,
    commands: mpsc::Receiver<StoreCommand<D>>,
}

impl<D, Doc, C> StoreWorker<D, Doc, C>
where
    D: Clone + Send + Sync + 'static,
    Doc: SharedDoc,
    C: Codec<D> + 'static,
{
    pub(crate) fn new(
        id: String,
        config: StoreConfig,
        doc: Doc,
        codec: C,
        root: Shared<Doc::Map, Doc::Array>,
        state: watch::Sender<D>,
        commands: mpsc::Receiver<StoreCommand<D>>,
    ) -> Self {
        Self {
            origin: Origin::new(id.as_str()),
            id,
            config,
            doc,
            codec,
            root,
            state,
            commands,
        }
    }

    /// Main loop; ends once every sender of the command queue is gone
    pub(crate) async fn run(mut self) {
        let span = info_span!("store", id = %self.id);
        async move {
            info!("Starting store worker");
            while let Some(command) = self.commands.recv().await {
                trace!(?command, "Handling store command");
                self.handle_command(command).await;
            }
            info!("Store worker stopped");
        }
        .instrument(span)
        .await
    }

    async fn handle_command(&mut self, command: StoreCommand<D>) {
        // A caller that stopped waiting drops its receiver; the work is still done.
        match command {
            StoreCommand::Apply { update, response } => {
                let result = self.apply(update).await;
                let _ = response.send(result);
            }
            StoreCommand::ApplyRemote {
                update,
                origin,
                response,
            } => {
                let result = self.apply_remote(&update, &origin);
                let _ = response.send(result);
            }
            StoreCommand::EncodeState { response } => {
                let _ = response.send(self.doc.encode_state());
            }
        }
    }

    async fn apply(&mut self, update: Update<D>) -> Result<D> {
        let current = self.state.borrow().clone();
        let document_updated = update.is_document_updated();

        // The transformation runs on its own task so that a panic inside it
        // fails this update instead of the worker.
        let next = match tokio::spawn(update.run(current)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Transformation did not complete");
                Err(err.into())
            }
        }
        .map_err(|source| StoreError::TransformationFailed {
            store: self.id.clone(),
            source,
        })?;

        if document_updated {
            debug!("Document already updated, skipping reconciliation");
        } else {
            self.doc.transact(&self.origin, |txn| {
                self.codec.update_shared(txn, &self.root, &next)
            })?;
        }

        self.state.send_replace(next.clone());
        Ok(next)
    }

    fn apply_remote(&mut self, update: &[u8], origin: &Origin) -> Result<D> {
        self.doc.apply_update(origin, update)?;

        // A peer may have replaced the root node entirely
        self.root = resolve_root(&self.doc, &self.config)?;
        let next = self
            .doc
            .read(|txn| self.codec.decode_shared(txn, &self.root))?;

        debug!(%origin, size = update.len(), "Applied remote update");
        self.state.send_replace(next.clone());
        Ok(next)
    }
}
