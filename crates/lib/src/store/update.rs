use std::{fmt, future::Future, pin::Pin};

use super::BoxError;

type BoxFuture<D> = Pin<Box<dyn Future<Output = Result<D, BoxError>> + Send>>;
type Transform<D> = Box<dyn FnOnce(D) -> BoxFuture<D> + Send>;

/// A pending transformation of a store's current value.
///
/// The transformation receives the value current at the moment the store
/// starts applying it, and returns the next value. After it completes the
/// store reconciles the shared document with the new value, unless the update
/// is marked as [document updated](Update::mark_document_updated).
pub struct Update<D> {
    transform: Transform<D>,
    document_updated: bool,
}

impl<D: Send + 'static> Update<D> {
    /// An asynchronous transformation.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(D) -> Fut + Send + 'static,
        Fut: Future<Output = Result<D, BoxError>> + Send + 'static,
    {
        Self {
            transform: Box::new(move |current| -> BoxFuture<D> { Box::pin(f(current)) }),
            document_updated: false,
        }
    }

    /// A synchronous, infallible transformation.
    pub fn map<F>(f: F) -> Self
    where
        F: FnOnce(D) -> D + Send + 'static,
    {
        Self::new(move |current| async move { Ok(f(current)) })
    }

    /// Replaces the current value.
    pub fn replace(value: D) -> Self {
        Self::new(move |_| async move { Ok(value) })
    }
}

impl<D> Update<D> {
    /// Marks the shared document as already reflecting the result.
    ///
    /// The store then only records the new value and skips reconciliation.
    pub fn mark_document_updated(mut self) -> Self {
        self.document_updated = true;
        self
    }

    pub fn is_document_updated(&self) -> bool {
        self.document_updated
    }

    pub(crate) async fn run(self, current: D) -> Result<D, BoxError> {
        (self.transform)(current).await
    }
}

impl<D> fmt::Debug for Update<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("document_updated", &self.document_updated)
            .finish_non_exhaustive()
    }
}
