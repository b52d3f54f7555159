//! A single-fulfillment promise-like handle
//!
//! Wraps [`tokio::sync::oneshot`] so call sites in `pool.rs` read in pool
//! vocabulary (`resolve`/`reject`) rather than raw channel plumbing. The
//! underlying channel already guarantees exactly-once delivery to exactly
//! one consumer; this type just names that guarantee.

use tokio::sync::oneshot;

/// The producer half of a [`Deferred`]. Exactly one of `resolve`/`reject`
/// has any effect; later calls (or a drop without either) are no-ops from
/// the producer's point of view, surfaced to the consumer as a closed
/// channel.
pub struct DeferredHandle<T, E> {
    sender: Option<oneshot::Sender<Result<T, E>>>,
}

impl<T, E> DeferredHandle<T, E> {
    /// Resolve the deferred with a value. A no-op if already resolved,
    /// rejected, or the consumer side was dropped.
    pub fn resolve(&mut self, value: T) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Ok(value));
        }
    }

    /// Reject the deferred with an error. A no-op if already
    /// resolved/rejected or the consumer side was dropped.
    pub fn reject(&mut self, error: E) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(error));
        }
    }

    /// Whether this handle has already fired (resolved or rejected).
    #[must_use]
    pub fn is_fired(&self) -> bool {
        self.sender.is_none()
    }
}

/// A lazy sequence of length one: the eventual resolve/reject outcome,
/// awaited by exactly one consumer.
pub struct Deferred<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
}

/// Error returned when the producer side was dropped without ever calling
/// `resolve` or `reject`.
#[derive(Debug)]
pub struct Abandoned;

impl<T, E> Deferred<T, E> {
    /// Create a linked producer/consumer pair.
    pub fn new() -> (DeferredHandle<T, E>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            DeferredHandle { sender: Some(tx) },
            Self { receiver: rx },
        )
    }

    /// Await the outcome. Resolves to `Err(Ok(Abandoned))`'s inner variant
    /// is flattened away — callers only ever see `T`, `E`, or abandonment.
    pub async fn wait(self) -> Result<T, DeferredOutcome<E>> {
        match self.receiver.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DeferredOutcome::Rejected(err)),
            Err(_) => Err(DeferredOutcome::Abandoned),
        }
    }
}

/// The non-success outcomes of awaiting a [`Deferred`].
#[derive(Debug)]
pub enum DeferredOutcome<E> {
    /// The producer called `reject`.
    Rejected(E),
    /// The producer was dropped without resolving or rejecting.
    Abandoned,
}
