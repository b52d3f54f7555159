//! Error types for the pool
use std::time::Duration;

use thiserror::Error;

/// Result type for pool operations
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Error taxonomy for pool operations.
///
/// `create`/`validate`/`destroy` failures from the factory are caught at
/// the factory boundary and routed into pool bookkeeping; they surface to
/// callers only as [`PoolError::FactoryCreateFailed`] on the specific
/// waiter a creation was earmarked for. Unknown-resource releases and
/// destroy failures never reach this type — see `pool.rs`'s `release`.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The operation was issued after `drain()`/`clear()` took the pool
    /// out of `RUNNING`.
    #[error("pool has shut down")]
    Shutdown,

    /// A waiter exceeded `acquire_timeout_ms` before being dispatched.
    #[error("acquire timed out after {waited:?}")]
    AcquireTimeout {
        /// How long the waiter was enqueued before timing out.
        waited: Duration,
    },

    /// `Factory::create` returned an error while filling this waiter.
    #[error("resource creation failed: {source}")]
    FactoryCreateFailed {
        /// The underlying error from the factory.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `clear()` was called while resources are still borrowed.
    #[error("pool is not drained: {borrowed} resource(s) still borrowed")]
    NotDrained {
        /// Number of still-borrowed resources at the time of the call.
        borrowed: usize,
    },

    /// Construction-time configuration was invalid (e.g. `min > max`).
    #[error("invalid pool configuration: {message}")]
    InvalidConfiguration {
        /// Human-readable description of the invalid field(s).
        message: String,
    },
}

impl PoolError {
    /// Build a [`PoolError::FactoryCreateFailed`] from any boxed error.
    pub fn factory_create_failed<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::FactoryCreateFailed {
            source: Box::new(source),
        }
    }

    /// Build a [`PoolError::InvalidConfiguration`] with a message.
    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation might succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AcquireTimeout { .. } | Self::FactoryCreateFailed { .. })
    }
}
