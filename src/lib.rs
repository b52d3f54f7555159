#![allow(clippy::excessive_nesting)]

//! # respool
//!
//! A generic, priority-aware, bounded asynchronous resource pool.
//!
//! Implement [`Factory`] for whatever you want pooled (database
//! connections, worker handles, expensive parsers), hand it to
//! [`Pool::new`] with a [`PoolConfig`], and call [`Pool::acquire`] from
//! any task. Returned [`PoolGuard`]s recycle their resource automatically
//! on drop; [`Pool::drain`] and [`Pool::clear`] provide an orderly,
//! two-phase shutdown.

pub mod config;
pub mod deferred;
pub mod error;
pub mod evictor;
pub mod factory;
pub mod guard;
pub mod pool;
pub mod priority_queue;
pub mod record;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use factory::Factory;
pub use pool::{Pool, PoolGuard, PoolStats};
pub use record::{RecordId, RecordState};
