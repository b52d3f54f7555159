//! Pool configuration
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Configuration for a [`crate::Pool`].
///
/// All fields have defaults matching spec.md §6: a pool constructed with
/// `PoolConfig::default()` behaves like a single-resource, single-priority,
/// no-eviction pool.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfig {
    /// Upper bound on the number of live records (`|records| <= max`).
    pub max: usize,
    /// Lower bound maintained opportunistically; pre-warmed on construction.
    pub min: usize,
    /// Return-to-available policy: `true` (default) inserts returned
    /// records at the tail (oldest-idle-first dispatch); `false` inserts
    /// at the head (most-recently-returned-first, i.e. LIFO).
    pub fifo: bool,
    /// Number of priority classes `P`. Priorities passed to `acquire` are
    /// clamped into `[0, priority_range)`.
    pub priority_range: usize,
    /// Validate a record before handing it to a borrower.
    pub test_on_borrow: bool,
    /// Validate a record before returning it to `available`.
    pub test_on_return: bool,
    /// Maximum time a waiter may wait before `AcquireTimeout`. Zero disables
    /// the timeout.
    pub acquire_timeout: Duration,
    /// Idle lifetime before a record becomes eviction-eligible. `None`
    /// means records are never evicted for being idle.
    pub idle_timeout: Option<Duration>,
    /// Period between eviction sweeps. Zero (the default) disables the
    /// evictor entirely.
    pub eviction_run_interval: Duration,
    /// Maximum number of idle candidates inspected per eviction sweep.
    pub num_tests_per_run: usize,
    /// Begin pre-warm and the evictor immediately on construction; if
    /// `false`, the first `acquire` call starts them.
    pub autostart: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max: 1,
            min: 0,
            fifo: true,
            priority_range: 1,
            test_on_borrow: false,
            test_on_return: false,
            acquire_timeout: Duration::ZERO,
            idle_timeout: None,
            eviction_run_interval: Duration::ZERO,
            num_tests_per_run: 3,
            autostart: true,
        }
    }
}

impl PoolConfig {
    /// Validate the configuration, returning [`PoolError::InvalidConfiguration`]
    /// on the first violation found.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max == 0 {
            return Err(PoolError::invalid_configuration("max must be greater than 0"));
        }
        if self.min > self.max {
            return Err(PoolError::invalid_configuration(format!(
                "min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        if self.priority_range < 1 {
            return Err(PoolError::invalid_configuration(
                "priority_range must be at least 1",
            ));
        }
        Ok(())
    }

    /// Whether the eviction sweep is enabled.
    #[must_use]
    pub fn eviction_enabled(&self) -> bool {
        !self.eviction_run_interval.is_zero()
    }

    /// Whether acquire timeouts are enabled.
    #[must_use]
    pub fn acquire_timeout_enabled(&self) -> bool {
        !self.acquire_timeout.is_zero()
    }
}
