//! `ResourceRecord` — the pool's bookkeeping wrapper around one resource
use std::time::{Duration, Instant};

/// The lifecycle state of a [`ResourceRecord`], per spec.md §3.
///
/// ```text
/// CREATING -> IDLE -> ALLOCATED -> IDLE -> ... (repeat)
///           \-> ALLOCATED (skipped straight to a waiter)
/// IDLE | ALLOCATED -> VALIDATING -> IDLE | INVALID
/// any  -> INVALID -> DESTROYED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// `Factory::create` is in flight for this record.
    Creating,
    /// Idle in `available`, eligible to be dispatched.
    Idle,
    /// Loaned to a borrower.
    Allocated,
    /// `Factory::validate` is in flight for this record.
    Validating,
    /// Failed validation, or explicitly destroyed by a borrower; awaiting
    /// `Factory::destroy`.
    Invalid,
    /// `Factory::destroy` has completed; the record is removed from the
    /// pool on the next housekeeping step.
    Destroyed,
}

/// A unique, process-local identity for a [`ResourceRecord`], stable for
/// its whole lifetime. Used to match a returned resource back to its
/// record on `release`/`destroy` without requiring `Resource: Eq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u64);

/// One physical resource plus its pool bookkeeping.
///
/// The record owns the resource value for its entire life except for the
/// interval between an `acquire` success and the matching `release`/
/// `destroy`, during which the value is loaned out (the pool still tracks
/// the record, just with `resource` temporarily taken).
pub struct ResourceRecord<T> {
    pub(crate) id: RecordId,
    pub(crate) resource: Option<T>,
    pub(crate) state: RecordState,
    pub(crate) created_at: Instant,
    pub(crate) last_used_at: Instant,
}

impl<T> ResourceRecord<T> {
    /// Create a new record in `CREATING` state with no resource yet.
    pub(crate) fn new_creating(id: RecordId) -> Self {
        let now = Instant::now();
        Self {
            id,
            resource: None,
            state: RecordState::Creating,
            created_at: now,
            last_used_at: now,
        }
    }

    /// How long this record has sat idle since it was last used/created.
    pub(crate) fn idle_for(&self) -> Duration {
        self.last_used_at.elapsed()
    }

    /// Mark the record idle, storing `resource` and refreshing the
    /// last-used timestamp — called on factory-create success and on
    /// `release`.
    pub(crate) fn mark_idle(&mut self, resource: T) {
        self.resource = Some(resource);
        self.state = RecordState::Idle;
        self.last_used_at = Instant::now();
    }

    /// Mark the record allocated, taking ownership of `resource` out for
    /// the duration of the loan.
    pub(crate) fn take_for_loan(&mut self) -> T {
        self.state = RecordState::Allocated;
        self.resource.take().expect("allocated record must hold a resource")
    }

    pub(crate) fn mark_invalid(&mut self) {
        self.state = RecordState::Invalid;
    }

    pub(crate) fn mark_validating(&mut self) {
        self.state = RecordState::Validating;
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.state = RecordState::Destroyed;
    }
}
