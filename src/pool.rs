//! Pool core — holds all state; implements acquire, release, destroy,
//! drain, clear; dispatches waiters; enforces invariants.
//!
//! Grounded on the teacher's `Pool`/`PoolInner` split (`Arc<PoolInner>`,
//! a single lock guarding shared state, `Clone` via `Arc::clone`), extended
//! with the priority-queue dispatch rule and two-phase drain/clear
//! shutdown spec.md §4.5 requires that the teacher's simpler
//! semaphore-gated pool doesn't have.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::PoolConfig;
use crate::deferred::{Deferred, DeferredHandle, DeferredOutcome};
use crate::error::{PoolError, PoolResult};
use crate::evictor::{self, EvictorHandle};
use crate::factory::{destroy_quiet, Factory};
use crate::guard::Guard;
use crate::priority_queue::PriorityQueue;
use crate::record::{RecordId, RecordState, ResourceRecord};

/// Lifecycle phase of the pool as a whole (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Normal operation: acquires are served, waiters admitted.
    Running,
    /// No new waiters admitted; existing loans allowed to complete.
    Draining,
    /// Terminal: idle resources destroyed, pool inert.
    Cleared,
}

/// A pending `acquire` call, queued by priority.
struct Waiter<T> {
    id: u64,
    handle: DeferredHandle<(RecordId, T), PoolError>,
}

struct PoolState<T> {
    records: HashMap<RecordId, ResourceRecord<T>>,
    /// IDs of IDLE records, in dispatch order (always popped from the
    /// front; `fifo` governs which end `release` pushes onto).
    available: VecDeque<RecordId>,
    waiters: PriorityQueue<Waiter<T>>,
    creation_in_flight: usize,
    mode: Mode,
    next_record_id: u64,
    next_waiter_id: u64,
    total_created: u64,
    total_destroyed: u64,
}

impl<T> PoolState<T> {
    fn new(priority_range: usize) -> Self {
        Self {
            records: HashMap::new(),
            available: VecDeque::new(),
            waiters: PriorityQueue::new(priority_range),
            creation_in_flight: 0,
            mode: Mode::Running,
            next_record_id: 0,
            next_waiter_id: 0,
            total_created: 0,
            total_destroyed: 0,
        }
    }

    fn alloc_record_id(&mut self) -> RecordId {
        let id = RecordId(self.next_record_id);
        self.next_record_id += 1;
        id
    }

    fn alloc_waiter_id(&mut self) -> u64 {
        let id = self.next_waiter_id;
        self.next_waiter_id += 1;
        id
    }

    fn borrowed(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.state == RecordState::Allocated)
            .count()
    }

    fn size(&self) -> usize {
        self.records.len()
    }

    /// Pop the next available IDLE record id, per dispatch order.
    fn pop_available(&mut self) -> Option<RecordId> {
        self.available.pop_front()
    }

    /// Insert a returned/created IDLE record id into `available`,
    /// respecting the `fifo` policy.
    fn push_available(&mut self, id: RecordId, fifo: bool) {
        if fifo {
            self.available.push_back(id);
        } else {
            self.available.push_front(id);
        }
    }

    fn remove_record(&mut self, id: RecordId) {
        self.records.remove(&id);
        self.total_destroyed += 1;
    }
}

/// Point-in-time pool statistics, consistent with the invariants at
/// observation time (spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// `|records|`.
    pub size: usize,
    /// Number of records currently loaned out.
    pub borrowed: usize,
    /// Number of idle, dispatch-ready records.
    pub available: usize,
    /// Number of waiters currently enqueued.
    pub pending: usize,
    /// `max - size - creation_in_flight`.
    pub spare_capacity: usize,
    /// Records currently being created by the factory.
    pub creation_in_flight: usize,
    /// Total records ever successfully created (spec.md §8 Conservation).
    pub total_created: u64,
    /// Total records ever destroyed (spec.md §8 Conservation).
    pub total_destroyed: u64,
}

pub(crate) struct PoolInner<F: Factory> {
    pub(crate) factory: F,
    pub(crate) config: PoolConfig,
    state: Mutex<PoolState<F::Resource>>,
    notify: tokio::sync::Notify,
    evictor: Mutex<Option<EvictorHandle>>,
    started: std::sync::atomic::AtomicBool,
}

/// A generic, priority-aware, bounded asynchronous resource pool.
///
/// `Pool<F>` is cheap to clone (an `Arc` internally) and is typically
/// shared across tasks. Construct one with [`Pool::new`], borrow resources
/// with [`Pool::acquire`], and shut one down with [`Pool::drain`] followed
/// by [`Pool::clear`].
pub struct Pool<F: Factory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: Factory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Pool")
            .field("size", &state.size())
            .field("borrowed", &state.borrowed())
            .field("pending", &state.waiters.size())
            .field("mode", &format_args!("{:?}", state.mode))
            .finish()
    }
}

/// An acquired resource. Returns its record to the pool when dropped
/// (after an optional `test_on_return` validation); call
/// [`PoolGuard::destroy`] instead of dropping to force the underlying
/// record to be retired rather than recycled.
pub struct PoolGuard<F: Factory> {
    id: RecordId,
    inner: Guard<F::Resource>,
    pool: Pool<F>,
}

impl<F: Factory> std::ops::Deref for PoolGuard<F> {
    type Target = F::Resource;

    fn deref(&self) -> &F::Resource {
        &self.inner
    }
}

impl<F: Factory> std::ops::DerefMut for PoolGuard<F> {
    fn deref_mut(&mut self) -> &mut F::Resource {
        &mut self.inner
    }
}

impl<F: Factory> PoolGuard<F> {
    /// Force-retire the underlying resource instead of returning it to the
    /// pool — spec.md §4.5's `destroy(resource)`. Used by a borrower that
    /// has observed the resource is broken.
    pub async fn destroy(self) {
        let id = self.id;
        let pool = self.pool.clone();
        let resource = self.inner.into_inner();
        pool.destroy_record(id, resource).await;
    }
}

impl<F: Factory> Pool<F> {
    /// Construct a pool. Validates `config`; if `config.autostart` is set
    /// (the default), pre-warms `min` records and starts the evictor
    /// immediately — otherwise both start lazily on the first `acquire`.
    pub fn new(factory: F, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(min = config.min, max = config.max, "creating resource pool");

        let priority_range = config.priority_range;
        let pool = Self {
            inner: Arc::new(PoolInner {
                factory,
                config,
                state: Mutex::new(PoolState::new(priority_range)),
                notify: tokio::sync::Notify::new(),
                evictor: Mutex::new(None),
                started: std::sync::atomic::AtomicBool::new(false),
            }),
        };

        if pool.inner.config.autostart {
            pool.start();
        }

        Ok(pool)
    }

    /// Idempotently start pre-warming and the evictor. Called eagerly by
    /// `new` when `autostart` is set, or lazily by the first `acquire`
    /// otherwise.
    fn start(&self) {
        if self
            .inner
            .started
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            return;
        }

        *self.inner.evictor.lock() = Some(evictor::spawn(Arc::clone(&self.inner)));

        let min = self.inner.config.min;
        if min > 0 {
            let pool = self.clone();
            tokio::spawn(async move {
                for _ in 0..min {
                    pool.prewarm_one().await;
                }
            });
        }
    }

    async fn prewarm_one(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.size() + state.creation_in_flight >= self.inner.config.max {
                return;
            }
            state.creation_in_flight += 1;
        }
        match self.inner.factory.create().await {
            Ok(resource) => {
                let mut state = self.inner.state.lock();
                state.creation_in_flight -= 1;
                let id = state.alloc_record_id();
                let mut record = ResourceRecord::new_creating(id);
                record.mark_idle(resource);
                state.records.insert(id, record);
                state.total_created += 1;
                let fifo = self.inner.config.fifo;
                state.push_available(id, fifo);
            }
            Err(_err) => {
                let mut state = self.inner.state.lock();
                state.creation_in_flight -= 1;
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "pre-warm creation failed; pool remains operational");
            }
        }
        self.inner.notify.notify_waiters();
    }

    fn clamp_priority(&self, priority: usize) -> usize {
        priority.min(self.inner.config.priority_range.saturating_sub(1))
    }

    fn make_guard(&self, id: RecordId, resource: F::Resource) -> PoolGuard<F> {
        let pool = self.clone();
        let inner = Guard::new(resource, move |resource| {
            let pool = pool.clone();
            tokio::spawn(async move {
                pool.release_record(id, resource).await;
            });
        });
        PoolGuard {
            id,
            inner,
            pool: self.clone(),
        }
    }

    /// Acquire a resource at the given priority class (clamped into
    /// `[0, priority_range)`). See spec.md §4.5 for the full algorithm.
    pub async fn acquire(&self, priority: usize) -> PoolResult<PoolGuard<F>> {
        self.start();
        let priority = self.clamp_priority(priority);

        // (a)/(b): fast path — try to grab and validate an idle record
        // directly, looping past any that fail `test_on_borrow`. Skipped
        // whenever waiters are already queued, so a fresh caller can't
        // steal a just-released record out from under an older or
        // higher-priority waiter still waiting for `dispatch` to reach it
        // (spec.md §4.5 dispatch rule, §5 ordering guarantees).
        loop {
            let popped = {
                let mut state = self.inner.state.lock();
                if state.mode != Mode::Running {
                    return Err(PoolError::Shutdown);
                }
                if !state.waiters.is_empty() {
                    None
                } else {
                    state.pop_available().map(|id| {
                        let record = state.records.get_mut(&id).expect("available id must exist");
                        let resource = record.take_for_loan();
                        if self.inner.config.test_on_borrow {
                            record.mark_validating();
                        }
                        (id, resource)
                    })
                }
            };
            let Some((id, resource)) = popped else {
                break;
            };

            if self.inner.config.test_on_borrow {
                if self.inner.factory.validate(&resource).await {
                    let mut state = self.inner.state.lock();
                    if let Some(record) = state.records.get_mut(&id) {
                        record.state = RecordState::Allocated;
                        record.last_used_at = std::time::Instant::now();
                    }
                    drop(state);
                    return Ok(self.make_guard(id, resource));
                }
                self.invalidate_and_retire(id, resource).await;
                continue;
            }
            return Ok(self.make_guard(id, resource));
        }

        // (c)/(d): no idle record ready — enqueue as a waiter and let
        // `dispatch` service the queue (triggering a new creation if
        // capacity allows).
        let (handle, deferred) = Deferred::new();
        let waiter_id = {
            let mut state = self.inner.state.lock();
            if state.mode != Mode::Running {
                return Err(PoolError::Shutdown);
            }
            let waiter_id = state.alloc_waiter_id();
            state.waiters.enqueue(Waiter { id: waiter_id, handle }, priority);
            waiter_id
        };

        dispatch(&self.inner).await;

        let outcome = if self.inner.config.acquire_timeout_enabled() {
            match tokio::time::timeout(self.inner.config.acquire_timeout, deferred.wait()).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => {
                    let mut state = self.inner.state.lock();
                    state.waiters.remove(|w| w.id == waiter_id);
                    drop(state);
                    self.inner.notify.notify_waiters();
                    return Err(PoolError::AcquireTimeout {
                        waited: self.inner.config.acquire_timeout,
                    });
                }
            }
        } else {
            deferred.wait().await
        };

        match outcome {
            Ok((id, resource)) => Ok(self.make_guard(id, resource)),
            Err(DeferredOutcome::Rejected(err)) => Err(err),
            Err(DeferredOutcome::Abandoned) => Err(PoolError::Shutdown),
        }
    }

    async fn invalidate_and_retire(&self, id: RecordId, resource: F::Resource) {
        {
            let mut state = self.inner.state.lock();
            if let Some(record) = state.records.get_mut(&id) {
                record.mark_invalid();
            }
        }
        destroy_quiet(&self.inner.factory, resource).await;
        {
            let mut state = self.inner.state.lock();
            if let Some(record) = state.records.get_mut(&id) {
                record.mark_destroyed();
            }
            state.remove_record(id);
        }
        self.inner.notify.notify_waiters();
    }

    /// Return a previously-acquired resource to the pool. Invoked
    /// automatically when a [`PoolGuard`] is dropped.
    async fn release_record(&self, id: RecordId, resource: F::Resource) {
        if self.inner.config.test_on_return {
            let valid = self.inner.factory.validate(&resource).await;
            if !valid {
                self.invalidate_and_retire(id, resource).await;
                dispatch(&self.inner).await;
                return;
            }
        }

        {
            let mut state = self.inner.state.lock();
            // `release` of an unknown or already-non-ALLOCATED record is a
            // documented no-op (spec.md §4.6, §9) — defensive against
            // double-release, even though `PoolGuard`'s ownership already
            // makes that structurally unreachable. Computed before the
            // `get_mut` below so the guard doesn't need to re-borrow `state`.
            let stale = state_is_stale(&state, id);
            match state.records.get_mut(&id) {
                Some(record) if !stale => {
                    record.mark_idle(resource);
                    let fifo = self.inner.config.fifo;
                    state.push_available(id, fifo);
                }
                _ => {}
            }
        }

        self.inner.notify.notify_waiters();
        dispatch(&self.inner).await;
    }

    /// Force-retire a loaned resource. Equivalent to `PoolGuard::destroy`.
    async fn destroy_record(&self, id: RecordId, resource: F::Resource) {
        self.invalidate_and_retire(id, resource).await;
        dispatch(&self.inner).await;
    }

    /// A point-in-time snapshot of pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let size = state.size();
        let creation_in_flight = state.creation_in_flight;
        PoolStats {
            size,
            borrowed: state.borrowed(),
            available: state.available.len(),
            pending: state.waiters.size(),
            spare_capacity: self
                .inner
                .config
                .max
                .saturating_sub(size + creation_in_flight),
            creation_in_flight,
            total_created: state.total_created,
            total_destroyed: state.total_destroyed,
        }
    }

    /// `|records|`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.state.lock().size()
    }

    /// Number of records currently loaned out.
    #[must_use]
    pub fn borrowed(&self) -> usize {
        self.inner.state.lock().borrowed()
    }

    /// Number of waiters currently enqueued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.state.lock().waiters.size()
    }

    /// Configured lower bound.
    #[must_use]
    pub fn min(&self) -> usize {
        self.inner.config.min
    }

    /// Configured upper bound.
    #[must_use]
    pub fn max(&self) -> usize {
        self.inner.config.max
    }

    /// Transition `RUNNING -> DRAINING`: admit no new waiters, but let
    /// every currently-borrowed resource and currently-enqueued waiter
    /// resolve normally (including via their own acquire timeouts).
    /// Resolves once `borrowed == 0 && pending == 0`.
    pub async fn drain(&self) -> PoolResult<()> {
        {
            let mut state = self.inner.state.lock();
            if state.mode == Mode::Running {
                state.mode = Mode::Draining;
            }
        }
        self.inner.notify.notify_waiters();

        loop {
            {
                let state = self.inner.state.lock();
                if state.borrowed() == 0 && state.waiters.is_empty() {
                    break;
                }
            }
            // Bounded wait: a real notification wakes us immediately; the
            // short sleep is a safety net against a notify racing ahead of
            // this call to `notified()`.
            tokio::select! {
                () = self.inner.notify.notified() => {}
                () = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }

        Ok(())
    }

    /// Destroy every idle record via the factory and transition to
    /// `CLEARED`. Requires the pool to already be drained (`drain()` has
    /// resolved, or no resources were ever borrowed).
    pub async fn clear(&self) -> PoolResult<()> {
        let idle_ids: Vec<RecordId> = {
            let mut state = self.inner.state.lock();
            let borrowed = state.borrowed();
            if borrowed > 0 {
                return Err(PoolError::NotDrained { borrowed });
            }
            if state.mode == Mode::Running {
                state.mode = Mode::Draining;
            }
            state.available.drain(..).collect()
        };

        let destroys = idle_ids.into_iter().map(|id| {
            let pool = self.clone();
            async move {
                let resource = {
                    let mut state = pool.inner.state.lock();
                    state
                        .records
                        .get_mut(&id)
                        .and_then(|record| record.resource.take())
                };
                if let Some(resource) = resource {
                    destroy_quiet(&pool.inner.factory, resource).await;
                    let mut state = pool.inner.state.lock();
                    state.remove_record(id);
                }
            }
        });
        futures::future::join_all(destroys).await;

        {
            let mut state = self.inner.state.lock();
            state.mode = Mode::Cleared;
        }
        if let Some(evictor) = self.inner.evictor.lock().take() {
            evictor.stop();
        }
        Ok(())
    }
}

/// Whether the record at `id` is gone, or present but no longer
/// `ALLOCATED` — the two cases in which `release_record` is a no-op.
fn state_is_stale<T>(state: &PoolState<T>, id: RecordId) -> bool {
    match state.records.get(&id) {
        None => true,
        Some(record) => record.state != RecordState::Allocated,
    }
}

/// Invoked after any event that may enable matching a waiter to a
/// resource: a release, a completed creation, or a completed validation.
/// Runs until no further progress can be made (spec.md §4.5's dispatch
/// rule).
pub(crate) async fn dispatch<F: Factory>(inner: &Arc<PoolInner<F>>) {
    enum Step<T> {
        /// Resolved synchronously while the lock was held; loop again.
        Continue,
        Validate(RecordId, T),
        Create,
        Stop,
    }

    loop {
        let step = {
            let mut state = inner.state.lock();
            // `Draining` still dispatches to already-admitted waiters (and
            // may still start a creation for one); only `Cleared` halts
            // dispatch entirely. New admissions are blocked earlier, in
            // `acquire`.
            if state.mode == Mode::Cleared || state.waiters.is_empty() {
                Step::Stop
            } else if let Some(id) = state.pop_available() {
                let record = state.records.get_mut(&id).expect("available id must exist");
                let resource = record.take_for_loan();
                if inner.config.test_on_borrow {
                    record.mark_validating();
                    Step::Validate(id, resource)
                } else if let Ok(waiter) = state.waiters.dequeue() {
                    record.state = RecordState::Allocated;
                    record.last_used_at = std::time::Instant::now();
                    let mut handle = waiter.handle;
                    handle.resolve((id, resource));
                    Step::Continue
                } else {
                    // Shouldn't happen given the `is_empty` check above,
                    // but keeps the invariant safe if it ever does.
                    record.mark_idle(resource);
                    let fifo = inner.config.fifo;
                    state.push_available(id, fifo);
                    Step::Stop
                }
            } else if state.size() + state.creation_in_flight < inner.config.max {
                state.creation_in_flight += 1;
                Step::Create
            } else {
                Step::Stop
            }
        };

        match step {
            Step::Stop => break,
            Step::Continue => continue,
            Step::Validate(id, resource) => {
                let valid = inner.factory.validate(&resource).await;
                let mut state = inner.state.lock();
                if valid {
                    match state.waiters.dequeue() {
                        Ok(waiter) => {
                            if let Some(record) = state.records.get_mut(&id) {
                                record.state = RecordState::Allocated;
                                record.last_used_at = std::time::Instant::now();
                            }
                            let mut handle = waiter.handle;
                            handle.resolve((id, resource));
                        }
                        Err(_) => {
                            if let Some(record) = state.records.get_mut(&id) {
                                record.mark_idle(resource);
                            }
                            let fifo = inner.config.fifo;
                            state.push_available(id, fifo);
                        }
                    }
                    drop(state);
                    inner.notify.notify_waiters();
                } else {
                    if let Some(record) = state.records.get_mut(&id) {
                        record.mark_invalid();
                    }
                    drop(state);
                    destroy_quiet(&inner.factory, resource).await;
                    let mut state = inner.state.lock();
                    if let Some(record) = state.records.get_mut(&id) {
                        record.mark_destroyed();
                    }
                    state.remove_record(id);
                    drop(state);
                    inner.notify.notify_waiters();
                }
            }
            Step::Create => {
                let result = inner.factory.create().await;
                let mut state = inner.state.lock();
                state.creation_in_flight -= 1;
                match result {
                    Ok(resource) => {
                        let id = state.alloc_record_id();
                        match state.waiters.dequeue() {
                            Ok(waiter) => {
                                let mut record = ResourceRecord::new_creating(id);
                                record.state = RecordState::Allocated;
                                record.last_used_at = std::time::Instant::now();
                                state.records.insert(id, record);
                                state.total_created += 1;
                                let mut handle = waiter.handle;
                                handle.resolve((id, resource));
                            }
                            Err(_) => {
                                let mut record = ResourceRecord::new_creating(id);
                                record.mark_idle(resource);
                                state.records.insert(id, record);
                                state.total_created += 1;
                                let fifo = inner.config.fifo;
                                state.push_available(id, fifo);
                            }
                        }
                        drop(state);
                        inner.notify.notify_waiters();
                    }
                    Err(err) => {
                        if let Ok(waiter) = state.waiters.dequeue() {
                            let mut handle = waiter.handle;
                            handle.reject(PoolError::factory_create_failed(err));
                        }
                        drop(state);
                        inner.notify.notify_waiters();
                    }
                }
            }
        }
    }
}

/// One eviction sweep (spec.md §4.4): inspect up to `num_tests_per_run`
/// of the oldest-idle candidates and retire the ones that have exceeded
/// `idle_timeout` while `min` stays satisfied.
pub(crate) async fn run_eviction_sweep<F: Factory>(inner: &Arc<PoolInner<F>>) {
    let Some(idle_timeout) = inner.config.idle_timeout else {
        return;
    };

    let candidates: Vec<RecordId> = {
        let state = inner.state.lock();
        state
            .available
            .iter()
            .take(inner.config.num_tests_per_run)
            .copied()
            .collect()
    };

    for id in candidates {
        let to_destroy = {
            let mut state = inner.state.lock();
            if state.size() <= inner.config.min {
                break;
            }
            let Some(record) = state.records.get(&id) else {
                continue;
            };
            if record.state != RecordState::Idle || record.idle_for() < idle_timeout {
                continue;
            }
            // Remove from `available` before releasing the lock so no
            // acquire can dispatch this record while it's being destroyed.
            state.available.retain(|candidate| *candidate != id);
            let record = state.records.get_mut(&id).expect("checked above");
            record.mark_invalid();
            record.resource.take()
        };

        if let Some(resource) = to_destroy {
            destroy_quiet(&inner.factory, resource).await;
            let mut state = inner.state.lock();
            if let Some(record) = state.records.get_mut(&id) {
                record.mark_destroyed();
            }
            state.remove_record(id);
        }
    }
}
