//! Background sweep that retires idle resources exceeding `idle_timeout`
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::factory::Factory;
use crate::pool::PoolInner;

/// Handle to the spawned eviction task. Dropping it (or calling
/// [`EvictorHandle::stop`]) signals the task to exit after its current
/// sweep; it never blocks `acquire`/`release` — each sweep takes only
/// short critical sections on the shared pool state.
pub struct EvictorHandle {
    stopped: Arc<AtomicBool>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl EvictorHandle {
    /// Request the evictor to stop; it finishes any in-flight sweep first.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

impl Drop for EvictorHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub(crate) fn spawn<F: Factory>(inner: Arc<PoolInner<F>>) -> EvictorHandle {
    let interval = inner.config.eviction_run_interval;
    let stopped = Arc::new(AtomicBool::new(false));

    if interval.is_zero() {
        return EvictorHandle { stopped, task: None };
    }

    let stopped_task = Arc::clone(&stopped);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if stopped_task.load(Ordering::SeqCst) {
                break;
            }
            crate::pool::run_eviction_sweep(&inner).await;
        }
    });

    EvictorHandle {
        stopped,
        task: Some(task),
    }
}
