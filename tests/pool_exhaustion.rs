//! Behavior at and beyond pool capacity: timeouts, cancellation, creation
//! errors surfaced to the specific waiter that triggered them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use respool::{Factory, Pool, PoolConfig, PoolError};

struct Counting {
    next: AtomicU64,
}

impl Factory for Counting {
    type Resource = u64;
    type Error = std::convert::Infallible;

    async fn create(&self) -> Result<u64, Self::Error> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _resource: u64) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[tokio::test]
async fn acquire_beyond_max_times_out_and_removes_waiter() {
    let pool = Pool::new(
        Counting {
            next: AtomicU64::new(0),
        },
        PoolConfig {
            max: 1,
            acquire_timeout: Duration::from_millis(40),
            ..Default::default()
        },
    )
    .unwrap();

    let _guard = pool.acquire(0).await.unwrap();
    let err = pool.acquire(0).await.unwrap_err();
    assert!(matches!(err, PoolError::AcquireTimeout { .. }));
    assert_eq!(pool.pending(), 0, "timed-out waiter must not linger in the queue");
}

#[tokio::test]
async fn timed_out_waiter_does_not_stop_its_earmarked_creation() {
    // max=2 so a second waiter can trigger a creation while the first
    // resource is held; the first waiter's timeout must not cancel that
    // in-flight creation (spec'd: the timed-out waiter is only removed
    // from the queue, "the creation still runs").
    let pool = Pool::new(
        Counting {
            next: AtomicU64::new(0),
        },
        PoolConfig {
            max: 2,
            acquire_timeout: Duration::from_millis(30),
            ..Default::default()
        },
    )
    .unwrap();

    let _holder = pool.acquire(0).await.unwrap();
    let err = pool.acquire(0).await.unwrap_err();
    assert!(matches!(err, PoolError::AcquireTimeout { .. }));

    // The creation dispatch triggered for the timed-out waiter still
    // completes in the background; a fresh acquire should be able to
    // reuse the resulting record rather than creating a third one.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = pool.acquire(0).await.unwrap();
    drop(second);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(pool.size() <= 2);
}

struct AlwaysFailsToCreate;

#[derive(Debug, thiserror::Error)]
#[error("factory exhausted upstream capacity")]
struct CreateFailed;

impl Factory for AlwaysFailsToCreate {
    type Resource = ();
    type Error = CreateFailed;

    async fn create(&self) -> Result<(), Self::Error> {
        Err(CreateFailed)
    }

    async fn destroy(&self, _resource: ()) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[tokio::test]
async fn creation_failure_surfaces_to_the_waiting_caller() {
    let pool = Pool::new(
        AlwaysFailsToCreate,
        PoolConfig {
            max: 1,
            min: 0,
            acquire_timeout: Duration::from_millis(200),
            ..Default::default()
        },
    )
    .unwrap();

    let err = pool.acquire(0).await.unwrap_err();
    assert!(matches!(err, PoolError::FactoryCreateFailed { .. }));
    assert!(err.is_retryable());
}
