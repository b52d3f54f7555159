//! Factory destroy failures never propagate; `clear()` refuses to run
//! while resources are still borrowed.

use std::sync::atomic::{AtomicUsize, Ordering};

use respool::{Factory, Pool, PoolConfig, PoolError};

#[derive(Debug, thiserror::Error)]
#[error("destroy always fails in this test")]
struct DestroyFailed;

struct FlakyDestroy {
    destroy_attempts: AtomicUsize,
}

impl Factory for FlakyDestroy {
    type Resource = u32;
    type Error = DestroyFailed;

    async fn create(&self) -> Result<u32, Self::Error> {
        Ok(7)
    }

    async fn destroy(&self, _resource: u32) -> Result<(), Self::Error> {
        self.destroy_attempts.fetch_add(1, Ordering::SeqCst);
        Err(DestroyFailed)
    }
}

#[tokio::test]
async fn destroy_failure_is_swallowed_and_record_still_removed() {
    let pool = Pool::new(
        FlakyDestroy {
            destroy_attempts: AtomicUsize::new(0),
        },
        PoolConfig {
            max: 1,
            ..Default::default()
        },
    )
    .unwrap();

    let guard = pool.acquire(0).await.unwrap();
    guard.destroy().await;
    assert_eq!(pool.size(), 0, "record is removed even though destroy() errored");
}

#[tokio::test]
async fn clear_rejects_while_any_resource_is_borrowed() {
    struct Simple(AtomicUsize);

    impl Factory for Simple {
        type Resource = usize;
        type Error = std::convert::Infallible;

        async fn create(&self) -> Result<usize, Self::Error> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst))
        }

        async fn destroy(&self, _resource: usize) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    let pool = Pool::new(
        Simple(AtomicUsize::new(0)),
        PoolConfig {
            max: 1,
            ..Default::default()
        },
    )
    .unwrap();

    let guard = pool.acquire(0).await.unwrap();
    let err = pool.clear().await.unwrap_err();
    assert!(matches!(err, PoolError::NotDrained { borrowed: 1 }));

    drop(guard);
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    pool.drain().await.unwrap();
    pool.clear().await.unwrap();
}
