//! Dispatch ordering: strict priority across classes, FIFO within a class.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use respool::{Factory, Pool, PoolConfig};
use tokio::sync::Mutex as AsyncMutex;

struct SingleUse {
    next: AtomicU64,
}

impl Factory for SingleUse {
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
async fn higher_priority_waiter_is_dispatched_first() {
    let pool = Pool::new(
        SingleUse {
            next: AtomicU64::new(0),
        },
        PoolConfig {
            max: 1,
            priority_range: 3,
            acquire_timeout: Duration::from_secs(2),
            ..Default::default()
        },
    )
    .unwrap();

    // Hold the single resource so the next three acquires queue up.
    let holder = pool.acquire(0).await.unwrap();

    let order = Arc::new(AsyncMutex::new(Vec::<&'static str>::new()));

    let pool_low = pool.clone();
    let order_low = Arc::clone(&order);
    let low = tokio::spawn(async move {
        let _g = pool_low.acquire(2).await.unwrap();
        order_low.lock().await.push("low");
    });

    tokio::time::sleep(Duration::from_millis(10)).await;

    let pool_mid = pool.clone();
    let order_mid = Arc::clone(&order);
    let mid = tokio::spawn(async move {
        let _g = pool_mid.acquire(1).await.unwrap();
        order_mid.lock().await.push("mid");
    });

    tokio::time::sleep(Duration::from_millis(10)).await;

    let pool_high = pool.clone();
    let order_high = Arc::clone(&order);
    let high = tokio::spawn(async move {
        let _g = pool_high.acquire(0).await.unwrap();
        order_high.lock().await.push("high");
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pool.pending(), 3);

    drop(holder);

    high.await.unwrap();
    mid.await.unwrap();
    low.await.unwrap();

    assert_eq!(*order.lock().await, vec!["high", "mid", "low"]);
}

#[tokio::test]
async fn fifo_within_same_priority_class() {
    let pool = Pool::new(
        SingleUse {
            next: AtomicU64::new(0),
        },
        PoolConfig {
            max: 1,
            acquire_timeout: Duration::from_secs(2),
            ..Default::default()
        },
    )
    .unwrap();

    let holder = pool.acquire(0).await.unwrap();
    let order = Arc::new(AsyncMutex::new(Vec::<u32>::new()));

    let mut handles = Vec::new();
    for i in 0..3u32 {
        let pool = pool.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _g = pool.acquire(0).await.unwrap();
            order.lock().await.push(i);
        }));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(holder);
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(*order.lock().await, vec![0, 1, 2]);
}
