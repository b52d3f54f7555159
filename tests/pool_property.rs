//! Property tests for pool acquire/release invariants.
//!
//! After any sequence of acquire/release cycles, `size <= max` always holds,
//! and once every guard is dropped `borrowed` returns to zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use proptest::prelude::*;
use respool::{Factory, Pool, PoolConfig};

struct CountingFactory {
    counter: AtomicU64,
}

impl CountingFactory {
    fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Factory for CountingFactory {
    type Resource = u64;
    type Error = std::convert::Infallible;

    async fn create(&self) -> Result<u64, Self::Error> {
        Ok(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    async fn destroy(&self, _resource: u64) -> Result<(), Self::Error> {
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn size_never_exceeds_max(
        max in 1usize..8,
        ops in proptest::collection::vec(prop_oneof![Just(true), Just(false)], 1..30),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let pool = Pool::new(
                CountingFactory::new(),
                PoolConfig {
                    max,
                    acquire_timeout: Duration::from_millis(50),
                    ..Default::default()
                },
            )
            .unwrap();
            let mut guards = Vec::new();

            for op_is_acquire in &ops {
                if *op_is_acquire {
                    if let Ok(guard) = pool.acquire(0).await {
                        guards.push(guard);
                    }
                } else if !guards.is_empty() {
                    guards.pop();
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }

                prop_assert!(
                    pool.size() <= max,
                    "invariant violated: size={} > max={}",
                    pool.size(), max,
                );
            }

            drop(guards);
            tokio::time::sleep(Duration::from_millis(50)).await;

            prop_assert!(pool.size() <= max);
            prop_assert_eq!(pool.borrowed(), 0, "all guards dropped, borrowed should be 0");

            Ok(())
        })?;
    }
}

#[tokio::test]
async fn rapid_acquire_release_preserves_invariants() {
    let max = 4;
    let pool = Pool::new(
        CountingFactory::new(),
        PoolConfig {
            max,
            acquire_timeout: Duration::from_millis(200),
            ..Default::default()
        },
    )
    .unwrap();

    for _ in 0..20 {
        let g = pool.acquire(0).await.unwrap();
        drop(g);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(pool.size() <= max, "invariant violated during rapid cycling");
    }
}

#[tokio::test]
async fn created_and_destroyed_records_conserve_on_clear() {
    let pool = Pool::new(
        CountingFactory::new(),
        PoolConfig {
            max: 3,
            min: 2,
            ..Default::default()
        },
    )
    .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut guards = Vec::new();
    for _ in 0..3 {
        guards.push(pool.acquire(0).await.unwrap());
    }
    assert_eq!(pool.borrowed(), 3);

    drop(guards);
    tokio::time::sleep(Duration::from_millis(30)).await;

    pool.drain().await.unwrap();
    pool.clear().await.unwrap();
    assert_eq!(pool.size(), 0);
}
