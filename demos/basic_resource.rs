// Minimal resource example: an in-memory cache.
//
// Shows how to implement the `Factory` trait with a simple HashMap cache,
// then acquire and use it through a `Pool`.

use std::collections::HashMap;
use std::time::Duration;

use respool::{Factory, Pool, PoolConfig};

/// A factory that produces HashMap-based caches, each capped at a fixed
/// capacity. `validate` rejects a cache once it has grown too large,
/// so an overgrown instance is retired instead of recycled.
struct InMemoryCache {
    max_entries: usize,
}

impl Factory for InMemoryCache {
    type Resource = HashMap<String, String>;
    type Error = std::convert::Infallible;

    async fn create(&self) -> Result<Self::Resource, Self::Error> {
        Ok(HashMap::with_capacity(self.max_entries))
    }

    async fn destroy(&self, _instance: Self::Resource) -> Result<(), Self::Error> {
        // Nothing to do for an in-memory HashMap.
        Ok(())
    }

    async fn validate(&self, instance: &Self::Resource) -> bool {
        instance.len() < self.max_entries
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== Basic Resource Example: InMemoryCache ===\n");

    let pool_config = PoolConfig {
        min: 1,
        max: 4,
        acquire_timeout: Duration::from_secs(5),
        test_on_borrow: true,
        ..Default::default()
    };

    let pool = Pool::new(InMemoryCache { max_entries: 1024 }, pool_config)?;
    println!("Pool created (min=1, max=4)");

    let mut cache = pool.acquire(0).await?;
    println!("Cache acquired");

    cache.insert("greeting".into(), "hello, respool!".into());
    println!("Cached: greeting -> {}", cache.get("greeting").unwrap());

    drop(cache);
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("Cache returned to pool (stats: {:?})", pool.stats());

    pool.drain().await?;
    pool.clear().await?;
    println!("Pool shut down");

    Ok(())
}
