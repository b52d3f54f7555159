//! Simple pool usage: a tiny in-memory "connection" resource, acquired
//! and released through a default-configured pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use respool::{Factory, Pool, PoolConfig};

struct Connection {
    id: u64,
}

struct ConnectionFactory {
    next_id: AtomicU64,
}

impl Factory for ConnectionFactory {
    type Resource = Connection;
    type Error = std::convert::Infallible;

    async fn create(&self) -> Result<Connection, Self::Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(Connection { id })
    }

    async fn destroy(&self, conn: Connection) -> Result<(), Self::Error> {
        println!("  [destroy] closing connection #{}", conn.id);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Resource Pool Example ===\n");

    let config = PoolConfig {
        min: 2,
        max: 10,
        acquire_timeout: Duration::from_secs(5),
        ..Default::default()
    };

    let factory = ConnectionFactory {
        next_id: AtomicU64::new(0),
    };
    let pool = Pool::new(factory, config)?;
    println!("Pool created with min=2, max=10\n");

    // Give the pre-warm a moment to finish.
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("Acquiring resource...");
    let conn = pool.acquire(0).await?;
    println!("Resource acquired: connection #{}\n", conn.id);

    let stats = pool.stats();
    println!("Pool statistics:");
    println!("  size: {}", stats.size);
    println!("  borrowed: {}", stats.borrowed);
    println!("  available: {}", stats.available);
    println!("  pending: {}\n", stats.pending);

    drop(conn);
    tokio::time::sleep(Duration::from_millis(20)).await;
    println!("Resource released\n");

    let final_stats = pool.stats();
    println!("Final statistics:");
    println!("  size: {}", final_stats.size);
    println!("  available: {}", final_stats.available);

    pool.drain().await?;
    pool.clear().await?;
    println!("\n=== Example completed! ===");

    Ok(())
}
