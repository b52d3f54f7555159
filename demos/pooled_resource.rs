// Advanced pooled resource example.
//
// Demonstrates LIFO recycling, `test_on_return` validation, priority
// classes, and the two-phase drain/clear shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use respool::{Factory, Pool, PoolConfig};

/// Simulated database connection.
#[derive(Debug)]
struct DbConnection {
    id: u64,
    query_count: u64,
}

struct DbResource {
    next_id: AtomicU64,
}

impl Factory for DbResource {
    type Resource = DbConnection;
    type Error = std::convert::Infallible;

    async fn create(&self) -> Result<DbConnection, Self::Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        println!("  [create] new connection #{id}");
        Ok(DbConnection { id, query_count: 0 })
    }

    async fn destroy(&self, conn: DbConnection) -> Result<(), Self::Error> {
        println!("  [destroy] closing connection #{}", conn.id);
        Ok(())
    }

    /// Reject connections that have served too many queries, so they get
    /// retired on return instead of handed back out.
    async fn validate(&self, conn: &DbConnection) -> bool {
        conn.query_count < 100
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== Advanced Pooled Resource Example ===\n");

    // LIFO recycling (fifo = false) keeps a hot working set warm; priority
    // classes let latency-sensitive callers jump the queue under contention.
    let pool_config = PoolConfig {
        min: 2,
        max: 8,
        acquire_timeout: Duration::from_secs(5),
        idle_timeout: Some(Duration::from_secs(120)),
        eviction_run_interval: Duration::from_secs(30),
        fifo: false,
        priority_range: 2,
        test_on_return: true,
        ..Default::default()
    };

    println!("Pool config:");
    println!("  recycling: LIFO (hot working set)");
    println!("  min: {}, max: {}", pool_config.min, pool_config.max);
    println!("  eviction sweep: every 30s\n");

    let resource = DbResource {
        next_id: AtomicU64::new(1),
    };
    let pool = Pool::new(resource, pool_config)?;
    println!("Pool created\n");

    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("Acquiring connections...");
    let mut conn1 = pool.acquire(0).await?;
    conn1.query_count += 5;
    println!("  conn #{}: ran {} queries", conn1.id, conn1.query_count);

    let mut conn2 = pool.acquire(1).await?;
    conn2.query_count += 3;
    println!("  conn #{}: ran {} queries", conn2.id, conn2.query_count);

    let first_id = conn1.id;
    drop(conn1);
    drop(conn2);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // With LIFO return order, the next acquire gets the most recently
    // released connection back.
    let conn3 = pool.acquire(0).await?;
    println!(
        "  LIFO re-acquired conn #{} (most recently released was #{})",
        conn3.id, first_id
    );

    drop(conn3);
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("\nPool stats: {:?}", pool.stats());

    pool.drain().await?;
    pool.clear().await?;
    println!("\nPool shut down cleanly.");

    Ok(())
}
