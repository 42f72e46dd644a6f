//! Expiring Cache demo
//!
//! Walks through the LRU and TTL caches and logs what happens at each step.
//! Set `RUST_LOG` to change verbosity, e.g. `RUST_LOG=expiring_cache=debug`.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use expiring_cache::{LruCache, TtlCache, TtlConfig};

/// Runs the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Exercise LRU eviction and recency
/// 3. Exercise TTL expiry, extension and the background reaper
/// 4. Shut the TTL cache down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "expiring_cache=info,expiring_cache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    lru_demo()?;
    ttl_demo().await?;

    info!("Demo complete");
    Ok(())
}

fn lru_demo() -> anyhow::Result<()> {
    info!("LRU cache: capacity 3");
    let mut cache = LruCache::new(3)?;

    cache.put("apple", 1);
    cache.put("banana", 2);
    cache.put("cherry", 3);
    info!("After three puts: {}", cache);

    cache.get("apple");
    info!("After reading apple: {}", cache);

    cache.put("date", 4);
    info!("After inserting date (banana evicted): {}", cache);

    info!(
        "LRU stats: {}",
        serde_json::to_string(&cache.stats()).context("serializing LRU stats")?
    );
    Ok(())
}

async fn ttl_demo() -> anyhow::Result<()> {
    let config = TtlConfig::new(
        Duration::from_millis(200),
        true,
        Duration::from_millis(100),
    );
    info!("TTL cache: {:?}", config);
    let cache: TtlCache<String, String> = TtlCache::with_config(config)?;

    cache.put("session1".to_string(), "user123".to_string());
    cache.put_with_ttl(
        "session2".to_string(),
        "user456".to_string(),
        Duration::from_secs(2),
    );
    info!(
        "session1 = {:?}, remaining {:?}",
        cache.get("session1"),
        cache.remaining_ttl("session1")
    );

    cache.extend_ttl("session2", Duration::from_secs(1));
    info!(
        "session2 extended, remaining {:?}",
        cache.remaining_ttl("session2")
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    info!(
        "After 400ms: session1 = {:?}, stored entries = {}",
        cache.get("session1"),
        cache.size()
    );
    info!("After reaping: {}", cache);

    info!(
        "TTL stats: {}",
        serde_json::to_string_pretty(&cache.stats()).context("serializing TTL stats")?
    );

    cache.shutdown().await;
    info!("TTL cache shut down, size = {}", cache.size());
    Ok(())
}
