//! yieldpool-demo — drains a batch of nested tasks and prints the results.
//!
//! Spawns `--fanout` expander tasks. Expander `i` sleeps a little, then
//! spawns `i` leaf tasks that each sleep and return a number. Every value
//! is printed as soon as the drain releases it.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use yieldpool::{load_dotenv, YieldConfig, Yielder};

// ── CLI ─────────────────────────────────────────────────────────────

/// Drain a dynamically growing batch of async tasks through an iterator.
#[derive(Parser, Debug)]
#[command(name = "yieldpool-demo", version, about)]
struct Cli {
    /// Maximum tasks running at once (unbounded when omitted).
    #[arg(long, env = "YIELDPOOL_POOL_SIZE")]
    pool_size: Option<usize>,

    /// Release results in spawn order.
    #[arg(long, env = "YIELDPOOL_ORDERED")]
    ordered: bool,

    /// Number of expander tasks.
    #[arg(long, default_value_t = 10)]
    fanout: usize,

    /// Upper bound for the per-task sleep, in milliseconds.
    #[arg(long, default_value_t = 100)]
    max_delay_ms: u64,
}

/// Cheap deterministic spread of delays in `[0, max)`.
fn delay_for(a: usize, b: usize, max: u64) -> Duration {
    if max == 0 {
        return Duration::ZERO;
    }
    let mixed = (a as u64).wrapping_mul(2_654_435_761) ^ (b as u64).wrapping_mul(40_503);
    Duration::from_millis(mixed % max)
}

fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = YieldConfig {
        pool_size: None,
        ordered: cli.ordered,
    };
    if let Some(n) = cli.pool_size {
        config = config.with_pool_size(n);
    }
    config.log_summary();

    let mut yielder = Yielder::<f64>::new(config).context("failed to create yielder")?;
    let max = cli.max_delay_ms;

    for i in 0..cli.fanout {
        let spawner = yielder.spawner();
        yielder.spawn_unit(async move {
            tokio::time::sleep(delay_for(i, 0, max)).await;
            for j in 0..i {
                let value = j as f64 + (i as f64) / 100.0;
                let delay = delay_for(i, j + 1, max);
                if let Err(e) = spawner.spawn(async move {
                    tokio::time::sleep(delay).await;
                    value
                }) {
                    tracing::warn!(error = %e, "could not spawn leaf task");
                }
            }
        })?;
    }

    let t0 = Instant::now();
    let mut count = 0usize;
    for item in yielder.drain() {
        let value = item.context("task failed")?;
        println!("{value:.2}");
        count += 1;
    }

    info!(count, elapsed_ms = t0.elapsed().as_millis() as u64, "drain finished");
    Ok(())
}
