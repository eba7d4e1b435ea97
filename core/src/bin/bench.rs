//! Push a batch of article creations through a worker pool and report
//! throughput.
//!
//! Connection settings come from `SHOPWARE_*` variables (a `.env` file is
//! honoured); flags override them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use serde_json::json;
use shopware_client::{Pool, PoolConfig, Request};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Create articles concurrently and measure throughput")]
struct Args {
    /// API endpoint, e.g. http://shop.test/api
    #[arg(long)]
    endpoint: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    key: Option<String>,
    /// Number of worker threads
    #[arg(long)]
    workers: Option<usize>,
    /// Number of articles to create
    #[arg(long, default_value_t = 1000)]
    tasks: usize,
    #[arg(long, default_value = "articles")]
    resource: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!(endpoint = %config.endpoint, workers = config.workers, tasks = args.tasks, "starting benchmark");

    let pool = Pool::new(config)?;
    let succeeded = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    {
        let succeeded = Arc::clone(&succeeded);
        pool.set_default_success_callback(move |_, _| {
            succeeded.fetch_add(1, Ordering::Relaxed);
        });
        let failed = Arc::clone(&failed);
        pool.set_default_error_callback(move |error, task| {
            failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(task_id = %task.id(), %error, "create failed");
        });
    }

    let start = Instant::now();
    for i in 0..args.tasks {
        pool.push(Request::create(&args.resource, article(i)))?;
    }
    tracing::info!(tasks = args.tasks, "all tasks queued");

    while succeeded.load(Ordering::Relaxed) + failed.load(Ordering::Relaxed) < args.tasks {
        thread::sleep(Duration::from_millis(50));
    }
    pool.shutdown_graceful();
    pool.join()?;

    let elapsed = start.elapsed().as_secs_f64();
    let ok = succeeded.load(Ordering::Relaxed);
    tracing::info!(
        succeeded = ok,
        failed = failed.load(Ordering::Relaxed),
        seconds = elapsed,
        per_second = ok as f64 / elapsed,
        "benchmark finished"
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<PoolConfig, shopware_client::Error> {
    let mut config = match (&args.endpoint, &args.user, &args.key) {
        (Some(endpoint), Some(user), Some(key)) => PoolConfig::new(endpoint, user, key),
        _ => PoolConfig::from_env()?,
    };
    if let Some(endpoint) = &args.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    if let Some(user) = &args.user {
        config.user.clone_from(user);
    }
    if let Some(key) = &args.key {
        config.key.clone_from(key);
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    Ok(config)
}

fn article(seq: usize) -> serde_json::Value {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default();
    json!({
        "name": format!("Benchmark article {seq}"),
        "tax": "19",
        "mainDetail": {
            "number": format!("sw-{stamp}-{seq}"),
            "active": true,
            "prices": [{"customerGroupKey": "EK", "price": 999}]
        }
    })
}
