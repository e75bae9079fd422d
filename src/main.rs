use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use webmon::config::{load_config, ObserverConfig};
use webmon::page::Page;
use webmon::transport::PageId;
use webmon::Observer;

/// Instruments a simulated page and prints what the observer sees.
#[derive(Debug, Parser)]
#[command(name = "webmon")]
struct Args {
    /// TOML file with observer settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// How often to print the report, in milliseconds
    #[arg(long, default_value_t = 1000)]
    refresh_ms: u64,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ObserverConfig::default(),
    };
    tracing::info!(?config, "webmon observer starting");

    // Page side
    let page = Page::new();
    let requests = page.counter("requests")?;
    requests
        .set_description("Requests handled")
        .calc_rate_over("s")?;
    let queue = page.counter("queue_depth")?;
    queue.set_description("Jobs waiting");
    let render = page.timer("render")?;
    render.set_description("Average render time");

    let shutdown = CancellationToken::new();
    let workload = tokio::spawn(simulate(requests, queue, render, shutdown.clone()));

    // Observer side
    let observer = Arc::new(Observer::new(config));
    let page_id = PageId::new();
    let (connection, page_handle) = page.connect(page_id);
    observer.connect(connection);

    let scheduler = {
        let observer = Arc::clone(&observer);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { observer.run(shutdown).await })
    };

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut refresh = tokio::time::interval(Duration::from_millis(args.refresh_ms.max(1)));
    refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = refresh.tick() => match observer.report(page_id) {
                Some(report) => println!("{}", report),
                None => println!("{} not connected", page_id),
            },
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
        }
    }

    tracing::info!("webmon shutting down");
    shutdown.cancel();
    page_handle.shutdown().await;
    let _ = workload.await;
    let _ = scheduler.await;
    Ok(())
}

async fn simulate(
    requests: webmon::Counter,
    queue: webmon::Counter,
    render: webmon::Timer,
    shutdown: CancellationToken,
) {
    let mut step: u64 = 0;
    let mut cadence = tokio::time::interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = cadence.tick() => {}
        }
        step += 1;
        requests.incr();
        queue.set((step % 7) as f64);
        render.measure(|| {
            let mut acc: u64 = 0;
            for i in 0..(10_000 + (step % 5) * 5_000) {
                acc = acc.wrapping_add(i * i);
            }
            std::hint::black_box(acc)
        });
    }
}
