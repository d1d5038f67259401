//! Replay command implementation.
//!
//! Feeds a JSON-lines item stream through a real pipeline whose pack
//! directory lives in memory, then prints the status report and the most
//! recent events.

use hoover_core::{HooverConfig, Item, MemoryDirectory, RolloverMachine};
use hoover_engine::{
    bootstrap, EngineError, LogNotifier, PipelineBuilder, PipelineConfig, PipelineHandle,
};
use hoover_storage::{FileStore, MemoryStore, StateStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Replay settings beyond the core configuration.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// State file to read and update; blank in-memory state when `None`.
    pub state_file: Option<PathBuf>,
    /// Submit without waiting when the queue is full.
    pub burst: bool,
    /// Number of workers.
    pub concurrency: usize,
    /// Skip the pacing delay.
    pub no_pacing: bool,
    /// Number of recent events to print.
    pub events: usize,
}

/// Parses one item per non-blank line.
pub fn parse_items(text: &str) -> Result<Vec<Item>, Box<dyn std::error::Error>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str::<Item>(line).map_err(|err| -> Box<dyn std::error::Error> {
                format!("line {}: {err}", n + 1).into()
            })
        })
        .collect()
}

/// Runs the replay command.
pub async fn run(
    input: &Path,
    config: HooverConfig,
    options: ReplayOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let items = parse_items(&std::fs::read_to_string(input)?)?;

    let store: Arc<dyn StateStore> = match &options.state_file {
        Some(path) => Arc::new(FileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let directory = Arc::new(MemoryDirectory::with_limits(
        config.static_capacity,
        config.animated_capacity,
    ));

    let mut pipeline = PipelineConfig::new().with_concurrency(options.concurrency);
    let capacity = pipeline.queue_capacity;
    if options.no_pacing {
        pipeline = pipeline.with_pacing_delay(Duration::ZERO);
    }

    let machine = RolloverMachine::load(config, directory, store)?;
    let bootstrapped = bootstrap(machine).await?;
    let report = bootstrapped.report();
    println!(
        "Bootstrap: {} packs seeded ({} new ids), {} missing",
        report.seeded.len(),
        report.new_ids,
        report.missing.len()
    );

    let handle = PipelineBuilder::new(bootstrapped)
        .with_config(pipeline)
        .with_notifier(Arc::new(LogNotifier))
        .start()?;

    let rejected = feed(&handle, items, capacity, options.burst).await?;
    println!("Submitted, {rejected} rejected");

    handle.wait_idle().await;
    println!();
    println!("{}", handle.status());
    println!();
    println!("Recent events:");
    for entry in handle.recent_events(options.events) {
        println!("  [{:>5}] {}", entry.seq, entry.event);
    }

    let shutdown = handle.drain().await;
    if shutdown.abandoned > 0 {
        println!("{} items abandoned", shutdown.abandoned);
    }
    Ok(())
}

/// Submits every item. Unless `burst` is set, waits for the workers to
/// catch up whenever the queue is full. Returns the number of rejected
/// items.
async fn feed(
    handle: &PipelineHandle<MemoryDirectory>,
    items: Vec<Item>,
    capacity: usize,
    burst: bool,
) -> Result<usize, EngineError> {
    let mut rejected = 0;
    for item in items {
        if !burst && handle.queue_depth() >= capacity {
            handle.wait_idle().await;
        }
        match handle.submit(item) {
            Ok(()) => {}
            Err(EngineError::QueueFull { .. }) => rejected += 1,
            Err(err) => return Err(err),
        }
    }
    Ok(rejected)
}
