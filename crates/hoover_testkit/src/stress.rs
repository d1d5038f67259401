//! Stress helpers for the admission pipeline.
//!
//! These drive a running pipeline with interleaved bursts from several
//! producers and check the pack layout afterwards.

use crate::fixtures::{sticker, test_config, TestPipeline};
use hoover_core::{MediaKind, PackDirectory};
use hoover_engine::{PipelineConfig, StatsSnapshot};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Items offered by all producers.
    pub offered: usize,
    /// Items the queue refused.
    pub rejected: usize,
    /// Final pipeline counters.
    pub stats: StatsSnapshot,
    /// Packs created, in creation order.
    pub packs: Vec<String>,
    /// Total duration.
    pub duration: Duration,
}

impl StressResult {
    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Offered: {}", self.offered);
        println!("Rejected: {}", self.rejected);
        println!("Admitted: {}", self.stats.admitted);
        println!("Packs: {}", self.packs.len());
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent producers.
    pub producers: usize,
    /// Items per producer.
    pub items_per_producer: usize,
    /// Distinct ids shared by all producers.
    pub id_pool: usize,
    /// Static pack capacity.
    pub static_capacity: u32,
    /// Worker count.
    pub concurrency: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 4,
            items_per_producer: 100,
            id_pool: 150,
            static_capacity: 7,
            concurrency: 3,
            queue_capacity: 50,
        }
    }
}

/// Runs interleaved producers against a pipeline and drains it.
///
/// Producers yield between submissions so workers get to run; some items
/// are still refused when the queue fills up.
pub async fn run_burst(config: &StressConfig) -> StressResult {
    let pipeline = TestPipeline::start(
        test_config(config.static_capacity, 50),
        PipelineConfig::immediate()
            .with_concurrency(config.concurrency)
            .with_queue_capacity(config.queue_capacity),
    )
    .await;

    let start = Instant::now();
    let mut rejected = 0;
    for round in 0..config.items_per_producer {
        for producer in 0..config.producers {
            let n = (round * config.producers + producer) % config.id_pool.max(1);
            if pipeline
                .handle
                .submit(sticker(&format!("uid-{n}"), MediaKind::Static))
                .is_err()
            {
                rejected += 1;
            }
        }
        tokio::task::yield_now().await;
    }

    let directory = pipeline.directory.clone();
    let report = pipeline.handle.drain().await;

    StressResult {
        offered: config.producers * config.items_per_producer,
        rejected,
        stats: report.stats,
        packs: directory.created_packs(),
        duration: start.elapsed(),
    }
}

/// Checks that no pack in `directory` exceeds `capacity` and no id appears
/// twice. Returns the number of placed items.
pub async fn verify_layout<D: PackDirectory + ?Sized>(
    directory: &D,
    packs: &[String],
    capacity: u32,
) -> Result<usize, String> {
    let mut seen = HashSet::new();
    for name in packs {
        let pack = directory
            .fetch(name)
            .await
            .map_err(|err| format!("fetch {name}: {err}"))?;
        if pack.members.len() as u32 > capacity {
            return Err(format!(
                "{name} holds {} members, capacity {capacity}",
                pack.members.len()
            ));
        }
        for id in pack.members {
            if !seen.insert(id.clone()) {
                return Err(format!("{id} placed twice"));
            }
        }
    }
    Ok(seen.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoover_core::MemoryDirectory;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn burst_keeps_packs_within_capacity() {
        let config = StressConfig::default();
        let pipeline = TestPipeline::start(
            test_config(config.static_capacity, 50),
            PipelineConfig::immediate().with_concurrency(config.concurrency),
        )
        .await;

        for n in 0..40 {
            pipeline
                .handle
                .submit(sticker(&format!("uid-{n}"), MediaKind::Static))
                .unwrap();
        }
        let directory: Arc<MemoryDirectory> = pipeline.directory.clone();
        let report = pipeline.handle.drain().await;

        let packs = directory.created_packs();
        let placed = verify_layout(directory.as_ref(), &packs, config.static_capacity)
            .await
            .unwrap();
        assert_eq!(placed, 40);
        assert_eq!(report.stats.admitted, 40);
        assert_eq!(packs.len(), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn burst_accounts_for_every_offer() {
        let config = StressConfig::default();
        let result = run_burst(&config).await;
        result.print_summary("burst");

        let accepted = (result.offered - result.rejected) as u64;
        assert_eq!(result.stats.queued, accepted);
        assert_eq!(result.stats.rejected as usize, result.rejected);
        assert_eq!(
            result.stats.duplicates + result.stats.admitted + result.stats.failed,
            result.stats.queued
        );
        assert!(result.stats.admitted as usize <= config.id_pool);
    }
}
