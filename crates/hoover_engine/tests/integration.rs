//! End-to-end tests for bootstrap and the admission pipeline.

use hoover_core::{
    ContentId, DirectoryError, DirectoryOp, HooverConfig, Item, MediaKind, MemoryDirectory,
    OwnerId, PackKind, RolloverMachine,
};
use hoover_engine::{
    bootstrap, MockNotifier, Outcome, PipelineBuilder, PipelineConfig, PipelineEvent,
    PipelineHandle, ResizeFailurePolicy,
};
use hoover_storage::{FileStore, MemoryStore, StateStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

struct Rig {
    dir: Arc<MemoryDirectory>,
    notifier: Arc<MockNotifier>,
    handle: PipelineHandle<MemoryDirectory>,
}

async fn rig_with(
    core: HooverConfig,
    pipeline: PipelineConfig,
    dir: Arc<MemoryDirectory>,
    store: Arc<dyn StateStore>,
) -> Rig {
    let notifier = Arc::new(MockNotifier::new());
    let machine = RolloverMachine::load(core, Arc::clone(&dir), store).unwrap();
    let bootstrapped = bootstrap(machine).await.unwrap();
    let handle = PipelineBuilder::new(bootstrapped)
        .with_config(pipeline)
        .with_notifier(notifier.clone())
        .start()
        .unwrap();
    Rig {
        dir,
        notifier,
        handle,
    }
}

async fn rig(static_cap: u32, animated_cap: u32) -> Rig {
    let core = HooverConfig::new(OwnerId(1), "bot").with_capacities(static_cap, animated_cap);
    let dir = Arc::new(MemoryDirectory::with_limits(static_cap, animated_cap));
    rig_with(
        core,
        PipelineConfig::immediate().with_concurrency(1),
        dir,
        Arc::new(MemoryStore::new()),
    )
    .await
}

fn sticker(id: &str, kind: MediaKind) -> Item {
    Item::new(id, format!("file-{id}"), kind)
}

fn ids(raw: &[&str]) -> Vec<ContentId> {
    raw.iter().map(|s| ContentId::from(*s)).collect()
}

#[tokio::test]
async fn capacity_rollover_scenario() {
    let Rig {
        dir,
        notifier,
        handle,
    } = rig(2, 50).await;

    for id in ["A", "B", "C"] {
        handle.submit(sticker(id, MediaKind::Static)).unwrap();
    }
    handle.wait_idle().await;
    assert_eq!(handle.state().index(), 2);
    assert_eq!(handle.state().member_count(), 1);

    let report = handle.drain().await;
    assert_eq!(report.stats.admitted, 3);
    assert_eq!(report.stats.packs_created, 2);

    assert_eq!(dir.members("stickies_1_by_bot").unwrap(), ids(&["A", "B"]));
    assert_eq!(dir.members("stickies_2_by_bot").unwrap(), ids(&["C"]));
    assert_eq!(
        notifier.announced_packs(),
        vec!["stickies_1_by_bot".to_string(), "stickies_2_by_bot".to_string()]
    );
}

#[tokio::test]
async fn kind_switch_scenario() {
    let rig = rig(120, 50).await;
    rig.handle.submit(sticker("S", MediaKind::Static)).unwrap();
    rig.handle.submit(sticker("D", MediaKind::Animated)).unwrap();

    rig.handle.wait_idle().await;
    let state = rig.handle.state();
    rig.handle.drain().await;

    assert_eq!(state.current_kind(), Some(PackKind::Animated));
    assert_eq!(state.member_count(), 1);
    assert_eq!(state.index(), 2);
    assert_eq!(rig.dir.created_packs().len(), 2);
}

#[tokio::test]
async fn reference_duplicate_is_discarded_silently() {
    let core = HooverConfig::new(OwnerId(1), "bot").with_reference_packs(vec!["refs".into()]);
    let dir = Arc::new(MemoryDirectory::new());
    dir.insert_pack("refs", PackKind::Static, &["X"]);
    let store = Arc::new(MemoryStore::new());
    let rig = rig_with(core, PipelineConfig::immediate(), Arc::clone(&dir), store.clone()).await;
    let writes_after_bootstrap = store.writes();

    rig.handle.submit(sticker("X", MediaKind::Static)).unwrap();
    let report = rig.handle.drain().await;

    assert_eq!(report.stats.duplicates, 1);
    assert_eq!(report.stats.processed, 0);
    assert!(rig.notifier.sent().is_empty());
    assert_eq!(dir.create_calls() + dir.append_calls() + dir.exists_calls(), 0);
    assert_eq!(store.writes(), writes_after_bootstrap);
}

#[tokio::test]
async fn vanished_pack_recovery_scenario() {
    let rig = rig(120, 50).await;
    rig.handle.submit(sticker("A", MediaKind::Static)).unwrap();
    rig.handle.wait_idle().await;
    assert!(rig.dir.vanish("stickies_1_by_bot"));

    rig.handle.submit(sticker("B", MediaKind::Static)).unwrap();
    rig.handle.wait_idle().await;
    let state = rig.handle.state();
    let ledger = rig.handle.ledger().clone();
    let events: Vec<_> = rig
        .handle
        .recent_events(50)
        .into_iter()
        .map(|e| e.event)
        .collect();
    let report = rig.handle.drain().await;

    assert_eq!(state.current_pack(), Some("stickies_2_by_bot"));
    assert_eq!(state.member_count(), 1);
    assert_eq!(state.index(), 2);
    assert!(ledger.contains(&"B".into()));
    assert_eq!(report.stats.recoveries, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::PackVanished { replacement, .. } if replacement == "stickies_2_by_bot"
    )));
}

#[tokio::test]
async fn transient_failure_is_acknowledged_and_retryable() {
    let rig = rig(120, 50).await;
    rig.dir
        .fail_next(DirectoryOp::Create, DirectoryError::transient("FLOOD_WAIT"));

    rig.handle.submit(sticker("A", MediaKind::Static)).unwrap();
    rig.handle.wait_idle().await;
    assert!(!rig.handle.ledger().contains(&"A".into()));

    rig.handle.submit(sticker("A", MediaKind::Static)).unwrap();
    let report = rig.handle.drain().await;

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.admitted, 1);
    let acks = rig.notifier.acks_for(&"A".into());
    assert!(matches!(&acks[0], Outcome::Failed { reason } if reason.contains("FLOOD_WAIT")));
    assert!(acks[1].is_success());
}

#[tokio::test]
async fn oversized_static_without_resizer_fails_softly() {
    let rig = rig(120, 50).await;
    rig.dir.insert_file("file-big", bytes::Bytes::from_static(b"png"));
    let big = sticker("big", MediaKind::Static).with_dimensions(1024, 1024);

    rig.handle.submit(big.clone()).unwrap();
    rig.handle.submit(big).unwrap();
    let report = rig.handle.drain().await;

    // Retry policy: the re-delivery is attempted and fails again.
    assert_eq!(report.stats.failed, 2);
    assert_eq!(rig.notifier.acks_for(&"big".into()).len(), 2);
    assert!(rig.dir.created_packs().is_empty());
}

#[tokio::test]
async fn permanent_policy_drops_redelivery() {
    let core = HooverConfig::new(OwnerId(1), "bot");
    let pipeline = PipelineConfig::immediate()
        .with_concurrency(1)
        .with_resize_failure_policy(ResizeFailurePolicy::Permanent);
    let dir = Arc::new(MemoryDirectory::new());
    dir.insert_file("file-big", bytes::Bytes::from_static(b"png"));
    let rig = rig_with(core, pipeline, dir, Arc::new(MemoryStore::new())).await;
    let big = sticker("big", MediaKind::Static).with_dimensions(600, 100);

    rig.handle.submit(big.clone()).unwrap();
    rig.handle.submit(big).unwrap();
    let ledger = rig.handle.ledger().clone();
    let report = rig.handle.drain().await;

    assert_eq!(report.stats.failed, 1);
    assert_eq!(rig.notifier.acks_for(&"big".into()).len(), 1);
    assert!(!ledger.contains(&"big".into()));
}

#[tokio::test]
async fn breaker_pauses_after_failures() {
    let core = HooverConfig::new(OwnerId(1), "bot");
    let pipeline = PipelineConfig::immediate()
        .with_concurrency(1)
        .with_max_error_rate(0.0);
    let dir = Arc::new(MemoryDirectory::new());
    dir.fail_next(DirectoryOp::Create, DirectoryError::transient("boom"));
    let rig = rig_with(core, pipeline, dir, Arc::new(MemoryStore::new())).await;

    rig.handle.submit(sticker("a", MediaKind::Static)).unwrap();
    rig.handle.submit(sticker("b", MediaKind::Static)).unwrap();
    rig.handle.wait_idle().await;
    let events: Vec<_> = rig
        .handle
        .recent_events(50)
        .into_iter()
        .map(|e| e.event)
        .collect();
    let report = rig.handle.drain().await;

    assert_eq!(report.stats.breaker_pauses, 1);
    assert_eq!(report.stats.admitted, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::BreakerPause { .. })));
}

#[tokio::test]
async fn concurrent_workers_respect_capacity() {
    let core = HooverConfig::new(OwnerId(1), "bot").with_capacities(5, 3);
    let dir = Arc::new(MemoryDirectory::with_limits(5, 3).with_latency(Duration::from_millis(2)));
    let rig = rig_with(
        core,
        PipelineConfig::immediate().with_concurrency(3),
        Arc::clone(&dir),
        Arc::new(MemoryStore::new()),
    )
    .await;

    for i in 0..30 {
        rig.handle
            .submit(sticker(&format!("s{i}"), MediaKind::Static))
            .unwrap();
    }
    let ledger = rig.handle.ledger().clone();
    let report = rig.handle.drain().await;

    assert_eq!(report.stats.admitted, 30);
    assert_eq!(ledger.len(), 30);
    let packs = dir.created_packs();
    assert_eq!(packs.len(), 6);
    for pack in packs {
        assert_eq!(dir.members(&pack).unwrap().len(), 5);
    }
}

#[tokio::test]
async fn shutdown_abandons_queued_items() {
    let dir = Arc::new(MemoryDirectory::new().with_latency(Duration::from_millis(20)));
    let rig = rig_with(
        HooverConfig::new(OwnerId(1), "bot"),
        PipelineConfig::immediate().with_concurrency(1),
        dir,
        Arc::new(MemoryStore::new()),
    )
    .await;

    for i in 0..5 {
        rig.handle
            .submit(sticker(&format!("s{i}"), MediaKind::Static))
            .unwrap();
    }
    let report = rig.handle.shutdown().await;

    assert_eq!(report.abandoned as u64 + report.stats.admitted, 5);
    assert!(report.abandoned > 0);
}

#[tokio::test]
async fn state_survives_restart_with_file_store() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("pack_state.json");
    let dir = Arc::new(MemoryDirectory::new());
    let core = HooverConfig::new(OwnerId(1), "bot");

    {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let rig = rig_with(core.clone(), PipelineConfig::immediate(), Arc::clone(&dir), store).await;
        for id in ["A", "B", "C"] {
            rig.handle.submit(sticker(id, MediaKind::Static)).unwrap();
        }
        rig.handle.drain().await;
    }

    let blob = std::fs::read_to_string(&path).unwrap();
    assert!(blob.contains("\"current_pack\": \"stickies_1_by_bot\""));
    assert!(blob.contains("\"count\": 3"));

    let store = Arc::new(FileStore::open(&path).unwrap());
    let rig = rig_with(core, PipelineConfig::immediate(), dir, store).await;
    let state = rig.handle.state();
    assert_eq!(state.current_pack(), Some("stickies_1_by_bot"));
    assert_eq!(state.member_count(), 3);
    assert_eq!(rig.handle.ledger().len(), 3);

    rig.handle.submit(sticker("A", MediaKind::Static)).unwrap();
    let report = rig.handle.drain().await;
    assert_eq!(report.stats.duplicates, 1);
}
