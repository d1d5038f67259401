//! Admission pipeline.
//!
//! ```text
//! submit ──try_send──▶ [ bounded queue ] ──▶ dispatcher ──▶ N workers
//!    │ full                                  (semaphore)      │
//!    ▼                                                        ▼
//!  reject + 👎           dedup → breaker → pacing → size policy
//!                                                             │
//!                                  ┌──────── critical section ┘
//!                                  ▼
//!                 rollover decision → append → ledger → persist
//!                                                             │
//!                                                             ▼
//!                                                   acknowledge (best-effort)
//! ```
//!
//! Only the rollover machine is behind the critical section; dedup checks,
//! downloads and resizes run concurrently.

use crate::bootstrap::Bootstrapped;
use crate::breaker::CircuitBreaker;
use crate::config::{PipelineConfig, ResizeFailurePolicy};
use crate::error::{EngineError, EngineResult};
use crate::events::{EventLog, EventSink, LogEntry, PipelineEvent};
use crate::notify::{LogNotifier, Notifier, Outcome};
use crate::resize::{NoResizer, Resizer, SizePolicy};
use crate::stats::{PipelineStats, StatsSnapshot, StatusReport};
use hoover_core::{
    Admission, AdmitOutcome, AllocatorState, ChatContext, ContentId, Item, PackDirectory,
    PackEntry, RolloverMachine, SharedLedger,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Builds and starts an admission pipeline.
pub struct PipelineBuilder<D: PackDirectory + ?Sized + 'static> {
    bootstrapped: Bootstrapped<D>,
    config: PipelineConfig,
    notifier: Arc<dyn Notifier>,
    resizer: Arc<dyn Resizer>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl<D: PackDirectory + ?Sized + 'static> PipelineBuilder<D> {
    /// Starts from a bootstrapped machine with default settings.
    pub fn new(bootstrapped: Bootstrapped<D>) -> Self {
        Self {
            bootstrapped,
            config: PipelineConfig::default(),
            notifier: Arc::new(LogNotifier),
            resizer: Arc::new(NoResizer),
            sinks: Vec::new(),
        }
    }

    /// Sets the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the acknowledgment channel.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets the image resizer.
    pub fn with_resizer(mut self, resizer: Arc<dyn Resizer>) -> Self {
        self.resizer = resizer;
        self
    }

    /// Adds an event sink next to the built-in event log.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Spawns the dispatcher on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration is inconsistent.
    pub fn start(self) -> EngineResult<PipelineHandle<D>> {
        self.config.validate()?;

        let machine = self.bootstrapped.into_machine();
        let core = machine.config();
        let size = SizePolicy::new(
            core.max_static_side,
            self.config.load_shedding.clone(),
            self.resizer,
        );
        let default_emoji = core.default_emoji.clone();
        let ledger = machine.ledger();
        let directory = Arc::clone(machine.directory());
        let state = RwLock::new(machine.state().clone());

        let shared = Arc::new(Shared {
            breaker: CircuitBreaker::new(self.config.max_error_rate, self.config.breaker_pause),
            log: EventLog::new(self.config.event_log_capacity),
            config: self.config,
            machine: tokio::sync::Mutex::new(machine),
            state,
            ledger,
            directory,
            size,
            notifier: self.notifier,
            sinks: self.sinks,
            stats: PipelineStats::new(),
            skipped: Mutex::new(HashSet::new()),
            default_emoji,
            depth: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let (sender, receiver) = mpsc::channel(shared.config.queue_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&shared), receiver, shutdown_rx));
        info!(
            concurrency = shared.config.concurrency,
            queue = shared.config.queue_capacity,
            "admission pipeline running"
        );

        Ok(PipelineHandle {
            shared,
            sender,
            shutdown,
            dispatcher,
        })
    }
}

/// How the pipeline stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Items that were still queued and never processed.
    pub abandoned: usize,
    /// Counters at shutdown.
    pub stats: StatsSnapshot,
}

/// Entry point for items and operator views of a running pipeline.
pub struct PipelineHandle<D: PackDirectory + ?Sized + 'static> {
    shared: Arc<Shared<D>>,
    sender: mpsc::Sender<Item>,
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<usize>,
}

impl<D: PackDirectory + ?Sized + 'static> PipelineHandle<D> {
    /// Enqueues `item` without waiting.
    ///
    /// On a full queue the item is rejected, and a "try later"
    /// acknowledgment is sent in the background.
    ///
    /// # Errors
    ///
    /// `QueueFull` if the queue is at capacity, `Shutdown` if the pipeline
    /// stopped.
    pub fn submit(&self, item: Item) -> EngineResult<()> {
        let shared = &self.shared;
        let id = item.id.clone();
        let depth = shared.depth.fetch_add(1, Ordering::SeqCst) + 1;
        match self.sender.try_send(item) {
            Ok(()) => {
                shared.stats.record_queued();
                debug!(id = %id, depth, "item queued");
                shared.emit(PipelineEvent::Queued { id, depth });
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(item)) => {
                shared.release_slot();
                shared.stats.record_rejected();
                warn!(id = %item.id, "queue full, rejecting");
                shared.emit(PipelineEvent::Rejected {
                    id: item.id.clone(),
                });
                shared.reject_in_background(item);
                Err(EngineError::QueueFull {
                    capacity: shared.config.queue_capacity,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                shared.release_slot();
                Err(EngineError::Shutdown)
            }
        }
    }

    /// Waits until the queue is empty and no item is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Items waiting for a worker.
    pub fn queue_depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    /// The identity ledger.
    pub fn ledger(&self) -> &SharedLedger {
        &self.shared.ledger
    }

    /// Allocator state after the last admission.
    pub fn state(&self) -> AllocatorState {
        self.shared.state.read().clone()
    }

    /// The last `n` events, oldest first.
    pub fn recent_events(&self, n: usize) -> Vec<LogEntry> {
        self.shared.log.recent(n)
    }

    /// Operator status report.
    pub fn status(&self) -> StatusReport {
        let shared = &self.shared;
        let state = shared.state.read().clone();
        StatusReport {
            queue_depth: self.queue_depth(),
            stats: shared.stats.snapshot(),
            error_rate: shared.stats.error_rate(),
            current_pack: state.current_pack().map(str::to_string),
            member_count: state.member_count(),
            index: state.index(),
            ledger_size: shared.ledger.len(),
            log_entries: shared.log.len(),
            concurrency: shared.config.concurrency,
            queue_capacity: shared.config.queue_capacity,
            pacing_delay: shared.config.pacing_delay,
        }
    }

    /// Stops intake, processes everything already queued, then stops.
    pub async fn drain(self) -> ShutdownReport {
        let Self {
            shared,
            sender,
            shutdown,
            dispatcher,
        } = self;
        drop(sender);
        let abandoned = join_dispatcher(dispatcher).await;
        drop(shutdown);
        ShutdownReport {
            abandoned,
            stats: shared.stats.snapshot(),
        }
    }

    /// Stops dequeuing, lets in-flight items finish and abandons the rest.
    pub async fn shutdown(self) -> ShutdownReport {
        let Self {
            shared,
            sender,
            shutdown,
            dispatcher,
        } = self;
        info!("shutting down admission pipeline");
        // The dispatcher may already be gone; nothing to signal then.
        let _ = shutdown.send(true);
        drop(sender);
        let abandoned = join_dispatcher(dispatcher).await;
        ShutdownReport {
            abandoned,
            stats: shared.stats.snapshot(),
        }
    }
}

async fn join_dispatcher(dispatcher: JoinHandle<usize>) -> usize {
    match dispatcher.await {
        Ok(abandoned) => abandoned,
        Err(err) => {
            error!(error = %err, "dispatcher task failed");
            0
        }
    }
}

struct Shared<D: PackDirectory + ?Sized> {
    config: PipelineConfig,
    machine: tokio::sync::Mutex<RolloverMachine<D>>,
    state: RwLock<AllocatorState>,
    ledger: SharedLedger,
    directory: Arc<D>,
    size: SizePolicy,
    breaker: CircuitBreaker,
    notifier: Arc<dyn Notifier>,
    sinks: Vec<Arc<dyn EventSink>>,
    log: EventLog,
    stats: PipelineStats,
    skipped: Mutex<HashSet<ContentId>>,
    default_emoji: String,
    depth: AtomicUsize,
    in_flight: AtomicUsize,
    idle: Notify,
}

async fn next_item(
    semaphore: &Arc<Semaphore>,
    receiver: &mut mpsc::Receiver<Item>,
) -> Option<(OwnedSemaphorePermit, Item)> {
    let permit = Arc::clone(semaphore).acquire_owned().await.ok()?;
    let item = receiver.recv().await?;
    Some((permit, item))
}

/// Feeds queued items to at most `concurrency` workers. Returns the number
/// of items left in the queue.
async fn dispatch<D>(
    shared: Arc<Shared<D>>,
    mut receiver: mpsc::Receiver<Item>,
    mut shutdown: watch::Receiver<bool>,
) -> usize
where
    D: PackDirectory + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(shared.config.concurrency));
    let mut workers = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            Some(joined) = workers.join_next() => {
                if let Err(err) = joined {
                    error!(error = %err, "worker task failed");
                }
            }
            next = next_item(&semaphore, &mut receiver) => match next {
                Some((permit, item)) => {
                    shared.in_flight.fetch_add(1, Ordering::SeqCst);
                    shared.depth.fetch_sub(1, Ordering::SeqCst);
                    let shared = Arc::clone(&shared);
                    workers.spawn(async move {
                        shared.process(item).await;
                        drop(permit);
                        shared.in_flight.fetch_sub(1, Ordering::SeqCst);
                        if shared.is_idle() {
                            shared.idle.notify_waiters();
                        }
                    });
                }
                None => break,
            },
        }
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            error!(error = %err, "worker task failed");
        }
    }

    receiver.close();
    let mut abandoned = 0;
    while let Ok(item) = receiver.try_recv() {
        shared.depth.fetch_sub(1, Ordering::SeqCst);
        warn!(id = %item.id, "item abandoned at shutdown");
        shared.emit(PipelineEvent::Abandoned { id: item.id });
        abandoned += 1;
    }
    info!(abandoned, "admission pipeline stopped");
    abandoned
}

impl<D: PackDirectory + ?Sized + 'static> Shared<D> {
    fn is_idle(&self) -> bool {
        self.depth.load(Ordering::SeqCst) == 0 && self.in_flight.load(Ordering::SeqCst) == 0
    }

    fn release_slot(&self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
        if self.is_idle() {
            self.idle.notify_waiters();
        }
    }

    fn emit(&self, event: PipelineEvent) {
        self.log.record(&event);
        for sink in &self.sinks {
            sink.record(&event);
        }
    }

    fn reject_in_background(&self, item: Item) {
        let notifier = Arc::clone(&self.notifier);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    acknowledge(notifier.as_ref(), &item.context, &item.id, &Outcome::Rejected)
                        .await;
                });
            }
            Err(_) => warn!(id = %item.id, "no runtime to acknowledge rejection"),
        }
    }

    async fn process(&self, item: Item) {
        if self.ledger.contains(&item.id) {
            self.duplicate(&item.id);
            return;
        }
        if self.config.resize_failure_policy == ResizeFailurePolicy::Permanent
            && self.skipped.lock().contains(&item.id)
        {
            debug!(id = %item.id, "resize failed earlier, dropping");
            self.emit(PipelineEvent::Skipped { id: item.id });
            return;
        }

        if let Some(error_rate) = self.breaker.gate(&self.stats).await {
            self.emit(PipelineEvent::BreakerPause {
                error_rate,
                pause: self.breaker.pause(),
            });
        }
        if !self.config.pacing_delay.is_zero() {
            tokio::time::sleep(self.config.pacing_delay).await;
        }

        self.stats.record_processed();
        info!(
            id = %item.id,
            kind = %item.kind,
            dimensions = %item.dimensions,
            chat = item.context.chat_id,
            "processing item"
        );

        match self.admit(&item).await {
            Ok(None) => self.duplicate(&item.id),
            Ok(Some(admission)) => self.admitted(&item, admission).await,
            Err(err) => self.failed(&item, err).await,
        }
    }

    async fn admit(&self, item: &Item) -> EngineResult<Option<Admission>> {
        let entry = PackEntry::from_item(item, &self.default_emoji);
        let prepared = self
            .size
            .apply(
                self.directory.as_ref(),
                item,
                entry,
                self.depth.load(Ordering::SeqCst),
                self.config.queue_capacity,
            )
            .await?;
        if let Some(from_side) = prepared.shrunk_from {
            self.stats.record_resized();
            self.emit(PipelineEvent::Resized {
                id: item.id.clone(),
                from_side,
                max_side: self.size.max_side(),
            });
        }

        let mut machine = self.machine.lock().await;
        let outcome = machine.admit(&prepared.entry).await;
        *self.state.write() = machine.state().clone();
        drop(machine);

        match outcome? {
            AdmitOutcome::Duplicate => Ok(None),
            AdmitOutcome::Admitted(admission) => Ok(Some(admission)),
        }
    }

    fn duplicate(&self, id: &ContentId) {
        self.stats.record_duplicate();
        debug!(id = %id, "already admitted, skipping");
        self.emit(PipelineEvent::Duplicate { id: id.clone() });
    }

    async fn admitted(&self, item: &Item, admission: Admission) {
        self.stats
            .record_admitted(admission.created, admission.recovered);
        if admission.recovered {
            self.emit(PipelineEvent::PackVanished {
                id: item.id.clone(),
                replacement: admission.pack.clone(),
            });
        }
        if let Some(reason) = admission.rollover {
            self.emit(PipelineEvent::PackCreated {
                pack: admission.pack.clone(),
                index: admission.index,
                kind: item.kind.pack_kind(),
                reason,
            });
        }
        self.emit(PipelineEvent::Admitted {
            id: item.id.clone(),
            pack: admission.pack.clone(),
            count: admission.count,
        });

        if admission.created {
            if let Err(err) = self
                .notifier
                .pack_created(&item.context, &admission.pack)
                .await
            {
                warn!(pack = %admission.pack, error = %err, "failed to announce pack");
            }
        }
        let outcome = Outcome::Admitted {
            pack: admission.pack,
            count: admission.count,
        };
        acknowledge(self.notifier.as_ref(), &item.context, &item.id, &outcome).await;
    }

    async fn failed(&self, item: &Item, err: EngineError) {
        self.stats.record_failed();
        let soft = err.is_soft();
        if err.is_resize() {
            warn!(id = %item.id, error = %err, "skipping item, resize failed");
            self.emit(PipelineEvent::ResizeSkipped {
                id: item.id.clone(),
                reason: err.to_string(),
            });
            if self.config.resize_failure_policy == ResizeFailurePolicy::Permanent {
                self.skipped.lock().insert(item.id.clone());
            }
        } else {
            error!(id = %item.id, error = %err, "failed to process item");
        }
        self.emit(PipelineEvent::Failed {
            id: item.id.clone(),
            error: err.to_string(),
            soft,
        });

        let outcome = Outcome::Failed {
            reason: short_reason(&err),
        };
        acknowledge(self.notifier.as_ref(), &item.context, &item.id, &outcome).await;
    }
}

async fn acknowledge(
    notifier: &dyn Notifier,
    context: &ChatContext,
    id: &ContentId,
    outcome: &Outcome,
) {
    if let Err(err) = notifier.acknowledge(context, id, outcome).await {
        warn!(id = %id, error = %err, "failed to acknowledge");
    }
}

fn short_reason(err: &EngineError) -> String {
    err.to_string().chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use crate::notify::MockNotifier;
    use hoover_core::{HooverConfig, MediaKind, MemoryDirectory, OwnerId};
    use hoover_storage::MemoryStore;
    use std::time::Duration;

    async fn start(
        config: PipelineConfig,
        dir: Arc<MemoryDirectory>,
        notifier: Arc<MockNotifier>,
    ) -> PipelineHandle<MemoryDirectory> {
        let core = HooverConfig::new(OwnerId(1), "bot");
        let machine =
            RolloverMachine::load(core, dir, Arc::new(MemoryStore::new())).unwrap();
        let bootstrapped = bootstrap(machine).await.unwrap();
        PipelineBuilder::new(bootstrapped)
            .with_config(config)
            .with_notifier(notifier)
            .start()
            .unwrap()
    }

    fn item(id: &str) -> Item {
        Item::new(id, format!("file-{id}"), MediaKind::Static)
    }

    #[tokio::test]
    async fn admits_and_acknowledges() {
        let dir = Arc::new(MemoryDirectory::new());
        let notifier = Arc::new(MockNotifier::new());
        let handle = start(PipelineConfig::immediate(), Arc::clone(&dir), notifier.clone()).await;

        handle.submit(item("a")).unwrap();
        handle.submit(item("b")).unwrap();
        handle.wait_idle().await;
        let queued: Vec<_> = handle
            .recent_events(50)
            .into_iter()
            .filter_map(|entry| match entry.event {
                PipelineEvent::Queued { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(queued, vec![ContentId::from("a"), ContentId::from("b")]);
        let report = handle.drain().await;

        assert_eq!(report.abandoned, 0);
        assert_eq!(report.stats.admitted, 2);
        assert_eq!(report.stats.packs_created, 1);
        assert_eq!(dir.members("stickies_1_by_bot").unwrap().len(), 2);
        assert_eq!(notifier.announced_packs(), vec!["stickies_1_by_bot".to_string()]);
        assert!(notifier.acks_for(&"a".into())[0].is_success());
    }

    #[tokio::test]
    async fn duplicates_are_silent() {
        let dir = Arc::new(MemoryDirectory::new());
        let notifier = Arc::new(MockNotifier::new());
        let config = PipelineConfig::immediate().with_concurrency(1);
        let handle = start(config, Arc::clone(&dir), notifier.clone()).await;

        handle.submit(item("a")).unwrap();
        handle.submit(item("a")).unwrap();
        let report = handle.drain().await;

        assert_eq!(report.stats.admitted, 1);
        assert_eq!(report.stats.duplicates, 1);
        assert_eq!(notifier.acks_for(&"a".into()).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_rejects_newest() {
        let dir = Arc::new(MemoryDirectory::new().with_latency(Duration::from_millis(50)));
        let notifier = Arc::new(MockNotifier::new());
        let config = PipelineConfig::immediate()
            .with_concurrency(1)
            .with_queue_capacity(1);
        let handle = start(config, dir, notifier.clone()).await;

        // Let the only worker pick up the first item and block on the directory.
        handle.submit(item("i0")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut rejected = Vec::new();
        for i in 1..10 {
            let id = format!("i{i}");
            if let Err(err) = handle.submit(item(&id)) {
                assert!(matches!(err, EngineError::QueueFull { capacity: 1 }));
                rejected.push(id);
            }
        }
        // One in flight, one queued, the rest refused.
        assert_eq!(rejected.len(), 10 - (1 + 1));
        assert_eq!(rejected.first().map(String::as_str), Some("i2"));

        let report = handle.drain().await;
        assert_eq!(report.stats.rejected, 8);
        assert_eq!(report.stats.queued, 2);
        assert_eq!(report.stats.admitted, 2);
    }

    #[tokio::test]
    async fn status_reflects_state() {
        let dir = Arc::new(MemoryDirectory::new());
        let notifier = Arc::new(MockNotifier::new());
        let handle = start(PipelineConfig::immediate(), dir, notifier).await;
        let status = handle.status();
        assert_eq!(status.current_pack, None);
        assert_eq!(status.index, 1);
        assert_eq!(status.queue_capacity, 50);
        handle.shutdown().await;
    }
}
