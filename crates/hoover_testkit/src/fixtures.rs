//! Test fixtures and pipeline helpers.
//!
//! Provides convenience functions for wiring a rollover machine or a full
//! pipeline against the in-memory pack directory.

use bytes::Bytes;
use hoover_core::{
    HooverConfig, Item, MediaKind, MemoryDirectory, OwnerId, PackEntry, RolloverMachine,
};
use hoover_engine::{
    bootstrap, EngineError, EngineResult, MockNotifier, PipelineBuilder, PipelineConfig,
    PipelineHandle, Resizer,
};
use hoover_storage::{FileStore, MemoryStore, StateStore};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Core configuration used by the fixtures: owner 1, token `bot`.
pub fn test_config(static_capacity: u32, animated_capacity: u32) -> HooverConfig {
    HooverConfig::new(OwnerId(1), "bot").with_capacities(static_capacity, animated_capacity)
}

/// An item with a file reference derived from its id.
pub fn sticker(id: &str, kind: MediaKind) -> Item {
    Item::new(id, format!("file-{id}"), kind)
}

/// The pack entry the pipeline would build for `item`.
pub fn entry(item: &Item) -> PackEntry {
    PackEntry::from_item(item, hoover_core::DEFAULT_EMOJI)
}

/// A rollover machine over an in-memory directory, with automatic cleanup.
pub struct TestHoover {
    /// The machine.
    pub machine: RolloverMachine<MemoryDirectory>,
    /// The directory the machine talks to.
    pub directory: Arc<MemoryDirectory>,
    /// The state store.
    pub store: Arc<dyn StateStore>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestHoover {
    /// Creates a machine persisting to memory.
    pub fn memory(config: HooverConfig) -> Self {
        let directory = Arc::new(MemoryDirectory::with_limits(
            config.static_capacity,
            config.animated_capacity,
        ));
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let machine = RolloverMachine::load(config, Arc::clone(&directory), Arc::clone(&store))
            .expect("Failed to load machine");
        Self {
            machine,
            directory,
            store,
            _temp_dir: None,
        }
    }

    /// Creates a machine persisting to a file in a temporary directory.
    pub fn file(config: HooverConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("pack_state.json");
        let directory = Arc::new(MemoryDirectory::with_limits(
            config.static_capacity,
            config.animated_capacity,
        ));
        let store: Arc<dyn StateStore> =
            Arc::new(FileStore::open(&path).expect("Failed to open state file"));
        let machine = RolloverMachine::load(config, Arc::clone(&directory), Arc::clone(&store))
            .expect("Failed to load machine");
        Self {
            machine,
            directory,
            store,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the state file path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir
            .as_ref()
            .map(|d| d.path().join("pack_state.json"))
    }

    /// Admits `items` in order, panicking on errors.
    pub async fn admit_all(&mut self, items: &[Item]) {
        for item in items {
            self.machine
                .admit(&entry(item))
                .await
                .expect("Failed to admit item");
        }
    }
}

/// A running pipeline over an in-memory directory.
pub struct TestPipeline {
    /// Pipeline handle.
    pub handle: PipelineHandle<MemoryDirectory>,
    /// The directory.
    pub directory: Arc<MemoryDirectory>,
    /// Recorded acknowledgments.
    pub notifier: Arc<MockNotifier>,
    /// The state store.
    pub store: Arc<MemoryStore>,
}

impl TestPipeline {
    /// Bootstraps and starts a pipeline with a fresh directory.
    pub async fn start(core: HooverConfig, pipeline: PipelineConfig) -> Self {
        let directory = Arc::new(MemoryDirectory::with_limits(
            core.static_capacity,
            core.animated_capacity,
        ));
        Self::start_with(core, pipeline, directory, None).await
    }

    /// Bootstraps and starts a pipeline over `directory`, optionally with a
    /// resizer.
    pub async fn start_with(
        core: HooverConfig,
        pipeline: PipelineConfig,
        directory: Arc<MemoryDirectory>,
        resizer: Option<Arc<dyn Resizer>>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(MockNotifier::new());
        let machine = RolloverMachine::load(core, Arc::clone(&directory), store.clone())
            .expect("Failed to load machine");
        let bootstrapped = bootstrap(machine).await.expect("Bootstrap failed");

        let mut builder = PipelineBuilder::new(bootstrapped)
            .with_config(pipeline)
            .with_notifier(notifier.clone());
        if let Some(resizer) = resizer {
            builder = builder.with_resizer(resizer);
        }
        let handle = builder.start().expect("Failed to start pipeline");

        Self {
            handle,
            directory,
            notifier,
            store,
        }
    }
}

/// A resizer returning scripted results and recording its calls.
#[derive(Debug, Default)]
pub struct ScriptedResizer {
    failing: Mutex<bool>,
    calls: Mutex<Vec<(usize, u32)>>,
}

impl ScriptedResizer {
    /// A resizer that succeeds, returning the first half of the payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resizer whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: Mutex::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(payload length, max side)` of every call.
    pub fn calls(&self) -> Vec<(usize, u32)> {
        self.calls.lock().clone()
    }
}

impl Resizer for ScriptedResizer {
    fn shrink(&self, payload: &[u8], max_side: u32) -> EngineResult<Bytes> {
        self.calls.lock().push((payload.len(), max_side));
        if *self.failing.lock() {
            return Err(EngineError::ResizeFailed("scripted failure".into()));
        }
        Ok(Bytes::copy_from_slice(&payload[..payload.len() / 2]))
    }
}
