//! Pack directory abstraction.

use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{ContentId, OwnerId, PackEntry, PackKind};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Current contents of a pack as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSnapshot {
    /// Pack name.
    pub name: String,
    /// Declared kind flag.
    pub kind: PackKind,
    /// Member identities in pack order.
    pub members: Vec<ContentId>,
}

/// The chat platform's pack API.
///
/// This trait abstracts the platform client, allowing for different
/// implementations (a live bot client, the in-memory directory for tests,
/// etc.). Packs are addressed by generated name and may vanish at any time
/// out of band; operations on a vanished pack report
/// [`DirectoryError::NotFound`].
#[async_trait]
pub trait PackDirectory: Send + Sync {
    /// Returns true if a pack named `name` exists.
    async fn exists(&self, name: &str) -> DirectoryResult<bool>;

    /// Creates a pack seeded with its first entry.
    async fn create(
        &self,
        owner: OwnerId,
        name: &str,
        title: &str,
        first: &PackEntry,
    ) -> DirectoryResult<()>;

    /// Appends an entry to an existing pack.
    async fn append(&self, owner: OwnerId, name: &str, entry: &PackEntry) -> DirectoryResult<()>;

    /// Fetches a pack's kind and members.
    async fn fetch(&self, name: &str) -> DirectoryResult<PackSnapshot>;

    /// Downloads the payload behind a platform file reference.
    async fn download(&self, file_ref: &str) -> DirectoryResult<Bytes>;
}

/// Directory operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
    /// `exists`
    Exists,
    /// `create`
    Create,
    /// `append`
    Append,
    /// `fetch`
    Fetch,
    /// `download`
    Download,
}

#[derive(Debug, Clone)]
struct StoredPack {
    title: String,
    owner: OwnerId,
    kind: PackKind,
    entries: Vec<PackEntry>,
}

#[derive(Debug, Default)]
struct Inner {
    packs: BTreeMap<String, StoredPack>,
    files: HashMap<String, Bytes>,
    failures: VecDeque<(DirectoryOp, DirectoryError)>,
    created_order: Vec<String>,
}

/// An in-memory pack directory for testing and dry runs.
///
/// Behaves like the platform: it enforces per-kind capacities, refuses to
/// mix kinds in one pack, and reports missing packs as `NotFound`. Failures
/// can be scripted per operation, packs can be made to vanish, and an
/// artificial latency can be added to every call.
#[derive(Debug)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
    static_limit: u32,
    animated_limit: u32,
    latency: Duration,
    exists_calls: AtomicU64,
    create_calls: AtomicU64,
    append_calls: AtomicU64,
    fetch_calls: AtomicU64,
    download_calls: AtomicU64,
}

impl MemoryDirectory {
    /// Creates a directory with the platform's default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(
            crate::config::DEFAULT_STATIC_CAPACITY,
            crate::config::DEFAULT_ANIMATED_CAPACITY,
        )
    }

    /// Creates a directory enforcing the given capacities.
    #[must_use]
    pub fn with_limits(static_limit: u32, animated_limit: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            static_limit,
            animated_limit,
            latency: Duration::ZERO,
            exists_calls: AtomicU64::new(0),
            create_calls: AtomicU64::new(0),
            append_calls: AtomicU64::new(0),
            fetch_calls: AtomicU64::new(0),
            download_calls: AtomicU64::new(0),
        }
    }

    /// Adds a delay to every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Inserts a pack that exists independently of the hoover.
    pub fn insert_pack(&self, name: &str, kind: PackKind, members: &[&str]) {
        let entries = members
            .iter()
            .map(|id| PackEntry {
                id: ContentId::from(*id),
                source: crate::types::StickerSource::FileRef(format!("file-{id}")),
                emoji: crate::config::DEFAULT_EMOJI.to_string(),
                kind: match kind {
                    PackKind::Static => crate::types::MediaKind::Static,
                    PackKind::Animated => crate::types::MediaKind::Animated,
                },
            })
            .collect();
        self.inner.lock().packs.insert(
            name.to_string(),
            StoredPack {
                title: name.to_string(),
                owner: OwnerId(0),
                kind,
                entries,
            },
        );
    }

    /// Registers a downloadable file.
    pub fn insert_file(&self, file_ref: &str, bytes: Bytes) {
        self.inner.lock().files.insert(file_ref.to_string(), bytes);
    }

    /// Deletes a pack out of band.
    pub fn vanish(&self, name: &str) -> bool {
        self.inner.lock().packs.remove(name).is_some()
    }

    /// Makes the next call of `op` fail with `error`.
    ///
    /// Failures queue up and are consumed in order.
    pub fn fail_next(&self, op: DirectoryOp, error: DirectoryError) {
        self.inner.lock().failures.push_back((op, error));
    }

    /// Member identities of `name`, if it exists.
    #[must_use]
    pub fn members(&self, name: &str) -> Option<Vec<ContentId>> {
        self.inner
            .lock()
            .packs
            .get(name)
            .map(|pack| pack.entries.iter().map(|e| e.id.clone()).collect())
    }

    /// Entries of `name`, if it exists.
    #[must_use]
    pub fn entries(&self, name: &str) -> Option<Vec<PackEntry>> {
        self.inner
            .lock()
            .packs
            .get(name)
            .map(|pack| pack.entries.clone())
    }

    /// Title of `name`, if it exists.
    #[must_use]
    pub fn title(&self, name: &str) -> Option<String> {
        self.inner.lock().packs.get(name).map(|p| p.title.clone())
    }

    /// Owner of `name`, if it exists.
    #[must_use]
    pub fn owner(&self, name: &str) -> Option<OwnerId> {
        self.inner.lock().packs.get(name).map(|p| p.owner)
    }

    /// Names of packs created through this directory, in creation order.
    #[must_use]
    pub fn created_packs(&self) -> Vec<String> {
        self.inner.lock().created_order.clone()
    }

    /// Number of `exists` calls.
    #[must_use]
    pub fn exists_calls(&self) -> u64 {
        self.exists_calls.load(Ordering::SeqCst)
    }

    /// Number of `create` calls.
    #[must_use]
    pub fn create_calls(&self) -> u64 {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `append` calls.
    #[must_use]
    pub fn append_calls(&self) -> u64 {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch` calls.
    #[must_use]
    pub fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `download` calls.
    #[must_use]
    pub fn download_calls(&self) -> u64 {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn limit(&self, kind: PackKind) -> u32 {
        match kind {
            PackKind::Static => self.static_limit,
            PackKind::Animated => self.animated_limit,
        }
    }

    async fn enter(&self, op: DirectoryOp, counter: &AtomicU64) -> DirectoryResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.failures.iter().position(|(o, _)| *o == op) {
            if let Some((_, err)) = inner.failures.remove(pos) {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackDirectory for MemoryDirectory {
    async fn exists(&self, name: &str) -> DirectoryResult<bool> {
        self.enter(DirectoryOp::Exists, &self.exists_calls).await?;
        Ok(self.inner.lock().packs.contains_key(name))
    }

    async fn create(
        &self,
        owner: OwnerId,
        name: &str,
        title: &str,
        first: &PackEntry,
    ) -> DirectoryResult<()> {
        self.enter(DirectoryOp::Create, &self.create_calls).await?;
        let mut inner = self.inner.lock();
        if inner.packs.contains_key(name) {
            return Err(DirectoryError::transient(format!(
                "STICKERSET_NAME_OCCUPIED: {name}"
            )));
        }
        inner.packs.insert(
            name.to_string(),
            StoredPack {
                title: title.to_string(),
                owner,
                kind: first.pack_kind(),
                entries: vec![first.clone()],
            },
        );
        inner.created_order.push(name.to_string());
        Ok(())
    }

    async fn append(&self, _owner: OwnerId, name: &str, entry: &PackEntry) -> DirectoryResult<()> {
        self.enter(DirectoryOp::Append, &self.append_calls).await?;
        let mut inner = self.inner.lock();
        let pack = inner
            .packs
            .get_mut(name)
            .ok_or_else(|| DirectoryError::not_found(name))?;
        let limit = self.limit(pack.kind);
        if pack.kind != entry.pack_kind() {
            return Err(DirectoryError::transient(format!(
                "STICKER_KIND_MISMATCH: {} entry into {} pack {name}",
                entry.kind, pack.kind
            )));
        }
        if pack.entries.len() as u32 >= limit {
            return Err(DirectoryError::transient(format!(
                "STICKERS_TOO_MUCH: {name} holds {limit}"
            )));
        }
        pack.entries.push(entry.clone());
        Ok(())
    }

    async fn fetch(&self, name: &str) -> DirectoryResult<PackSnapshot> {
        self.enter(DirectoryOp::Fetch, &self.fetch_calls).await?;
        let inner = self.inner.lock();
        let pack = inner
            .packs
            .get(name)
            .ok_or_else(|| DirectoryError::not_found(name))?;
        Ok(PackSnapshot {
            name: name.to_string(),
            kind: pack.kind,
            members: pack.entries.iter().map(|e| e.id.clone()).collect(),
        })
    }

    async fn download(&self, file_ref: &str) -> DirectoryResult<Bytes> {
        self.enter(DirectoryOp::Download, &self.download_calls).await?;
        self.inner
            .lock()
            .files
            .get(file_ref)
            .cloned()
            .ok_or_else(|| DirectoryError::transient(format!("file not found: {file_ref}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, MediaKind};

    fn entry(id: &str, kind: MediaKind) -> PackEntry {
        PackEntry::from_item(&Item::new(id, format!("file-{id}"), kind), "🙂")
    }

    #[tokio::test]
    async fn create_fetch_append() {
        let dir = MemoryDirectory::new();
        assert!(!dir.exists("p").await.unwrap());

        dir.create(OwnerId(1), "p", "P 1", &entry("a", MediaKind::Static))
            .await
            .unwrap();
        dir.append(OwnerId(1), "p", &entry("b", MediaKind::Static))
            .await
            .unwrap();

        let snapshot = dir.fetch("p").await.unwrap();
        assert_eq!(snapshot.kind, PackKind::Static);
        assert_eq!(snapshot.members, vec![ContentId::from("a"), ContentId::from("b")]);
        assert_eq!(dir.title("p").unwrap(), "P 1");
        assert_eq!(dir.owner("p"), Some(OwnerId(1)));
        assert_eq!(dir.created_packs(), vec!["p".to_string()]);
    }

    #[tokio::test]
    async fn missing_pack_is_not_found() {
        let dir = MemoryDirectory::new();
        let err = dir
            .append(OwnerId(1), "gone", &entry("a", MediaKind::Static))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(dir.fetch("gone").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn enforces_capacity_and_kind() {
        let dir = MemoryDirectory::with_limits(1, 1);
        dir.create(OwnerId(1), "p", "P", &entry("a", MediaKind::Static))
            .await
            .unwrap();

        let full = dir
            .append(OwnerId(1), "p", &entry("b", MediaKind::Static))
            .await
            .unwrap_err();
        assert!(!full.is_not_found());

        let dir = MemoryDirectory::new();
        dir.create(OwnerId(1), "p", "P", &entry("a", MediaKind::Static))
            .await
            .unwrap();
        let mixed = dir
            .append(OwnerId(1), "p", &entry("v", MediaKind::Video))
            .await
            .unwrap_err();
        assert!(mixed.to_string().contains("KIND_MISMATCH"));
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let dir = MemoryDirectory::new();
        dir.fail_next(DirectoryOp::Exists, DirectoryError::transient("flood"));

        assert!(dir.exists("p").await.is_err());
        assert!(!dir.exists("p").await.unwrap());
        assert_eq!(dir.exists_calls(), 2);
    }

    #[tokio::test]
    async fn vanish_and_download() {
        let dir = MemoryDirectory::new();
        dir.insert_pack("ref", PackKind::Animated, &["x", "y"]);
        assert!(dir.exists("ref").await.unwrap());
        assert!(dir.vanish("ref"));
        assert!(!dir.exists("ref").await.unwrap());

        dir.insert_file("f1", Bytes::from_static(b"png"));
        assert_eq!(dir.download("f1").await.unwrap(), Bytes::from_static(b"png"));
        assert!(dir.download("f2").await.is_err());
    }
}
