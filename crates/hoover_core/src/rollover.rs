//! Rollover state machine.
//!
//! Owns the allocator state and decides, for every unique item, whether it
//! is appended to the current pack or opens a new one. A pack that vanished
//! out of band is recovered from at most once per item.

use crate::config::HooverConfig;
use crate::directory::PackDirectory;
use crate::error::{CoreError, CoreResult};
use crate::ledger::SharedLedger;
use crate::slug::SlugAllocator;
use crate::state::{AllocatorState, PersistedState, Placement, RolloverReason};
use crate::types::{ContentId, PackEntry, PackKind};
use hoover_storage::StateStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Recoveries allowed per item after the current pack vanished.
const MAX_RECOVERIES: u32 = 1;

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Pack the item landed in.
    pub pack: String,
    /// Index of that pack.
    pub index: u64,
    /// Members in the pack after the item was placed.
    pub count: u32,
    /// True if the item opened the pack.
    pub created: bool,
    /// True if the previous pack vanished while placing the item.
    pub recovered: bool,
    /// Why a pack was opened, if one was.
    pub rollover: Option<RolloverReason>,
    /// False if the state could not be written after placement.
    pub persisted: bool,
}

/// What happened to an item handed to [`RolloverMachine::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// The identity was already admitted; nothing changed.
    Duplicate,
    /// The item was placed.
    Admitted(Admission),
}

/// Pack allocation state machine.
///
/// One machine exists per process. Callers serialize access to it; every
/// method that touches the directory takes `&mut self`.
pub struct RolloverMachine<D: PackDirectory + ?Sized> {
    config: HooverConfig,
    directory: Arc<D>,
    store: Arc<dyn StateStore>,
    slugs: SlugAllocator,
    state: AllocatorState,
    ledger: SharedLedger,
}

impl<D: PackDirectory + ?Sized> RolloverMachine<D> {
    /// Loads state from `store`, or starts blank if the store is empty.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `config` fails validation
    /// - `Storage` or `Codec` if a stored blob cannot be read
    pub fn load(
        config: HooverConfig,
        directory: Arc<D>,
        store: Arc<dyn StateStore>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let (state, ledger) = match store.load()? {
            Some(blob) => PersistedState::decode(&blob)?.restore(),
            None => {
                info!(store = %store.describe(), "no saved state, starting blank");
                (AllocatorState::blank(), Default::default())
            }
        };
        info!(
            index = state.index(),
            pack = state.current_pack().unwrap_or("-"),
            count = state.member_count(),
            seen = ledger.len(),
            "allocator state loaded"
        );

        let slugs = SlugAllocator::new(config.probe_window, config.max_name_len);
        Ok(Self {
            config,
            directory,
            store,
            slugs,
            state,
            ledger: SharedLedger::new(ledger),
        })
    }

    /// Current allocator state.
    #[must_use]
    pub const fn state(&self) -> &AllocatorState {
        &self.state
    }

    /// Handle to the identity ledger.
    #[must_use]
    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &HooverConfig {
        &self.config
    }

    /// The pack directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Writes state and ledger to the store.
    ///
    /// # Errors
    ///
    /// Returns `Storage` or `Codec` if the blob cannot be written.
    pub fn persist(&self) -> CoreResult<()> {
        let blob = PersistedState::capture(&self.state, self.ledger.to_sorted_vec()).encode()?;
        self.store.store(&blob)?;
        debug!(bytes = blob.len(), "state persisted");
        Ok(())
    }

    /// Unions `ids` into the ledger. Returns how many were new.
    pub fn seed<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ContentId>,
    {
        self.ledger.seed_from(ids)
    }

    /// Drops the current pack, keeping the ledger and the index. The next
    /// pack opens under a fresh index.
    pub fn vacate(&mut self) {
        if let Some(name) = self.state.current_pack() {
            warn!(pack = %name, "current pack dropped");
        }
        self.state.vacate();
    }

    /// Mirrors the directory's view of the current pack.
    pub fn reconcile(&mut self, count: u32, kind: PackKind) -> bool {
        self.state.reconcile(count, kind)
    }

    /// Places `entry`, opening packs as needed.
    ///
    /// Returns [`AdmitOutcome::Duplicate`] without touching anything if the
    /// identity is already in the ledger.
    ///
    /// # Errors
    ///
    /// - `PackNotFound` if the pack vanished again after one recovery
    /// - `Directory` for any other directory failure
    /// - `SlugExhausted` if no free pack name is left
    pub async fn admit(&mut self, entry: &PackEntry) -> CoreResult<AdmitOutcome> {
        if self.ledger.contains(&entry.id) {
            return Ok(AdmitOutcome::Duplicate);
        }

        let kind = entry.pack_kind();
        let capacity = self.config.capacity(kind);
        let mut recoveries = 0;

        loop {
            let (created, rollover) = match self.state.plan(kind, capacity) {
                Placement::Append { name } => {
                    match self.directory.append(self.config.owner_id, &name, entry).await {
                        Ok(()) => {
                            self.state.appended();
                            (false, None)
                        }
                        Err(err) if err.is_not_found() && recoveries < MAX_RECOVERIES => {
                            warn!(pack = %name, id = %entry.id, "current pack vanished, recovering");
                            recoveries += 1;
                            self.state.vacate();
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Placement::Open { reason } => {
                    self.open(entry, kind, reason).await?;
                    (true, Some(reason))
                }
            };

            self.ledger.add(entry.id.clone());
            let persisted = match self.persist() {
                Ok(()) => true,
                Err(err) => {
                    error!(id = %entry.id, error = %err, "failed to persist state after admission");
                    false
                }
            };

            let pack = self.state.current_pack().unwrap_or_default().to_string();
            let count = self.state.member_count();
            info!(id = %entry.id, pack = %pack, count, "item admitted");
            return Ok(AdmitOutcome::Admitted(Admission {
                pack,
                index: self.state.index(),
                count,
                created,
                recovered: recoveries > 0,
                rollover,
                persisted,
            }));
        }
    }

    async fn open(
        &mut self,
        entry: &PackEntry,
        kind: PackKind,
        reason: RolloverReason,
    ) -> CoreResult<()> {
        let index = self.state.next_index();
        let name = self
            .slugs
            .allocate(
                self.directory.as_ref(),
                &self.config.base_name,
                &self.config.owner_token,
                index,
            )
            .await?;
        let title = self.config.pack_title(index);

        info!(pack = %name, index, kind = %kind, reason = %reason, "opening pack");
        self.directory
            .create(self.config.owner_id, &name, &title, entry)
            .await
            .map_err(|err| {
                error!(pack = %name, error = %err, "failed to create pack");
                CoreError::from(err)
            })?;

        self.state.opened(index, name, kind);
        Ok(())
    }
}

impl<D: PackDirectory + ?Sized> std::fmt::Debug for RolloverMachine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolloverMachine")
            .field("state", &self.state)
            .field("seen", &self.ledger.len())
            .field("store", &self.store.describe())
            .finish_non_exhaustive()
    }
}
