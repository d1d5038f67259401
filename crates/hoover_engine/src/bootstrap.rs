//! Startup synchronization.
//!
//! Before the pipeline takes traffic the ledger is seeded from every
//! reference pack and from the recorded current pack, and the current pack
//! is verified. A current pack that no longer exists is dropped and the
//! loss is persisted, so the next pack supersedes it under a fresh index
//! even across restarts. The ledger is kept.

use hoover_core::{CoreResult, PackDirectory, RolloverMachine};
use std::collections::HashSet;
use tracing::{info, warn};

/// What bootstrap found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Packs whose members were seeded.
    pub seeded: Vec<String>,
    /// Packs that did not exist.
    pub missing: Vec<String>,
    /// Identities added to the ledger.
    pub new_ids: usize,
    /// The recorded current pack, if it vanished.
    pub vacated: Option<String>,
    /// True if count or kind of the current pack were corrected.
    pub reconciled: bool,
}

impl BootstrapReport {
    /// Returns true if bootstrap changed the persisted state.
    pub fn changed(&self) -> bool {
        self.new_ids > 0 || self.vacated.is_some() || self.reconciled
    }
}

/// A rollover machine that went through [`bootstrap`].
///
/// The pipeline can only be started from this type.
#[derive(Debug)]
pub struct Bootstrapped<D: PackDirectory + ?Sized> {
    machine: RolloverMachine<D>,
    report: BootstrapReport,
}

impl<D: PackDirectory + ?Sized> Bootstrapped<D> {
    /// The bootstrap report.
    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    /// The synchronized machine.
    pub fn machine(&self) -> &RolloverMachine<D> {
        &self.machine
    }

    pub(crate) fn into_machine(self) -> RolloverMachine<D> {
        self.machine
    }
}

/// Reconciles `machine` with the directory.
///
/// # Errors
///
/// Directory errors other than absence, and persistence errors.
pub async fn bootstrap<D>(mut machine: RolloverMachine<D>) -> CoreResult<Bootstrapped<D>>
where
    D: PackDirectory + ?Sized,
{
    let directory = std::sync::Arc::clone(machine.directory());
    let current = machine.state().current_pack().map(str::to_string);

    let mut names: Vec<String> = machine.config().reference_packs.clone();
    names.extend(current.clone());
    let mut visited = HashSet::new();
    names.retain(|name| visited.insert(name.clone()));

    info!(packs = names.len(), "starting state synchronization");
    let mut report = BootstrapReport::default();
    let mut current_found = false;

    for name in names {
        match directory.fetch(&name).await {
            Ok(snapshot) => {
                let members = snapshot.members.len();
                report.new_ids += machine.seed(snapshot.members);
                if current.as_deref() == Some(name.as_str()) {
                    current_found = true;
                    let count = u32::try_from(members).unwrap_or(u32::MAX);
                    report.reconciled = machine.reconcile(count, snapshot.kind);
                    info!(pack = %name, members, "current pack verified");
                } else {
                    info!(pack = %name, members, "reference pack seeded");
                }
                report.seeded.push(name);
            }
            Err(err) if err.is_not_found() => {
                warn!(pack = %name, "pack not found, skipping");
                report.missing.push(name);
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(name) = current {
        if !current_found {
            warn!(pack = %name, "saved pack missing, resetting state");
            machine.vacate();
            report.vacated = Some(name);
        }
    }

    if report.changed() {
        machine.persist()?;
    }
    info!(
        seeded = report.seeded.len(),
        missing = report.missing.len(),
        new_ids = report.new_ids,
        ledger = machine.ledger().len(),
        "state synchronized"
    );

    Ok(Bootstrapped { machine, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoover_core::{
        ContentId, DirectoryError, DirectoryOp, HooverConfig, Item, MediaKind, MemoryDirectory,
        OwnerId, PackEntry, PackKind,
    };
    use hoover_storage::MemoryStore;
    use std::sync::Arc;

    fn config(refs: &[&str]) -> HooverConfig {
        HooverConfig::new(OwnerId(1), "bot")
            .with_reference_packs(refs.iter().map(|s| s.to_string()).collect())
    }

    fn machine(
        config: HooverConfig,
        dir: &Arc<MemoryDirectory>,
        store: &Arc<MemoryStore>,
    ) -> RolloverMachine<MemoryDirectory> {
        RolloverMachine::load(config, Arc::clone(dir), store.clone()).unwrap()
    }

    #[tokio::test]
    async fn seeds_from_reference_packs_and_skips_missing() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.insert_pack("cats", PackKind::Static, &["X", "Y"]);
        let store = Arc::new(MemoryStore::new());

        let done = bootstrap(machine(config(&["cats", "gone"]), &dir, &store))
            .await
            .unwrap();
        let report = done.report();
        assert_eq!(report.seeded, vec!["cats".to_string()]);
        assert_eq!(report.missing, vec!["gone".to_string()]);
        assert_eq!(report.new_ids, 2);
        assert!(done.machine().ledger().contains(&ContentId::from("X")));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn vanished_current_pack_is_dropped() {
        let dir = Arc::new(MemoryDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let mut m = machine(config(&[]), &dir, &store);
        let entry = PackEntry::from_item(&Item::new("A", "file-A", MediaKind::Static), "🙂");
        m.admit(&entry).await.unwrap();
        dir.vanish("stickies_1_by_bot");

        let done = bootstrap(m).await.unwrap();
        assert_eq!(done.report().vacated.as_deref(), Some("stickies_1_by_bot"));
        let state = done.machine().state();
        assert_eq!(state.current_pack(), None);
        assert_eq!(state.index(), 1);
        assert_eq!(state.vacated_pack(), Some("stickies_1_by_bot"));
        assert!(done.machine().ledger().contains(&ContentId::from("A")));
    }

    #[tokio::test]
    async fn vanished_pack_index_is_not_reused_after_reload() {
        let dir = Arc::new(MemoryDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let mut m = machine(config(&[]), &dir, &store);
        let a = PackEntry::from_item(&Item::new("A", "file-A", MediaKind::Static), "🙂");
        m.admit(&a).await.unwrap();
        dir.vanish("stickies_1_by_bot");
        drop(bootstrap(m).await.unwrap());

        let reloaded = bootstrap(machine(config(&[]), &dir, &store)).await.unwrap();
        let state = reloaded.machine().state();
        assert_eq!(state.vacated_pack(), Some("stickies_1_by_bot"));
        assert_eq!(state.next_index(), 2);
        assert!(reloaded.report().vacated.is_none());

        let mut m = reloaded.into_machine();
        let b = PackEntry::from_item(&Item::new("B", "file-B", MediaKind::Static), "🙂");
        let outcome = m.admit(&b).await.unwrap();
        let hoover_core::AdmitOutcome::Admitted(admission) = outcome else {
            panic!("expected admission, got {outcome:?}");
        };
        assert_eq!(admission.pack, "stickies_2_by_bot");
        assert_eq!(admission.index, 2);
        assert_eq!(dir.title("stickies_2_by_bot").as_deref(), Some("Stickies 2"));
    }

    #[tokio::test]
    async fn current_pack_is_reconciled() {
        let dir = Arc::new(MemoryDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let mut m = machine(config(&[]), &dir, &store);
        let entry = PackEntry::from_item(&Item::new("A", "file-A", MediaKind::Static), "🙂");
        m.admit(&entry).await.unwrap();

        // Members added out of band.
        dir.insert_pack("stickies_1_by_bot", PackKind::Static, &["A", "B", "C"]);

        let done = bootstrap(m).await.unwrap();
        assert!(done.report().reconciled);
        assert_eq!(done.machine().state().member_count(), 3);
        assert_eq!(done.machine().ledger().len(), 3);
    }

    #[tokio::test]
    async fn current_pack_listed_as_reference_is_fetched_once() {
        let dir = Arc::new(MemoryDirectory::new());
        let store = Arc::new(MemoryStore::new());
        let mut m = machine(config(&["stickies_1_by_bot"]), &dir, &store);
        let entry = PackEntry::from_item(&Item::new("A", "file-A", MediaKind::Static), "🙂");
        m.admit(&entry).await.unwrap();

        let done = bootstrap(m).await.unwrap();
        assert_eq!(dir.fetch_calls(), 1);
        assert!(!done.report().changed());
    }

    #[tokio::test]
    async fn transient_errors_propagate() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.fail_next(DirectoryOp::Fetch, DirectoryError::transient("flood"));
        let store = Arc::new(MemoryStore::new());

        let result = bootstrap(machine(config(&["cats"]), &dir, &store)).await;
        assert!(result.is_err());
    }
}
