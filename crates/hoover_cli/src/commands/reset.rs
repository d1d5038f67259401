//! Reset command implementation.

use hoover_core::PersistedState;
use hoover_storage::{FileStore, StateStore};
use std::path::Path;

/// Forgets the current pack the same way a vanished pack is dropped, so the
/// next pack opens under a fresh index. With `full`, also clears the ledger.
pub fn reset_state(state: PersistedState, full: bool) -> PersistedState {
    let (mut allocator, ledger) = state.restore();
    allocator.vacate();
    let seen = if full { Vec::new() } else { ledger.to_sorted_vec() };
    PersistedState::capture(&allocator, seen)
}

/// Runs the reset command.
///
/// Holds the store lock, so it fails while the hoover is running.
pub fn run(path: &Path, full: bool, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;
    let current = match store.load()? {
        Some(blob) => PersistedState::decode(&blob)?,
        None => return Err(format!("No state file found at {:?}", path).into()),
    };

    let pack = if current.current_pack.is_empty() {
        "-".to_string()
    } else {
        current.current_pack.clone()
    };
    let seen = current.seen.len();
    let next = reset_state(current, full);

    println!("Reset {}", store.describe());
    println!("  Current pack:  {} -> -", pack);
    println!("  Index:         {}", next.index);
    println!("  Seen:          {} -> {}", seen, next.seen.len());

    if dry_run {
        println!();
        println!("Dry run - nothing written");
        return Ok(());
    }

    store.store(&next.encode()?)?;
    tracing::info!(path = %path.display(), full, "state reset");
    Ok(())
}
