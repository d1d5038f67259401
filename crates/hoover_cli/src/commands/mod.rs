//! CLI command implementations.

pub mod inspect;
pub mod replay;
pub mod reset;
pub mod slug;

use hoover_core::PersistedState;
use std::path::Path;

/// Reads and decodes the state file, or `None` if it does not exist.
pub fn read_state(path: &Path) -> Result<Option<PersistedState>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(None);
    }
    let blob = std::fs::read(path)?;
    Ok(Some(PersistedState::decode(&blob)?))
}
