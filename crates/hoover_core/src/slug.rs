//! Pack name allocation.
//!
//! Names have the shape `{base}_{index}_by_{owner}`. The platform is the
//! only naming authority, so a free name is found by probing candidates in
//! index order until the directory reports one as absent.

use crate::directory::PackDirectory;
use crate::error::{CoreError, CoreResult};
use tracing::debug;

/// Derives collision-free pack names by probing a [`PackDirectory`].
#[derive(Debug, Clone, Copy)]
pub struct SlugAllocator {
    probe_window: u32,
    max_len: usize,
}

impl SlugAllocator {
    /// Creates an allocator probing at most `probe_window` candidates and
    /// truncating names to `max_len` characters.
    #[must_use]
    pub const fn new(probe_window: u32, max_len: usize) -> Self {
        Self {
            probe_window,
            max_len,
        }
    }

    /// Lowercases `text` and strips everything outside `[a-z0-9_]`.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        text.chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
            .collect()
    }

    /// Candidate name for `index`, from already normalized parts.
    #[must_use]
    pub fn candidate(&self, base: &str, owner: &str, index: u64) -> String {
        let mut name = format!("{base}_{index}_by_{owner}");
        // Normalized names are ASCII, so byte truncation is safe.
        name.truncate(self.max_len);
        name
    }

    /// Finds the first free name at or after `start`.
    ///
    /// # Errors
    ///
    /// - `SlugExhausted` if every candidate in the window exists
    /// - Any directory error other than absence, immediately
    pub async fn allocate<D>(
        &self,
        directory: &D,
        base: &str,
        owner: &str,
        start: u64,
    ) -> CoreResult<String>
    where
        D: PackDirectory + ?Sized,
    {
        let base = Self::normalize(base);
        let owner = Self::normalize(owner);

        for offset in 0..u64::from(self.probe_window) {
            let index = start.saturating_add(offset);
            let name = self.candidate(&base, &owner, index);
            if !directory.exists(&name).await? {
                debug!(name = %name, probes = offset + 1, "allocated pack name");
                return Ok(name);
            }
        }

        Err(CoreError::SlugExhausted {
            base,
            start,
            window: self.probe_window,
        })
    }
}

impl Default for SlugAllocator {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_PROBE_WINDOW,
            crate::config::DEFAULT_MAX_NAME_LEN,
        )
    }
}
