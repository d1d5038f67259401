//! Allocator state and its persisted form.
//!
//! The state is a tagged variant, not a bag of flags: a pack is either being
//! filled (and then it has a name, a kind and a count) or there is none.
//!
//! ```text
//!            open                      append (count < cap)
//!   Empty ─────────▶ Filling(K) ◀──────────────┐
//!                      │  │  └─────────────────┘
//!                      │  │ full / kind change: open next index
//!                      │  ▼
//!   Vacated ◀──────────┘ Filling(K')
//!     │  pack vanished     ▲
//!     └────────────────────┘ open next index
//! ```
//!
//! `Vacated` remembers that a pack existed and was lost, so the pack opened
//! next supersedes it and takes a fresh index. It is persisted, so a restart
//! before the next pack opens does not hand out the lost pack's index again.

use crate::error::CoreResult;
use crate::ledger::IdentityLedger;
use crate::types::{ContentId, PackKind};
use serde::{Deserialize, Serialize};

/// Which pack is accepting items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackSlot {
    /// No pack has been opened under the current index.
    Empty,
    /// A pack is accepting items of one kind.
    Filling {
        /// Pack name.
        name: String,
        /// Kind of every member.
        kind: PackKind,
        /// Members placed so far.
        count: u32,
    },
    /// The current pack disappeared from the directory.
    Vacated {
        /// Name of the lost pack.
        name: String,
    },
}

/// Why a new pack must be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverReason {
    /// No pack is active.
    NoPack,
    /// The current pack reached its capacity.
    Full,
    /// The item's kind differs from the current pack's.
    KindChanged,
    /// The current pack vanished.
    Vacated,
}

impl std::fmt::Display for RolloverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NoPack => "no active pack",
            Self::Full => "pack full",
            Self::KindChanged => "kind changed",
            Self::Vacated => "pack vanished",
        })
    }
}

/// Where the next item of a kind goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Append to the current pack.
    Append {
        /// Current pack name.
        name: String,
    },
    /// Open a new pack.
    Open {
        /// Why.
        reason: RolloverReason,
    },
}

/// The mutable record the rollover machine owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorState {
    index: u64,
    slot: PackSlot,
}

impl AllocatorState {
    /// State of a fresh install: index 1, no pack.
    #[must_use]
    pub const fn blank() -> Self {
        Self {
            index: 1,
            slot: PackSlot::Empty,
        }
    }

    /// Creates a state directly.
    #[must_use]
    pub const fn from_parts(index: u64, slot: PackSlot) -> Self {
        Self { index, slot }
    }

    /// Index of the current (or last) pack.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index
    }

    /// The slot.
    #[must_use]
    pub const fn slot(&self) -> &PackSlot {
        &self.slot
    }

    /// Name of the pack accepting items.
    #[must_use]
    pub fn current_pack(&self) -> Option<&str> {
        match &self.slot {
            PackSlot::Filling { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Kind of the pack accepting items.
    #[must_use]
    pub const fn current_kind(&self) -> Option<PackKind> {
        match &self.slot {
            PackSlot::Filling { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Members placed in the current pack (0 when there is none).
    #[must_use]
    pub const fn member_count(&self) -> u32 {
        match &self.slot {
            PackSlot::Filling { count, .. } => *count,
            _ => 0,
        }
    }

    /// Decides where the next item of `kind` goes given `capacity`.
    #[must_use]
    pub fn plan(&self, kind: PackKind, capacity: u32) -> Placement {
        match &self.slot {
            PackSlot::Empty => Placement::Open {
                reason: RolloverReason::NoPack,
            },
            PackSlot::Vacated { .. } => Placement::Open {
                reason: RolloverReason::Vacated,
            },
            PackSlot::Filling {
                kind: current, ..
            } if *current != kind => Placement::Open {
                reason: RolloverReason::KindChanged,
            },
            PackSlot::Filling { count, .. } if *count >= capacity => Placement::Open {
                reason: RolloverReason::Full,
            },
            PackSlot::Filling { name, .. } => Placement::Append { name: name.clone() },
        }
    }

    /// Index the next opened pack is named with.
    ///
    /// Advances only when a previous pack existed and is being superseded.
    #[must_use]
    pub const fn next_index(&self) -> u64 {
        match self.slot {
            PackSlot::Empty => self.index,
            PackSlot::Filling { .. } | PackSlot::Vacated { .. } => self.index.saturating_add(1),
        }
    }

    /// Records a pack opened under `index` holding its first member.
    ///
    /// `index` never moves backwards.
    pub fn opened(&mut self, index: u64, name: String, kind: PackKind) {
        self.index = self.index.max(index);
        self.slot = PackSlot::Filling {
            name,
            kind,
            count: 1,
        };
    }

    /// Records one more member in the current pack.
    pub fn appended(&mut self) {
        if let PackSlot::Filling { count, .. } = &mut self.slot {
            *count = count.saturating_add(1);
        }
    }

    /// Drops the current pack after it vanished. `index` is untouched.
    pub fn vacate(&mut self) {
        let slot = std::mem::replace(&mut self.slot, PackSlot::Empty);
        self.slot = match slot {
            PackSlot::Filling { name, .. } | PackSlot::Vacated { name } => {
                PackSlot::Vacated { name }
            }
            PackSlot::Empty => PackSlot::Empty,
        };
    }

    /// Name of the lost pack while vacated.
    #[must_use]
    pub fn vacated_pack(&self) -> Option<&str> {
        match &self.slot {
            PackSlot::Vacated { name } => Some(name),
            _ => None,
        }
    }

    /// Overwrites count and kind of the current pack with what the
    /// directory reports. Returns true if anything changed.
    pub fn reconcile(&mut self, actual_count: u32, actual_kind: PackKind) -> bool {
        if let PackSlot::Filling { kind, count, .. } = &mut self.slot {
            let changed = *kind != actual_kind || *count != actual_count;
            *kind = actual_kind;
            *count = actual_count;
            return changed;
        }
        false
    }
}

impl Default for AllocatorState {
    fn default() -> Self {
        Self::blank()
    }
}

fn default_index() -> u64 {
    1
}

/// On-disk layout of the allocator state.
///
/// ```json
/// { "index": 3, "count": 17, "current_pack": "stickies_3_by_bot",
///   "is_animated": false, "seen": ["AgAD..."] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Pack naming counter.
    #[serde(default = "default_index")]
    pub index: u64,
    /// Members in the current pack.
    #[serde(default)]
    pub count: u32,
    /// Current pack, empty when none.
    #[serde(default, alias = "currentPack")]
    pub current_pack: String,
    /// Kind of the current pack.
    #[serde(default, alias = "isAnimatedKind")]
    pub is_animated: bool,
    /// Pack that vanished and has not been superseded yet, empty when none.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vacated: String,
    /// Every admitted identity.
    #[serde(default)]
    pub seen: Vec<ContentId>,
}

impl PersistedState {
    /// Captures `state` and `ledger`.
    #[must_use]
    pub fn capture(state: &AllocatorState, seen: Vec<ContentId>) -> Self {
        Self {
            index: state.index(),
            count: state.member_count(),
            current_pack: state.current_pack().unwrap_or_default().to_string(),
            is_animated: state.current_kind().is_some_and(PackKind::is_animated),
            vacated: state.vacated_pack().unwrap_or_default().to_string(),
            seen,
        }
    }

    /// Splits into live state and ledger.
    ///
    /// A current pack takes precedence over a stale `vacated` entry.
    #[must_use]
    pub fn restore(self) -> (AllocatorState, IdentityLedger) {
        let slot = if !self.current_pack.is_empty() {
            PackSlot::Filling {
                name: self.current_pack,
                kind: PackKind::from_animated(self.is_animated),
                count: self.count,
            }
        } else if !self.vacated.is_empty() {
            PackSlot::Vacated { name: self.vacated }
        } else {
            PackSlot::Empty
        };
        let state = AllocatorState::from_parts(self.index.max(1), slot);
        (state, self.seen.into_iter().collect())
    }

    /// Serializes as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if serialization fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parses a blob.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if the blob is not valid state JSON.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
