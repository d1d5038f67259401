//! Hoover configuration.

use crate::error::{CoreError, CoreResult};
use crate::types::{OwnerId, PackKind};

/// Default base name for generated packs.
pub const DEFAULT_BASE_NAME: &str = "stickies";
/// Platform limit for static packs.
pub const DEFAULT_STATIC_CAPACITY: u32 = 120;
/// Platform limit for animated and video packs.
pub const DEFAULT_ANIMATED_CAPACITY: u32 = 50;
/// Longest side accepted for static items, in pixels.
pub const DEFAULT_MAX_STATIC_SIDE: u32 = 512;
/// Number of candidate names probed before giving up.
pub const DEFAULT_PROBE_WINDOW: u32 = 1000;
/// Maximum length of a pack name.
pub const DEFAULT_MAX_NAME_LEN: usize = 64;
/// Label used for items that arrive without one.
pub const DEFAULT_EMOJI: &str = "🙂";

/// Configuration for pack allocation.
#[derive(Debug, Clone)]
pub struct HooverConfig {
    /// User that owns every pack.
    pub owner_id: OwnerId,
    /// Suffix token in generated names (the bot handle).
    pub owner_token: String,
    /// Base name for generated packs.
    pub base_name: String,
    /// Packs whose contents seed the ledger at startup.
    pub reference_packs: Vec<String>,
    /// Capacity of static packs.
    pub static_capacity: u32,
    /// Capacity of animated/video packs.
    pub animated_capacity: u32,
    /// Static items with a longer side are shrunk before submission.
    pub max_static_side: u32,
    /// Candidate names probed per allocation.
    pub probe_window: u32,
    /// Generated names are truncated to this length.
    pub max_name_len: usize,
    /// Emoji for items without a label.
    pub default_emoji: String,
}

impl HooverConfig {
    /// Creates a configuration for `owner_id`, naming packs after `owner_token`.
    pub fn new(owner_id: OwnerId, owner_token: impl Into<String>) -> Self {
        Self {
            owner_id,
            owner_token: owner_token.into(),
            base_name: DEFAULT_BASE_NAME.to_string(),
            reference_packs: Vec::new(),
            static_capacity: DEFAULT_STATIC_CAPACITY,
            animated_capacity: DEFAULT_ANIMATED_CAPACITY,
            max_static_side: DEFAULT_MAX_STATIC_SIDE,
            probe_window: DEFAULT_PROBE_WINDOW,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            default_emoji: DEFAULT_EMOJI.to_string(),
        }
    }

    /// Sets the base pack name.
    #[must_use]
    pub fn with_base_name(mut self, base: impl Into<String>) -> Self {
        self.base_name = base.into();
        self
    }

    /// Sets the reference packs.
    #[must_use]
    pub fn with_reference_packs(mut self, packs: Vec<String>) -> Self {
        self.reference_packs = packs;
        self
    }

    /// Sets both pack capacities.
    #[must_use]
    pub fn with_capacities(mut self, static_capacity: u32, animated_capacity: u32) -> Self {
        self.static_capacity = static_capacity;
        self.animated_capacity = animated_capacity;
        self
    }

    /// Sets the maximum static side length.
    #[must_use]
    pub fn with_max_static_side(mut self, side: u32) -> Self {
        self.max_static_side = side;
        self
    }

    /// Sets the slug probe window.
    #[must_use]
    pub fn with_probe_window(mut self, window: u32) -> Self {
        self.probe_window = window;
        self
    }

    /// Capacity for packs of `kind`.
    #[must_use]
    pub fn capacity(&self, kind: PackKind) -> u32 {
        match kind {
            PackKind::Static => self.static_capacity,
            PackKind::Animated => self.animated_capacity,
        }
    }

    /// Human title for the pack numbered `index`, e.g. `Stickies 3`.
    #[must_use]
    pub fn pack_title(&self, index: u64) -> String {
        let mut chars = self.base_name.chars();
        let base: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        format!("{base} {index}")
    }

    /// Checks limits for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on zero capacities, an empty probe window or
    /// an empty owner token.
    pub fn validate(&self) -> CoreResult<()> {
        if self.static_capacity == 0 || self.animated_capacity == 0 {
            return Err(CoreError::invalid_config("pack capacities must be positive"));
        }
        if self.probe_window == 0 {
            return Err(CoreError::invalid_config("probe window must be positive"));
        }
        if self.max_static_side == 0 {
            return Err(CoreError::invalid_config("max static side must be positive"));
        }
        if self.owner_token.trim().is_empty() {
            return Err(CoreError::invalid_config("owner token is required"));
        }
        Ok(())
    }
}

impl Default for HooverConfig {
    fn default() -> Self {
        Self::new(OwnerId(0), "hoover_bot")
    }
}

/// Parses a comma-separated pack list, dropping blanks.
#[must_use]
pub fn parse_reference_packs(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HooverConfig::default();
        assert_eq!(config.base_name, "stickies");
        assert_eq!(config.capacity(PackKind::Static), 120);
        assert_eq!(config.capacity(PackKind::Animated), 50);
        assert_eq!(config.max_static_side, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = HooverConfig::new(OwnerId(42), "hoover_bot")
            .with_base_name("memes")
            .with_capacities(2, 1)
            .with_reference_packs(vec!["a".into()]);

        assert_eq!(config.owner_id, OwnerId(42));
        assert_eq!(config.capacity(PackKind::Static), 2);
        assert_eq!(config.capacity(PackKind::Animated), 1);
        assert_eq!(config.reference_packs, vec!["a".to_string()]);
    }

    #[test]
    fn pack_title_capitalises() {
        let config = HooverConfig::default().with_base_name("sTICKIES");
        assert_eq!(config.pack_title(3), "Stickies 3");
        assert_eq!(HooverConfig::default().with_base_name("").pack_title(1), " 1");
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = HooverConfig::default().with_capacities(0, 50);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let config = HooverConfig::new(OwnerId(1), "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn reference_pack_parsing() {
        assert_eq!(
            parse_reference_packs(" cats_by_x, ,dogs_by_x,"),
            vec!["cats_by_x".to_string(), "dogs_by_x".to_string()]
        );
        assert!(parse_reference_packs("").is_empty());
    }
}
