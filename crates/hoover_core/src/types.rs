//! Core type definitions for the hoover.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform-assigned stable identity of a media payload.
///
/// The identity survives re-uploads of the same payload and is the only
/// dedup key. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Creates a content identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Numeric identity of the user that owns every pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Media kind of an inbound item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image (PNG/WEBP).
    Static,
    /// Vector animation.
    Animated,
    /// Video sticker.
    Video,
}

impl MediaKind {
    /// The pack kind this media files into.
    ///
    /// Animated and video items share packs.
    #[must_use]
    pub const fn pack_kind(self) -> PackKind {
        match self {
            Self::Static => PackKind::Static,
            Self::Animated | Self::Video => PackKind::Animated,
        }
    }

    /// Platform format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Animated => "animated",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind flag of a pack. A pack never mixes kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackKind {
    /// Static images only.
    Static,
    /// Animated and video items.
    Animated,
}

impl PackKind {
    /// Maps the persisted `is_animated` flag to a kind.
    #[must_use]
    pub const fn from_animated(animated: bool) -> Self {
        if animated {
            Self::Animated
        } else {
            Self::Static
        }
    }

    /// Returns true for animated/video packs.
    #[must_use]
    pub const fn is_animated(self) -> bool {
        matches!(self, Self::Animated)
    }
}

impl fmt::Display for PackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Animated => f.write_str("animated"),
        }
    }
}

/// Pixel dimensions as declared by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The longer side.
    #[must_use]
    pub const fn max_side(self) -> u32 {
        if self.width > self.height {
            self.width
        } else {
            self.height
        }
    }

    /// Returns true if either side exceeds `limit`.
    #[must_use]
    pub const fn exceeds(self, limit: u32) -> bool {
        self.width > limit || self.height > limit
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Where an item arrived, used to route acknowledgments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Chat the item was posted in.
    pub chat_id: i64,
    /// Message carrying the item, if known.
    #[serde(default)]
    pub message_id: Option<i64>,
    /// Sender of the message, if known.
    #[serde(default)]
    pub sender_id: Option<i64>,
}

impl ChatContext {
    /// Creates a context for `chat_id`.
    #[must_use]
    pub const fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            message_id: None,
            sender_id: None,
        }
    }

    /// Sets the message id.
    #[must_use]
    pub const fn with_message(mut self, message_id: i64) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Sets the sender id.
    #[must_use]
    pub const fn with_sender(mut self, sender_id: i64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }
}

/// A single inbound submission. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Dedup key.
    pub id: ContentId,
    /// Platform file reference used to re-submit or download the payload.
    pub file_ref: String,
    /// Media kind.
    pub kind: MediaKind,
    /// Declared dimensions; only meaningful for static items.
    #[serde(default)]
    pub dimensions: Dimensions,
    /// Optional emoji label.
    #[serde(default)]
    pub emoji: Option<String>,
    /// Originating chat.
    #[serde(default)]
    pub context: ChatContext,
}

impl Item {
    /// Creates an item with default dimensions, no label and an empty context.
    pub fn new(id: impl Into<ContentId>, file_ref: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            file_ref: file_ref.into(),
            kind,
            dimensions: Dimensions::default(),
            emoji: None,
            context: ChatContext::default(),
        }
    }

    /// Sets the declared dimensions.
    #[must_use]
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Dimensions::new(width, height);
        self
    }

    /// Sets the emoji label.
    #[must_use]
    pub fn with_emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    /// Sets the originating chat context.
    #[must_use]
    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }
}

/// Payload handed to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickerSource {
    /// Re-use the platform file as is.
    FileRef(String),
    /// Upload new bytes (a shrunk image).
    Upload(Bytes),
}

/// What gets created or appended in a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    /// Identity of the item.
    pub id: ContentId,
    /// Payload.
    pub source: StickerSource,
    /// Emoji label (defaulted when the item had none).
    pub emoji: String,
    /// Media kind.
    pub kind: MediaKind,
}

impl PackEntry {
    /// Builds an entry that re-uses the item's platform file.
    #[must_use]
    pub fn from_item(item: &Item, default_emoji: &str) -> Self {
        Self {
            id: item.id.clone(),
            source: StickerSource::FileRef(item.file_ref.clone()),
            emoji: item
                .emoji
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| default_emoji.to_string()),
            kind: item.kind,
        }
    }

    /// Replaces the payload with uploaded bytes.
    #[must_use]
    pub fn with_upload(mut self, bytes: Bytes) -> Self {
        self.source = StickerSource::Upload(bytes);
        self
    }

    /// Pack kind of this entry.
    #[must_use]
    pub const fn pack_kind(&self) -> PackKind {
        self.kind.pack_kind()
    }
}
