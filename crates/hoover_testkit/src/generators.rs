//! Property-based test generators using proptest.
//!
//! Streams are drawn from a small id pool so duplicates show up often.

use hoover_core::{ContentId, Dimensions, Item, MediaKind};
use proptest::prelude::*;

/// Strategy for generating content ids from a pool of `pool` values.
pub fn content_id_strategy(pool: u32) -> impl Strategy<Value = ContentId> {
    (0..pool.max(1)).prop_map(|n| ContentId::new(format!("uid-{n}")))
}

/// Strategy for generating media kinds.
pub fn media_kind_strategy() -> impl Strategy<Value = MediaKind> {
    prop_oneof![
        3 => Just(MediaKind::Static),
        1 => Just(MediaKind::Animated),
        1 => Just(MediaKind::Video),
    ]
}

/// Strategy for generating image dimensions, some over 512 px.
pub fn dimensions_strategy() -> impl Strategy<Value = Dimensions> {
    (1u32..1024, 1u32..1024).prop_map(|(w, h)| Dimensions::new(w, h))
}

/// Strategy for generating a single item.
pub fn item_strategy(pool: u32) -> impl Strategy<Value = Item> {
    (content_id_strategy(pool), media_kind_strategy()).prop_map(|(id, kind)| {
        let file_ref = format!("file-{}", id.as_str());
        Item::new(id, file_ref, kind)
    })
}

/// Strategy for generating item streams of up to `max_len` items.
///
/// A redelivered id always carries the media kind of its first delivery.
pub fn item_stream_strategy(pool: u32, max_len: usize) -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec(item_strategy(pool), 0..max_len).prop_map(|items| {
        let mut kinds = std::collections::HashMap::new();
        items
            .into_iter()
            .map(|mut item| {
                item.kind = *kinds.entry(item.id.clone()).or_insert(item.kind);
                item
            })
            .collect()
    })
}
