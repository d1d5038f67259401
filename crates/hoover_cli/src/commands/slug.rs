//! Slug preview command implementation.

use hoover_core::{HooverConfig, SlugAllocator};

/// Candidate names and titles for `count` indices from `start`.
///
/// Names are what the allocator tries first; a taken name makes it probe
/// the following indices.
pub fn preview(config: &HooverConfig, start: u64, count: u64) -> Vec<(u64, String, String)> {
    let slugs = SlugAllocator::new(config.probe_window, config.max_name_len);
    let base = SlugAllocator::normalize(&config.base_name);
    let owner = SlugAllocator::normalize(&config.owner_token);
    (start.max(1)..start.max(1).saturating_add(count))
        .map(|index| {
            (
                index,
                slugs.candidate(&base, &owner, index),
                config.pack_title(index),
            )
        })
        .collect()
}

/// Runs the slug command.
pub fn run(config: &HooverConfig, start: u64, count: u64) {
    for (index, name, title) in preview(config, start, count) {
        println!("{index:>6}  {name:<40} {title}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoover_core::OwnerId;

    #[test]
    fn preview_lists_names_and_titles() {
        let config = HooverConfig::new(OwnerId(1), "My_Bot").with_base_name("Stickies");
        let names = preview(&config, 3, 2);
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].0, 3);
        assert_eq!(names[0].2, "Stickies 3");
        assert_eq!(names[1].2, "Stickies 4");
        assert!(names[0].1.starts_with(&SlugAllocator::normalize("Stickies")));
        assert!(names[1].1.contains("_4_by_"));
    }

    #[test]
    fn index_zero_is_skipped() {
        let config = HooverConfig::default();
        let names = preview(&config, 0, 1);
        assert_eq!(names[0].0, 1);
    }
}
