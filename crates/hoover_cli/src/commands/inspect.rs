//! Inspect command implementation.

use super::read_state;
use hoover_core::PersistedState;
use serde::Serialize;
use std::path::Path;

/// State file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// State file path.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Index of the next pack.
    pub index: u64,
    /// Pack being filled, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_pack: Option<String>,
    /// Pack that vanished and has not been superseded yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vacated: Option<String>,
    /// Kind of the current pack.
    pub kind: &'static str,
    /// Members in the current pack.
    pub count: u32,
    /// Number of seen identities.
    pub seen_count: usize,
    /// Seen identities (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen: Option<Vec<String>>,
}

impl InspectResult {
    fn from_state(path: &Path, size: u64, state: PersistedState, show_seen: bool) -> Self {
        let current_pack = (!state.current_pack.is_empty()).then(|| state.current_pack.clone());
        let kind = match (&current_pack, state.is_animated) {
            (None, _) => "-",
            (Some(_), true) => "animated",
            (Some(_), false) => "static",
        };
        Self {
            path: path.display().to_string(),
            size,
            index: state.index,
            current_pack,
            vacated: (!state.vacated.is_empty()).then(|| state.vacated.clone()),
            kind,
            count: state.count,
            seen_count: state.seen.len(),
            seen: show_seen.then(|| state.seen.iter().map(|id| id.to_string()).collect()),
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, show_seen: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = read_state(path)?.ok_or_else(|| format!("No state file found at {:?}", path))?;
    let size = std::fs::metadata(path)?.len();
    let result = InspectResult::from_state(path, size, state, show_seen);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Hoover State Inspection");
    println!("=======================");
    println!();
    println!("Path: {} ({} bytes)", result.path, result.size);
    println!();
    println!("Allocator:");
    println!("  Index:         {}", result.index);
    println!(
        "  Current pack:  {}",
        result.current_pack.as_deref().unwrap_or("-")
    );
    if let Some(vacated) = &result.vacated {
        println!("  Vacated:       {vacated}");
    }
    println!("  Kind:          {}", result.kind);
    println!("  Members:       {}", result.count);
    println!();
    println!("Ledger:");
    println!("  Seen:          {}", result.seen_count);

    if let Some(seen) = &result.seen {
        println!();
        for id in seen {
            println!("  {id}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pack_reports_no_kind() {
        let state = PersistedState::decode(br#"{"index": 4, "seen": ["b", "a"]}"#).unwrap();
        let result = InspectResult::from_state(Path::new("s.json"), 10, state, true);
        assert_eq!(result.index, 4);
        assert_eq!(result.current_pack, None);
        assert_eq!(result.kind, "-");
        assert_eq!(result.seen_count, 2);
        assert_eq!(result.seen.unwrap().len(), 2);
    }

    #[test]
    fn current_pack_reports_kind() {
        let state = PersistedState::decode(
            br#"{"index": 2, "count": 7, "currentPack": "stickies_2_by_bot", "isAnimatedKind": true}"#,
        )
        .unwrap();
        let result = InspectResult::from_state(Path::new("s.json"), 10, state, false);
        assert_eq!(result.current_pack.as_deref(), Some("stickies_2_by_bot"));
        assert_eq!(result.kind, "animated");
        assert_eq!(result.count, 7);
        assert!(result.seen.is_none());
        assert!(result.vacated.is_none());
    }

    #[test]
    fn vacated_pack_is_reported() {
        let state =
            PersistedState::decode(br#"{"index": 3, "vacated": "stickies_3_by_bot"}"#).unwrap();
        let result = InspectResult::from_state(Path::new("s.json"), 10, state, false);
        assert_eq!(result.current_pack, None);
        assert_eq!(result.vacated.as_deref(), Some("stickies_3_by_bot"));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"vacated\":\"stickies_3_by_bot\""));
    }
}
