//! The survey field allow-list and payload normalizer.
//!
//! Both the autosave layer and the backend accept only fields named
//! here; anything else in a payload is dropped before it can reach the
//! database.

use crate::content;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Record-level columns that are not Likert items.
pub const RECORD_FIELDS: &[&str] = &[
    "story_text",
    "sentence_count",
    "word_count",
    "task_page_elapsed_ms",
    "ai_chat_log",
    "authorship_label",
    "authorship_reason",
    "age_group",
    "gender",
    "education_level",
    "email",
    "follow_up_consent",
    "additional_comments",
];

/// Every field the backend will persist: all Likert item ids plus the
/// record-level columns.
pub fn allowed_fields() -> &'static [&'static str] {
    static FIELDS: OnceLock<Vec<&'static str>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        let mut fields = content::all_item_ids();
        fields.extend_from_slice(RECORD_FIELDS);
        fields
    })
}

pub fn is_allowed(name: &str) -> bool {
    allowed_fields()
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Normalize an update payload: lowercase keys, drop nulls and anything
/// not on the allow-list. Returns the filtered map; an empty result
/// means there is nothing to persist.
pub fn normalize(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in payload {
        if value.is_null() {
            continue;
        }
        let lowered = key.to_ascii_lowercase();
        if is_allowed(&lowered) {
            out.insert(lowered, value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_unknown_fields_dropped() {
        let payload = map(&[
            ("wse1", json!(5)),
            ("drop_table", json!("x")),
            ("story_text", json!("從前")),
        ]);
        let normalized = normalize(&payload);
        assert_eq!(normalized.len(), 2);
        assert!(normalized.contains_key("wse1"));
        assert!(normalized.contains_key("story_text"));
        assert!(!normalized.contains_key("drop_table"));
    }

    #[test]
    fn test_case_insensitive_keys() {
        let payload = map(&[("Story_Text", json!("abc")), ("WSE1", json!(3))]);
        let normalized = normalize(&payload);
        assert_eq!(normalized.get("story_text"), Some(&json!("abc")));
        assert_eq!(normalized.get("wse1"), Some(&json!(3)));
    }

    #[test]
    fn test_nulls_skipped() {
        let payload = map(&[("email", Value::Null), ("gender", json!("female"))]);
        let normalized = normalize(&payload);
        assert_eq!(normalized.len(), 1);
        assert!(!normalized.contains_key("email"));
    }

    #[test]
    fn test_normalize_idempotent() {
        let payload = map(&[
            ("Wse1", json!(7)),
            ("bogus", json!(1)),
            ("email", json!("a@b")),
        ]);
        let once = normalize(&payload);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_payload() {
        assert!(normalize(&Map::new()).is_empty());
    }
}
