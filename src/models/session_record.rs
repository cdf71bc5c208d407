//! Per-session bookkeeping persisted next to the navigation state.
use crate::models::Flashcard;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reviewed_at: DateTime<Utc>,
    pub mastered: bool,
}

/// Stored as `{startTime, cardsReviewed, sessionProgress}` with epoch-millisecond times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub cards_reviewed: usize,
    #[serde(default)]
    pub session_progress: BTreeMap<String, CardProgress>,
}

impl SessionRecord {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            start_time: now,
            cards_reviewed: 0,
            session_progress: BTreeMap::new(),
        }
    }

    /// Records the latest mastery state of `card`; `cards_reviewed` counts distinct cards.
    pub fn record_review(&mut self, card: &Flashcard, now: DateTime<Utc>) {
        self.session_progress.insert(
            card.id.clone(),
            CardProgress {
                reviewed_at: now,
                mastered: card.mastered,
            },
        );
        self.cards_reviewed = self.session_progress.len();
    }
}

/// Decodes the stored reviewed-id set.
///
/// The current shape is a JSON array of ids. Older data may hold an object (a set
/// serialized without special handling comes out as `{}`, a map keyed by id as
/// `{"id": ...}`); its keys are taken as the ids. Anything else is discarded.
pub fn decode_reviewed_ids(value: Option<serde_json::Value>) -> BTreeSet<String> {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id),
                other => {
                    warn!("Skipping non-string reviewed card id: {}", other);
                    None
                }
            })
            .collect(),
        Some(Value::Object(map)) => map.into_iter().map(|(id, _)| id).collect(),
        Some(other) => {
            warn!("Discarding reviewed card ids in unexpected shape: {}", other);
            BTreeSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_record_counts_distinct_cards() {
        let now = Utc::now();
        let mut record = SessionRecord::start(now);
        let mut card = Flashcard::new("q", "a", Vec::new());

        card.toggle_mastered(now);
        record.record_review(&card, now);
        card.toggle_mastered(now);
        record.record_review(&card, now);

        assert_eq!(record.cards_reviewed, 1);
        assert!(!record.session_progress[&card.id].mastered);
    }

    #[test]
    fn test_record_uses_epoch_millis() {
        let start = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record = SessionRecord::start(start);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["startTime"], 1_700_000_000_123_i64);
        assert_eq!(json["cardsReviewed"], 0);
        assert_eq!(json["sessionProgress"], json!({}));

        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_decode_array() {
        let ids = decode_reviewed_ids(Some(json!(["b", "a", "b", 3])));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_decode_legacy_object() {
        assert!(decode_reviewed_ids(Some(json!({}))).is_empty());

        let ids = decode_reviewed_ids(Some(json!({ "x": true, "y": 1 })));
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("x"));
    }

    #[test]
    fn test_decode_unexpected_shapes() {
        assert!(decode_reviewed_ids(None).is_empty());
        assert!(decode_reviewed_ids(Some(json!("abc"))).is_empty());
        assert!(decode_reviewed_ids(Some(json!(12))).is_empty());
    }
}
