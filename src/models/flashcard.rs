//! Flashcard is a question/answer pair with free-text tags and mastery progress.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mastered: bool,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl Flashcard {
    /// Builds a fresh, never-reviewed card with a new id.
    pub fn new(question: impl Into<String>, answer: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: new_card_id(),
            question: question.into(),
            answer: answer.into(),
            tags,
            mastered: false,
            review_count: 0,
            last_reviewed: None,
        }
    }

    /// Exact, case-sensitive tag membership.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Flips the mastery flag and records the review.
    pub fn toggle_mastered(&mut self, now: DateTime<Utc>) {
        self.mastered = !self.mastered;
        self.review_count = self.review_count.saturating_add(1);
        self.last_reviewed = Some(now);
    }
}

/// UUIDv7: millisecond timestamp followed by random bits.
fn new_card_id() -> String {
    Uuid::now_v7().to_string()
}
