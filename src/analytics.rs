//! Read-only learning statistics over the card collection.
use crate::models::Flashcard;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

pub const MOST_STUDIED_LIMIT: usize = 5;
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagStats {
    pub total: usize,
    pub mastered: usize,
    pub reviews: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insight {
    /// Completion of at least 80%.
    GreatProgress,
    /// More than three reviews per reviewed card.
    DedicatedLearner,
    /// More than five cards reviewed in the last week.
    ActiveStudent,
    /// Under 50% completion with more than three cards.
    KeepGoing,
}

impl Insight {
    pub fn message(self) -> &'static str {
        match self {
            Insight::GreatProgress => "Great progress! You have mastered most of your cards.",
            Insight::DedicatedLearner => "Dedicated learner: you review each card several times.",
            Insight::ActiveStudent => "You have been active this week. Keep it up!",
            Insight::KeepGoing => "Keep going! Regular practice will raise your mastery rate.",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LearningStats<'a> {
    pub total_cards: usize,
    pub mastered_cards: usize,
    /// Percentage in `0.0..=100.0`.
    pub completion_rate: f64,
    pub reviewed_cards: usize,
    pub total_reviews: u64,
    pub average_reviews: f64,
    pub tag_stats: BTreeMap<String, TagStats>,
    /// Highest review counts first; ties keep collection order.
    pub most_studied: Vec<&'a Flashcard>,
    /// Cards reviewed within the last seven days.
    pub recent_activity: usize,
}

impl<'a> LearningStats<'a> {
    pub fn compute(cards: &'a [Flashcard], now: DateTime<Utc>) -> Self {
        let total_cards = cards.len();
        let mastered_cards = cards.iter().filter(|card| card.mastered).count();
        let completion_rate = if total_cards == 0 {
            0.0
        } else {
            mastered_cards as f64 / total_cards as f64 * 100.0
        };

        let reviewed_cards = cards.iter().filter(|card| card.review_count > 0).count();
        let total_reviews: u64 = cards.iter().map(|card| u64::from(card.review_count)).sum();
        let average_reviews = if reviewed_cards == 0 {
            0.0
        } else {
            total_reviews as f64 / reviewed_cards as f64
        };

        let mut tag_stats: BTreeMap<String, TagStats> = BTreeMap::new();
        for card in cards {
            for tag in &card.tags {
                let stats = tag_stats.entry(tag.clone()).or_default();
                stats.total += 1;
                if card.mastered {
                    stats.mastered += 1;
                }
                stats.reviews += u64::from(card.review_count);
            }
        }

        // sort_by is stable, so equal counts keep collection order.
        let mut most_studied: Vec<&Flashcard> = cards.iter().collect();
        most_studied.sort_by(|a, b| b.review_count.cmp(&a.review_count));
        most_studied.truncate(MOST_STUDIED_LIMIT);

        let window_start = now - Duration::days(RECENT_WINDOW_DAYS);
        let recent_activity = cards
            .iter()
            .filter(|card| card.last_reviewed.is_some_and(|at| at > window_start))
            .count();

        Self {
            total_cards,
            mastered_cards,
            completion_rate,
            reviewed_cards,
            total_reviews,
            average_reviews,
            tag_stats,
            most_studied,
            recent_activity,
        }
    }

    pub fn insights(&self) -> Vec<Insight> {
        let mut insights = Vec::new();
        if self.completion_rate >= 80.0 {
            insights.push(Insight::GreatProgress);
        }
        if self.average_reviews > 3.0 {
            insights.push(Insight::DedicatedLearner);
        }
        if self.recent_activity > 5 {
            insights.push(Insight::ActiveStudent);
        }
        if self.completion_rate < 50.0 && self.total_cards > 3 {
            insights.push(Insight::KeepGoing);
        }
        insights
    }
}
