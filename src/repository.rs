//! The canonical, insertion-ordered card collection.
//!
//! All card mutation goes through [`CardRepository::create`] and
//! [`CardRepository::update`]; each one writes the whole collection back to storage.

use crate::models::Flashcard;
use crate::storage::{CARDS_KEY, Storage};
use log::{debug, info, warn};
use std::collections::BTreeSet;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Answer must not be empty")]
    EmptyAnswer,

    #[error("No card with id {0}")]
    NotFound(String),
}

/// Result of a successful [`CardRepository::create`].
#[derive(Debug, Clone)]
pub struct CreatedCard {
    pub card: Flashcard,
    /// Set only when the repository was empty before this card, so the caller can
    /// prompt the user to start studying.
    pub first_card: bool,
}

pub struct CardRepository {
    cards: Vec<Flashcard>,
    storage: Storage,
}

impl CardRepository {
    /// Loads the stored collection, or starts empty.
    pub fn load(storage: Storage) -> Self {
        let cards: Vec<Flashcard> = storage.load(CARDS_KEY, Vec::new());
        info!("Loaded {} cards", cards.len());
        Self { cards, storage }
    }

    pub fn all(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&Flashcard> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Validates and appends a new card.
    ///
    /// Question and answer are trimmed and must be non-empty. Tags are trimmed,
    /// empty tags dropped and repeats suppressed, keeping first-seen order.
    pub fn create(
        &mut self,
        question: &str,
        answer: &str,
        tags: &[String],
    ) -> Result<CreatedCard, CardError> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() {
            return Err(CardError::EmptyQuestion);
        }
        if answer.is_empty() {
            return Err(CardError::EmptyAnswer);
        }

        let mut clean_tags: Vec<String> = Vec::new();
        for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !clean_tags.iter().any(|t| t == tag) {
                clean_tags.push(tag.to_string());
            }
        }

        let first_card = self.cards.is_empty();
        let card = Flashcard::new(question, answer, clean_tags);
        self.cards.push(card.clone());
        self.persist();

        info!("Created card {} ({} total)", card.id, self.cards.len());
        Ok(CreatedCard { card, first_card })
    }

    /// Replaces the stored card with the same id.
    pub fn update(&mut self, card: Flashcard) -> Result<(), CardError> {
        let Some(slot) = self.cards.iter_mut().find(|c| c.id == card.id) else {
            warn!("Update for unknown card {}", card.id);
            return Err(CardError::NotFound(card.id));
        };

        debug!("Updated card {}", card.id);
        *slot = card;
        self.persist();
        Ok(())
    }

    /// Every tag used by any card, deduplicated and sorted.
    pub fn list_tags(&self) -> Vec<String> {
        self.cards
            .iter()
            .flat_map(|card| card.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn persist(&self) {
        self.storage.save(CARDS_KEY, &self.cards);
    }
}
