//! Study session state machine.
//!
//! The session is a cursor into a filtered view of the card repository plus a flip
//! flag. The view is never stored: it is recomputed from the repository on every
//! call, so repository updates are always reflected. Navigation and filter state
//! is persisted after each transition so a session survives a restart.

use super::Flashcard;
use super::session_record::{SessionRecord, decode_reviewed_ids};
use crate::repository::CardRepository;
use crate::storage::{
    CURRENT_INDEX_KEY, REVIEWED_CARDS_KEY, SELECTED_TAG_KEY, SESSION_KEY, SHOW_MASTERED_KEY,
    Storage,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rand::Rng;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Tag filter value that matches every card.
pub const ALL_TAGS: &str = "all";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterChange {
    Tag(String),
    ShowMastered(bool),
}

/// What the study screen should show.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StudyView<'a> {
    /// The repository is empty; only a way back is offered.
    NoCards,
    /// Cards exist but none match the filters, typically because all are mastered.
    AllMastered,
    /// The cursor lies outside the view, e.g. after the current card left it.
    NoCurrentCard,
    Card(&'a Flashcard),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudyProgress {
    /// 1-based position of the current card, 0 when there is none.
    pub position: usize,
    pub total: usize,
    pub mastered_in_view: usize,
    pub reviewed_this_session: usize,
}

pub struct StudySession {
    cursor: usize,
    is_flipped: bool,
    selected_tag: String,
    show_mastered: bool,
    reviewed_card_ids: BTreeSet<String>,
    record: SessionRecord,
    pending_advance: Option<Instant>,
    auto_advance_delay: Duration,
    storage: Storage,
}

impl StudySession {
    /// Restores the last session from storage, or starts a fresh one.
    pub fn restore(storage: Storage, auto_advance_delay: Duration) -> Self {
        let cursor: usize = storage.load(CURRENT_INDEX_KEY, 0);
        let selected_tag: String = storage.load(SELECTED_TAG_KEY, ALL_TAGS.to_string());
        let show_mastered: bool = storage.load(SHOW_MASTERED_KEY, false);
        let reviewed_card_ids = decode_reviewed_ids(storage.load_json(REVIEWED_CARDS_KEY));

        let record = match storage.load::<Option<SessionRecord>>(SESSION_KEY, None) {
            Some(record) => record,
            None => {
                let record = SessionRecord::start(Utc::now());
                storage.save(SESSION_KEY, &record);
                record
            }
        };

        debug!(
            "Restored study session: cursor {}, tag '{}', show mastered {}, {} reviewed",
            cursor,
            selected_tag,
            show_mastered,
            reviewed_card_ids.len()
        );

        Self {
            cursor,
            is_flipped: false,
            selected_tag,
            show_mastered,
            reviewed_card_ids,
            record,
            pending_advance: None,
            auto_advance_delay,
            storage,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    pub fn selected_tag(&self) -> &str {
        &self.selected_tag
    }

    pub fn show_mastered(&self) -> bool {
        self.show_mastered
    }

    pub fn reviewed_card_ids(&self) -> &BTreeSet<String> {
        &self.reviewed_card_ids
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    /// Deadline of the scheduled auto-advance, if one is pending.
    pub fn auto_advance_due(&self) -> Option<Instant> {
        self.pending_advance
    }

    /// Cards matching the tag and mastery filters, in repository order.
    pub fn filtered_view<'a>(&self, repo: &'a CardRepository) -> Vec<&'a Flashcard> {
        repo.all()
            .iter()
            .filter(|card| self.selected_tag == ALL_TAGS || card.has_tag(&self.selected_tag))
            .filter(|card| self.show_mastered || !card.mastered)
            .collect()
    }

    pub fn current_card<'a>(&self, repo: &'a CardRepository) -> Option<&'a Flashcard> {
        self.filtered_view(repo).get(self.cursor).copied()
    }

    pub fn study_view<'a>(&self, repo: &'a CardRepository) -> StudyView<'a> {
        if repo.is_empty() {
            return StudyView::NoCards;
        }

        let view = self.filtered_view(repo);
        if view.is_empty() {
            return StudyView::AllMastered;
        }

        match view.get(self.cursor) {
            Some(card) => StudyView::Card(card),
            None => StudyView::NoCurrentCard,
        }
    }

    pub fn progress(&self, repo: &CardRepository) -> StudyProgress {
        let view = self.filtered_view(repo);
        let position = if self.cursor < view.len() {
            self.cursor + 1
        } else {
            0
        };
        StudyProgress {
            position,
            total: view.len(),
            mastered_in_view: view.iter().filter(|card| card.mastered).count(),
            reviewed_this_session: self.reviewed_card_ids.len(),
        }
    }

    /// Applies a filter change and rewinds to the first card, face down.
    pub fn change_filter(&mut self, change: FilterChange) {
        match change {
            FilterChange::Tag(tag) => {
                self.selected_tag = tag;
                self.storage.save(SELECTED_TAG_KEY, &self.selected_tag);
            }
            FilterChange::ShowMastered(show) => {
                self.show_mastered = show;
                self.storage.save(SHOW_MASTERED_KEY, &self.show_mastered);
            }
        }

        debug!(
            "Filter changed: tag '{}', show mastered {}",
            self.selected_tag, self.show_mastered
        );
        self.pending_advance = None;
        self.is_flipped = false;
        self.set_cursor(0);
    }

    pub fn flip(&mut self, repo: &CardRepository) {
        if self.filtered_view(repo).is_empty() {
            return;
        }
        self.is_flipped = !self.is_flipped;
    }

    /// Moves to the next card, staying put on the last one.
    pub fn next(&mut self, repo: &CardRepository) {
        self.pending_advance = None;
        self.advance(repo);
    }

    /// Moves to the previous card, staying put on the first one.
    pub fn previous(&mut self) {
        self.pending_advance = None;
        self.is_flipped = false;
        if self.cursor > 0 {
            self.set_cursor(self.cursor - 1);
        }
    }

    /// Jumps to one uniformly random card of the view.
    pub fn shuffle(&mut self, repo: &CardRepository) {
        self.shuffle_with(repo, &mut rand::thread_rng());
    }

    pub fn shuffle_with<R: Rng>(&mut self, repo: &CardRepository, rng: &mut R) {
        self.pending_advance = None;
        self.is_flipped = false;

        let len = self.filtered_view(repo).len();
        if len > 0 {
            self.set_cursor(rng.gen_range(0..len));
        }
    }

    /// Toggles mastery of the current card.
    ///
    /// Returns the updated card, or `None` when there is no current card. Marking a
    /// card as mastered schedules an automatic advance unless it was the last card.
    pub fn toggle_mastered(&mut self, repo: &mut CardRepository) -> Option<Flashcard> {
        self.toggle_mastered_at(repo, Utc::now(), Instant::now())
    }

    pub fn toggle_mastered_at(
        &mut self,
        repo: &mut CardRepository,
        now: DateTime<Utc>,
        clock: Instant,
    ) -> Option<Flashcard> {
        let view_len = self.filtered_view(repo).len();
        let mut card = self.current_card(repo)?.clone();

        card.toggle_mastered(now);
        if let Err(e) = repo.update(card.clone()) {
            warn!("Failed to record review of card {}: {}", card.id, e);
            return None;
        }

        self.reviewed_card_ids.insert(card.id.clone());
        self.record.record_review(&card, now);
        self.storage.save(REVIEWED_CARDS_KEY, &self.reviewed_card_ids);
        self.storage.save(SESSION_KEY, &self.record);

        // A newly mastered card drops out of a view that hides mastered cards, so the
        // cursor now sits on a different card.
        if card.mastered && !self.show_mastered {
            self.is_flipped = false;
        }
        if card.mastered && self.cursor + 1 < view_len {
            self.pending_advance = Some(clock + self.auto_advance_delay);
        }

        debug!(
            "Card {} mastered={} after {} reviews",
            card.id, card.mastered, card.review_count
        );
        Some(card)
    }

    /// Fires the scheduled auto-advance once its deadline has passed.
    ///
    /// The advance is applied to the view as it is when it fires. Any navigation or
    /// filter change in the meantime cancels it.
    pub fn poll_auto_advance(&mut self, repo: &CardRepository, now: Instant) -> bool {
        match self.pending_advance {
            Some(due) if now >= due => {
                self.pending_advance = None;
                self.advance(repo);
                true
            }
            _ => false,
        }
    }

    /// Pulls a stale cursor back onto the last card of the view.
    pub fn clamp_cursor(&mut self, repo: &CardRepository) {
        let len = self.filtered_view(repo).len();
        let clamped = self.cursor.min(len.saturating_sub(1));
        if clamped != self.cursor {
            debug!("Clamping cursor {} to {}", self.cursor, clamped);
            self.set_cursor(clamped);
        }
    }

    /// Forgets which cards were reviewed and starts a new session record.
    pub fn reset_session(&mut self, now: DateTime<Utc>) {
        self.reviewed_card_ids.clear();
        self.record = SessionRecord::start(now);
        self.storage.save(REVIEWED_CARDS_KEY, &self.reviewed_card_ids);
        self.storage.save(SESSION_KEY, &self.record);
    }

    fn advance(&mut self, repo: &CardRepository) {
        self.is_flipped = false;
        let len = self.filtered_view(repo).len();
        if self.cursor + 1 < len {
            self.set_cursor(self.cursor + 1);
        }
    }

    fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.storage.save(CURRENT_INDEX_KEY, &self.cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const DELAY: Duration = Duration::from_millis(500);

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn setup(cards: &[(&str, &[&str])]) -> (CardRepository, StudySession, Storage) {
        let storage = Storage::in_memory();
        let mut repo = CardRepository::load(storage.clone());
        for (question, card_tags) in cards {
            repo.create(question, "answer", &tags(card_tags)).unwrap();
        }
        let session = StudySession::restore(storage.clone(), DELAY);
        (repo, session, storage)
    }

    fn questions(session: &StudySession, repo: &CardRepository) -> Vec<String> {
        session
            .filtered_view(repo)
            .iter()
            .map(|card| card.question.clone())
            .collect()
    }

    fn master_all(repo: &mut CardRepository) {
        for mut card in repo.all().to_vec() {
            card.toggle_mastered(Utc::now());
            repo.update(card).unwrap();
        }
    }

    #[test]
    fn test_defaults_for_fresh_storage() {
        let (_, session, storage) = setup(&[]);
        assert_eq!(session.cursor(), 0);
        assert!(!session.is_flipped());
        assert_eq!(session.selected_tag(), ALL_TAGS);
        assert!(!session.show_mastered());
        assert!(session.reviewed_card_ids().is_empty());
        assert!(storage.raw(SESSION_KEY).is_some());
    }

    #[test]
    fn test_tag_filter_keeps_repository_order() {
        let (repo, mut session, _) = setup(&[("A", &["x"]), ("B", &["y"]), ("C", &["x", "y"])]);

        assert_eq!(questions(&session, &repo), vec!["A", "B", "C"]);

        session.change_filter(FilterChange::Tag("x".to_string()));
        assert_eq!(questions(&session, &repo), vec!["A", "C"]);

        session.change_filter(FilterChange::Tag("X".to_string()));
        assert!(questions(&session, &repo).is_empty());
    }

    #[test]
    fn test_filter_change_resets_cursor_and_flip() {
        let (repo, mut session, _) = setup(&[("A", &["x"]), ("B", &["x"])]);
        session.next(&repo);
        session.flip(&repo);

        session.change_filter(FilterChange::Tag("x".to_string()));
        assert_eq!(session.cursor(), 0);
        assert!(!session.is_flipped());
    }

    #[test]
    fn test_next_and_previous_clamp() {
        let (repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);

        session.previous();
        assert_eq!(session.cursor(), 0);

        session.next(&repo);
        session.next(&repo);
        assert_eq!(session.cursor(), 2);
        session.next(&repo);
        assert_eq!(session.cursor(), 2);

        session.previous();
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn test_navigation_resets_flip() {
        let (repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        session.flip(&repo);
        assert!(session.is_flipped());
        session.next(&repo);
        assert!(!session.is_flipped());

        session.flip(&repo);
        session.previous();
        assert!(!session.is_flipped());
    }

    #[test]
    fn test_flip_ignored_on_empty_view() {
        let (repo, mut session, _) = setup(&[]);
        session.flip(&repo);
        assert!(!session.is_flipped());
    }

    #[test]
    fn test_shuffle_stays_in_bounds() {
        let (repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[]), ("D", &[])]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = BTreeSet::new();

        for _ in 0..200 {
            session.flip(&repo);
            session.shuffle_with(&repo, &mut rng);
            assert!(session.cursor() < 4);
            assert!(!session.is_flipped());
            seen.insert(session.cursor());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_shuffle_on_empty_view_is_noop() {
        let (repo, mut session, _) = setup(&[]);
        session.shuffle(&repo);
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_toggle_mastered_updates_card() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        let before = Utc::now();

        let card = session.toggle_mastered(&mut repo).unwrap();
        assert!(card.mastered);
        assert_eq!(card.review_count, 1);
        assert!(card.last_reviewed.unwrap() >= before);
        assert_eq!(repo.get(&card.id), Some(&card));
        assert!(session.reviewed_card_ids().contains(&card.id));
        assert_eq!(session.record().cards_reviewed, 1);
    }

    #[test]
    fn test_toggle_without_current_card() {
        let (mut repo, mut session, _) = setup(&[]);
        assert!(session.toggle_mastered(&mut repo).is_none());
    }

    #[test]
    fn test_auto_advance_after_mastering() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        let clock = Instant::now();

        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert_eq!(session.auto_advance_due(), Some(clock + DELAY));

        assert!(!session.poll_auto_advance(&repo, clock));
        assert_eq!(session.cursor(), 0);

        assert!(session.poll_auto_advance(&repo, clock + DELAY));
        assert_eq!(session.cursor(), 1);
        assert!(session.auto_advance_due().is_none());
    }

    #[test]
    fn test_no_auto_advance_on_last_card_or_unmastering() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        let clock = Instant::now();

        session.next(&repo);
        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert!(session.auto_advance_due().is_none());

        session.previous();
        let mut card = repo.all()[0].clone();
        card.toggle_mastered(Utc::now());
        repo.update(card).unwrap();
        let card = session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert!(!card.mastered);
        assert!(session.auto_advance_due().is_none());
    }

    #[test]
    fn test_navigation_cancels_auto_advance() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        let clock = Instant::now();

        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        session.next(&repo);
        assert_eq!(session.cursor(), 1);

        assert!(!session.poll_auto_advance(&repo, clock + DELAY));
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn test_auto_advance_skips_past_card_that_left_hidden_view() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        let clock = Instant::now();

        session.flip(&repo);
        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert_eq!(session.current_card(&repo).unwrap().question, "B");

        assert!(session.poll_auto_advance(&repo, clock + DELAY));
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.current_card(&repo).unwrap().question, "C");
    }

    #[test]
    fn test_auto_advance_clamps_on_shrunken_view() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        let clock = Instant::now();

        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert!(session.auto_advance_due().is_some());

        assert!(session.poll_auto_advance(&repo, clock + DELAY));
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.current_card(&repo).unwrap().question, "B");
    }

    #[test]
    fn test_unmarking_keeps_pending_advance() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        let clock = Instant::now();

        session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        let card = session.toggle_mastered_at(&mut repo, Utc::now(), clock).unwrap();
        assert!(!card.mastered);
        assert_eq!(card.review_count, 2);
        assert_eq!(session.auto_advance_due(), Some(clock + DELAY));

        assert!(session.poll_auto_advance(&repo, clock + DELAY));
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn test_mastering_hides_answer_of_next_card() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        session.flip(&repo);
        session.toggle_mastered(&mut repo).unwrap();

        assert_eq!(session.current_card(&repo).unwrap().question, "B");
        assert!(!session.is_flipped());
    }

    #[test]
    fn test_mastering_keeps_flip_when_card_stays_visible() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        session.flip(&repo);
        session.toggle_mastered(&mut repo).unwrap();

        assert_eq!(session.current_card(&repo).unwrap().question, "A");
        assert!(session.is_flipped());
    }

    #[test]
    fn test_mastered_card_leaves_hidden_view() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[])]);
        session.next(&repo);
        session.toggle_mastered(&mut repo).unwrap();

        assert_eq!(session.filtered_view(&repo).len(), 1);
        assert_eq!(session.study_view(&repo), StudyView::NoCurrentCard);
        assert!(session.current_card(&repo).is_none());

        session.clamp_cursor(&repo);
        assert_eq!(session.cursor(), 0);
        assert!(matches!(session.study_view(&repo), StudyView::Card(card) if card.question == "A"));
    }

    #[test]
    fn test_no_cards_view() {
        let (repo, session, _) = setup(&[]);
        assert_eq!(session.study_view(&repo), StudyView::NoCards);
    }

    #[test]
    fn test_all_mastered_view_and_recovery() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        master_all(&mut repo);

        assert!(session.filtered_view(&repo).is_empty());
        assert_eq!(session.study_view(&repo), StudyView::AllMastered);

        session.change_filter(FilterChange::ShowMastered(true));
        assert_eq!(session.filtered_view(&repo).len(), 3);
    }

    #[test]
    fn test_progress() {
        let (mut repo, mut session, _) = setup(&[("A", &[]), ("B", &[]), ("C", &[])]);
        session.change_filter(FilterChange::ShowMastered(true));
        session.toggle_mastered(&mut repo).unwrap();
        session.next(&repo);

        assert_eq!(
            session.progress(&repo),
            StudyProgress {
                position: 2,
                total: 3,
                mastered_in_view: 1,
                reviewed_this_session: 1,
            }
        );
    }

    #[test]
    fn test_state_survives_restore() {
        let (mut repo, mut session, storage) =
            setup(&[("A", &["x"]), ("B", &["x"]), ("C", &["x"])]);
        session.change_filter(FilterChange::Tag("x".to_string()));
        session.change_filter(FilterChange::ShowMastered(true));
        session.next(&repo);
        let card = session.toggle_mastered(&mut repo).unwrap();
        session.flip(&repo);

        let restored = StudySession::restore(storage, DELAY);
        assert_eq!(restored.cursor(), 1);
        assert_eq!(restored.selected_tag(), "x");
        assert!(restored.show_mastered());
        assert!(!restored.is_flipped());
        assert!(restored.reviewed_card_ids().contains(&card.id));
        assert_eq!(restored.record().cards_reviewed, 1);
    }

    #[test]
    fn test_restore_tolerates_legacy_reviewed_shape() {
        let storage = Storage::in_memory();
        storage.save(REVIEWED_CARDS_KEY, &serde_json::json!({}));
        storage.save(CURRENT_INDEX_KEY, &"not a number");

        let session = StudySession::restore(storage, DELAY);
        assert!(session.reviewed_card_ids().is_empty());
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn test_reset_session() {
        let (mut repo, mut session, storage) = setup(&[("A", &[])]);
        session.toggle_mastered(&mut repo).unwrap();

        session.reset_session(Utc::now());
        assert!(session.reviewed_card_ids().is_empty());
        assert_eq!(session.record().cards_reviewed, 0);
        assert_eq!(storage.raw(REVIEWED_CARDS_KEY).as_deref(), Some("[]"));
    }
}
