//! Flashcards service
//!
//! Flashcard lifecycle and the spaced-repetition review schedule.
//! Scheduling is a pure function of the current difficulty, the review
//! outcome and the review instant.

use crate::config::{
    DEFAULT_DIFFICULTY, GOT_IT_INTERVAL_DAYS, MAX_DIFFICULTY, MIN_DIFFICULTY,
    REVIEW_AGAIN_INTERVAL_DAYS,
};
use crate::database::{
    CreateFlashcardRequest, Flashcard, Repository, UpdateFlashcardRequest,
};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};

/// Outcome of reviewing a flashcard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The card was recalled; it gets easier and waits longer
    GotIt,
    /// The card was missed; it gets harder and comes back sooner
    ReviewAgain,
}

/// Compute the new difficulty and next review date for a card.
///
/// Difficulty stays clamped to [1, 5]; cards never reviewed before start
/// from the default weight.
pub fn schedule_review(
    current_difficulty: Option<i64>,
    outcome: ReviewOutcome,
    now: DateTime<Utc>,
) -> (i64, DateTime<Utc>) {
    let current = current_difficulty.unwrap_or(DEFAULT_DIFFICULTY);

    match outcome {
        ReviewOutcome::GotIt => (
            (current - 1).max(MIN_DIFFICULTY),
            now + Duration::days(GOT_IT_INTERVAL_DAYS),
        ),
        ReviewOutcome::ReviewAgain => (
            (current + 1).min(MAX_DIFFICULTY),
            now + Duration::days(REVIEW_AGAIN_INTERVAL_DAYS),
        ),
    }
}

/// Service for managing flashcards
#[derive(Clone)]
pub struct FlashcardsService {
    repo: Repository,
}

impl FlashcardsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new flashcard under a subject
    pub async fn create_flashcard(&self, req: CreateFlashcardRequest) -> Result<Flashcard> {
        tracing::info!("Creating flashcard under subject {}", req.subject_id);

        let card = self.repo.create_flashcard(req).await?;

        tracing::info!("Flashcard created successfully: {}", card.id);
        Ok(card)
    }

    /// Get a flashcard by ID
    pub async fn get_flashcard(&self, id: i64) -> Result<Flashcard> {
        self.repo.get_flashcard(id).await
    }

    /// List a subject's flashcards
    pub async fn list_flashcards(&self, subject_id: i64) -> Result<Vec<Flashcard>> {
        self.repo.list_flashcards_for_subject(subject_id).await
    }

    /// Update a flashcard's user-editable fields
    pub async fn update_flashcard(&self, req: UpdateFlashcardRequest) -> Result<Flashcard> {
        tracing::debug!("Updating flashcard: {}", req.id);
        self.repo.update_flashcard(req).await
    }

    /// Delete a flashcard
    pub async fn delete_flashcard(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting flashcard: {}", id);
        self.repo.delete_flashcard(id).await
    }

    /// Record a review outcome, rescheduling the card
    pub async fn record_review(
        &self,
        id: i64,
        outcome: ReviewOutcome,
        now: DateTime<Utc>,
    ) -> Result<Flashcard> {
        let card = self.repo.get_flashcard(id).await?;
        let (difficulty, next_review) = schedule_review(card.difficulty, outcome, now);

        tracing::debug!(
            "Reviewed flashcard {}: difficulty {} -> {}, next review {}",
            id,
            card.difficulty.unwrap_or(DEFAULT_DIFFICULTY),
            difficulty,
            next_review
        );

        self.repo
            .record_flashcard_review(id, difficulty, now, next_review)
            .await
    }

    /// A subject's cards due for review at or before the start of the
    /// local day containing `now`
    pub async fn due_flashcards(
        &self,
        subject_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        self.repo
            .due_flashcards_for_subject(subject_id, crate::time::start_of_local_day(now))
            .await
    }

    /// Search a subject's cards by front or back text
    pub async fn search_flashcards(
        &self,
        subject_id: Option<i64>,
        query: &str,
    ) -> Result<Vec<Flashcard>> {
        self.repo.search_flashcards(subject_id, query).await
    }

    /// A subject's cards carrying the exact tag
    pub async fn flashcards_with_tag(&self, subject_id: i64, tag: &str) -> Result<Vec<Flashcard>> {
        self.repo.list_flashcards_with_tag(subject_id, tag).await
    }
}
