//! Quota tracker
//!
//! Persists per-day usage counters for AI-generation features in a JSON
//! key-value file, separate from the record store. Counters reset at the
//! first operation observed on a new local calendar day. Unreadable
//! state is treated as fresh so a corrupt file can never lock the user
//! out permanently.

use crate::config::{
    DEFAULT_CHAT_LIMIT, DEFAULT_FLASHCARD_GENERATION_LIMIT, DEFAULT_QUIZ_GENERATION_LIMIT,
};
use crate::error::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Tracked generation feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaFeature {
    Chat,
    QuizGeneration,
    FlashcardGeneration,
}

impl fmt::Display for QuotaFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuotaFeature::Chat => "chat",
            QuotaFeature::QuizGeneration => "quiz generation",
            QuotaFeature::FlashcardGeneration => "flashcard generation",
        };
        f.write_str(name)
    }
}

/// A (feature, scope) pair tracked independently:
/// chat is global, quiz generation is per subject, flashcard generation
/// is per note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaKey {
    pub feature: QuotaFeature,
    pub scope: Option<i64>,
}

impl QuotaKey {
    pub fn chat() -> Self {
        Self {
            feature: QuotaFeature::Chat,
            scope: None,
        }
    }

    pub fn quiz_generation(subject_id: i64) -> Self {
        Self {
            feature: QuotaFeature::QuizGeneration,
            scope: Some(subject_id),
        }
    }

    pub fn flashcard_generation(note_id: i64) -> Self {
        Self {
            feature: QuotaFeature::FlashcardGeneration,
            scope: Some(note_id),
        }
    }

    fn storage_key(&self) -> String {
        match (self.feature, self.scope) {
            (QuotaFeature::Chat, _) => "chat".to_string(),
            (QuotaFeature::QuizGeneration, Some(id)) => format!("quiz_gen_{}", id),
            (QuotaFeature::QuizGeneration, None) => "quiz_gen".to_string(),
            (QuotaFeature::FlashcardGeneration, Some(id)) => format!("note_gen_{}", id),
            (QuotaFeature::FlashcardGeneration, None) => "note_gen".to_string(),
        }
    }
}

/// Per-feature daily caps. Callers can override any of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub chat: u32,
    pub quiz_generation: u32,
    pub flashcard_generation: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            chat: DEFAULT_CHAT_LIMIT,
            quiz_generation: DEFAULT_QUIZ_GENERATION_LIMIT,
            flashcard_generation: DEFAULT_FLASHCARD_GENERATION_LIMIT,
        }
    }
}

impl QuotaLimits {
    pub fn limit_for(&self, feature: QuotaFeature) -> u32 {
        match feature {
            QuotaFeature::Chat => self.chat,
            QuotaFeature::QuizGeneration => self.quiz_generation,
            QuotaFeature::FlashcardGeneration => self.flashcard_generation,
        }
    }
}

/// Where a counter stands within its day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaState {
    /// No usage recorded today
    Fresh,
    /// Some usage, still under the cap
    Counting,
    /// The cap is reached; further actions are refused
    Exhausted,
}

/// Snapshot of one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub state: QuotaState,
    pub count: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Counter {
    date: NaiveDate,
    count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct QuotaFileState {
    #[serde(default)]
    counters: HashMap<String, Counter>,
}

/// Daily quota tracker backed by a JSON file
pub struct QuotaTracker {
    path: PathBuf,
    limits: QuotaLimits,
    // Loaded lazily on first use; None until then
    state: Mutex<Option<QuotaFileState>>,
}

impl QuotaTracker {
    pub fn new(data_dir: PathBuf, limits: QuotaLimits) -> Self {
        Self {
            path: data_dir.join("quota.json"),
            limits,
            state: Mutex::new(None),
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Current state of a counter for the local calendar day `today`.
    /// A stored date that no longer matches resets the counter first.
    pub async fn status(&self, key: &QuotaKey, today: NaiveDate) -> Result<QuotaStatus> {
        let mut guard = self.state.lock().await;
        let state = self.loaded(&mut guard).await;

        let storage_key = key.storage_key();
        let limit = self.limits.limit_for(key.feature);

        let stale = matches!(state.counters.get(&storage_key), Some(c) if c.date != today);
        if stale {
            // First check of a new day: back to fresh
            state.counters.insert(
                storage_key.clone(),
                Counter {
                    date: today,
                    count: 0,
                },
            );
            self.persist(state).await?;
        }
        let count = state
            .counters
            .get(&storage_key)
            .map(|c| c.count)
            .unwrap_or(0);

        let quota_state = if count == 0 {
            QuotaState::Fresh
        } else if count < limit {
            QuotaState::Counting
        } else {
            QuotaState::Exhausted
        };

        Ok(QuotaStatus {
            state: quota_state,
            count,
            limit,
        })
    }

    /// Refuse with `QuotaExceeded` when the counter is exhausted.
    /// Called before any external request is issued.
    pub async fn check(&self, key: &QuotaKey, today: NaiveDate) -> Result<()> {
        let status = self.status(key, today).await?;
        if status.state == QuotaState::Exhausted {
            tracing::info!(
                "Refusing {}: daily limit {} reached",
                key.feature,
                status.limit
            );
            return Err(AppError::QuotaExceeded {
                feature: key.feature.to_string(),
                limit: status.limit,
            });
        }
        Ok(())
    }

    /// Record one successful generation, resetting first when the stored
    /// date is stale. Returns the new count.
    pub async fn record(&self, key: &QuotaKey, today: NaiveDate) -> Result<u32> {
        let mut guard = self.state.lock().await;
        let state = self.loaded(&mut guard).await;

        let storage_key = key.storage_key();
        let counter = state
            .counters
            .entry(storage_key)
            .or_insert(Counter {
                date: today,
                count: 0,
            });

        if counter.date != today {
            counter.date = today;
            counter.count = 0;
        }
        counter.count += 1;
        let count = counter.count;

        self.persist(state).await?;

        tracing::debug!(
            "Recorded {} usage: {}/{}",
            key.feature,
            count,
            self.limits.limit_for(key.feature)
        );
        Ok(count)
    }

    async fn loaded<'a>(
        &self,
        guard: &'a mut tokio::sync::MutexGuard<'_, Option<QuotaFileState>>,
    ) -> &'a mut QuotaFileState {
        if guard.is_none() {
            **guard = Some(self.load_from_disk().await);
        }
        guard.get_or_insert_with(QuotaFileState::default)
    }

    /// Read persisted state; anything unreadable counts as fresh.
    async fn load_from_disk(&self) -> QuotaFileState {
        match fs::read_to_string(&self.path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        "Quota state at {:?} is corrupt ({}); treating all counters as fresh",
                        self.path,
                        e
                    );
                    QuotaFileState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => QuotaFileState::default(),
            Err(e) => {
                tracing::warn!(
                    "Quota state at {:?} is unreadable ({}); treating all counters as fresh",
                    self.path,
                    e
                );
                QuotaFileState::default()
            }
        }
    }

    async fn persist(&self, state: &QuotaFileState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_tracker() -> (QuotaTracker, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let tracker = QuotaTracker::new(temp_dir.path().to_path_buf(), QuotaLimits::default());
        (tracker, temp_dir)
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    #[tokio::test]
    async fn test_fresh_counter_starts_at_zero() {
        let (tracker, _temp) = create_test_tracker();

        let status = tracker.status(&QuotaKey::chat(), today()).await.unwrap();
        assert_eq!(status.state, QuotaState::Fresh);
        assert_eq!(status.count, 0);
        assert_eq!(status.limit, 15);
    }

    #[tokio::test]
    async fn test_counts_are_monotonic_within_a_day() {
        let (tracker, _temp) = create_test_tracker();
        let key = QuotaKey::quiz_generation(7);
        let day = today();

        for expected in 1..=3 {
            tracker.check(&key, day).await.unwrap();
            let count = tracker.record(&key, day).await.unwrap();
            assert_eq!(count, expected);
        }

        // Fourth attempt is refused without incrementing
        let refused = tracker.check(&key, day).await;
        assert!(matches!(refused, Err(AppError::QuotaExceeded { limit: 3, .. })));

        let status = tracker.status(&key, day).await.unwrap();
        assert_eq!(status.count, 3);
        assert_eq!(status.state, QuotaState::Exhausted);
    }

    #[tokio::test]
    async fn test_counter_resets_on_new_day() {
        let (tracker, _temp) = create_test_tracker();
        let key = QuotaKey::chat();
        let yesterday = today() - Duration::days(1);

        for _ in 0..15 {
            tracker.record(&key, yesterday).await.unwrap();
        }
        let status = tracker.status(&key, yesterday).await.unwrap();
        assert_eq!(status.state, QuotaState::Exhausted);

        // First check of the new day sees a fresh counter
        let status = tracker.status(&key, today()).await.unwrap();
        assert_eq!(status.state, QuotaState::Fresh);
        assert_eq!(status.count, 0);

        tracker.check(&key, today()).await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_tracked_independently() {
        let (tracker, _temp) = create_test_tracker();
        let day = today();

        tracker.record(&QuotaKey::flashcard_generation(1), day).await.unwrap();

        // Note 1 is exhausted (limit 1), note 2 untouched
        assert!(tracker
            .check(&QuotaKey::flashcard_generation(1), day)
            .await
            .is_err());
        assert!(tracker
            .check(&QuotaKey::flashcard_generation(2), day)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let day = today();

        {
            let tracker =
                QuotaTracker::new(temp_dir.path().to_path_buf(), QuotaLimits::default());
            tracker.record(&QuotaKey::chat(), day).await.unwrap();
            tracker.record(&QuotaKey::chat(), day).await.unwrap();
        }

        let tracker = QuotaTracker::new(temp_dir.path().to_path_buf(), QuotaLimits::default());
        let status = tracker.status(&QuotaKey::chat(), day).await.unwrap();
        assert_eq!(status.count, 2);
        assert_eq!(status.state, QuotaState::Counting);
    }

    #[tokio::test]
    async fn test_corrupt_state_fails_open() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("quota.json"), "{not json").unwrap();

        let tracker = QuotaTracker::new(temp_dir.path().to_path_buf(), QuotaLimits::default());
        let status = tracker.status(&QuotaKey::chat(), today()).await.unwrap();

        assert_eq!(status.state, QuotaState::Fresh);
        assert!(tracker.check(&QuotaKey::chat(), today()).await.is_ok());
    }

    #[tokio::test]
    async fn test_custom_limits() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = QuotaTracker::new(
            temp_dir.path().to_path_buf(),
            QuotaLimits {
                chat: 2,
                ..Default::default()
            },
        );
        let day = today();

        tracker.record(&QuotaKey::chat(), day).await.unwrap();
        tracker.record(&QuotaKey::chat(), day).await.unwrap();

        assert!(matches!(
            tracker.check(&QuotaKey::chat(), day).await,
            Err(AppError::QuotaExceeded { limit: 2, .. })
        ));
    }
}
