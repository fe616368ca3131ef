//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the engine.

use std::time::Duration;

// ===== Spaced Repetition =====

/// Lowest flashcard difficulty on the 1-5 scale
pub const MIN_DIFFICULTY: i64 = 1;
/// Highest flashcard difficulty on the 1-5 scale
pub const MAX_DIFFICULTY: i64 = 5;
/// Difficulty assigned to cards that have never been reviewed
pub const DEFAULT_DIFFICULTY: i64 = 3;

/// Days until the next review after a successful recall
pub const GOT_IT_INTERVAL_DAYS: i64 = 3;
/// Days until the next review after a failed recall
pub const REVIEW_AGAIN_INTERVAL_DAYS: i64 = 1;

// ===== Quiz Generation =====

/// Minimum question count a generated quiz may be configured with
pub const MIN_QUIZ_QUESTIONS: usize = 5;
/// Maximum question count a generated quiz may be configured with
pub const MAX_QUIZ_QUESTIONS: usize = 15;
/// Multiple-choice questions carry exactly this many options
pub const QUIZ_OPTION_COUNT: usize = 4;

// ===== Daily Generation Limits =====

/// Chat messages per day (global)
pub const DEFAULT_CHAT_LIMIT: u32 = 15;
/// Quiz generations per day, per subject
pub const DEFAULT_QUIZ_GENERATION_LIMIT: u32 = 3;
/// Flashcard generations per day, per note
pub const DEFAULT_FLASHCARD_GENERATION_LIMIT: u32 = 1;

// ===== Derived Views =====

/// Trailing window for the activity heatmap, in days
pub const DEFAULT_HEATMAP_WINDOW_DAYS: u32 = 90;

/// Floor interval between notification feed recomputations.
/// Repository change events trigger recomputation sooner.
pub const NOTIFICATION_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

// ===== Backup =====

/// Version string written into exported backup files
pub const BACKUP_FORMAT_VERSION: &str = "1.0";
