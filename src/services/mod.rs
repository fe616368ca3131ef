//! Service layer
//!
//! High-level business logic over the repository: lifecycle management,
//! derived views, quotas, preferences, backup, and AI-generation flows.

pub mod backup;
pub mod flashcards;
pub mod generation;
pub mod notes;
pub mod notifications;
pub mod planner;
pub mod preferences;
pub mod quizzes;
pub mod quota;
pub mod subjects;

pub use backup::{BackupFile, BackupService};
pub use flashcards::{schedule_review, FlashcardsService, ReviewOutcome};
pub use generation::GenerationService;
pub use notes::NotesService;
pub use notifications::{Notification, NotificationKind, NotificationsService};
pub use planner::{activity_heatmap, PlannerService};
pub use preferences::{Preferences, PreferencesService};
pub use quizzes::QuizzesService;
pub use quota::{QuotaFeature, QuotaKey, QuotaLimits, QuotaState, QuotaStatus, QuotaTracker};
pub use subjects::SubjectsService;
