//! Backup service
//!
//! Exports the whole store into a single JSON document and restores it,
//! preserving record ids. Import validates the file shape before
//! touching the store; the swap itself is one transaction, so a failed
//! import leaves the existing data intact.

use crate::config::BACKUP_FORMAT_VERSION;
use crate::database::{
    Flashcard, Note, Quiz, Repository, StudySession, StudyTask, Subject,
};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The backup interchange document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub subjects: Vec<Subject>,
    pub notes: Vec<Note>,
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub study_sessions: Vec<StudySession>,
    #[serde(default)]
    pub study_tasks: Vec<StudyTask>,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

/// Service for backup export and restore
#[derive(Clone)]
pub struct BackupService {
    repo: Repository,
}

impl BackupService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Snapshot all six collections
    pub async fn export(&self) -> Result<BackupFile> {
        tracing::info!("Exporting backup");

        let backup = BackupFile {
            subjects: self.repo.list_subjects().await?,
            notes: self.repo.list_notes().await?,
            flashcards: self.repo.list_flashcards().await?,
            quizzes: self.repo.list_quizzes().await?,
            study_sessions: self.repo.list_sessions().await?,
            study_tasks: self.repo.list_tasks().await?,
            export_date: Utc::now(),
            version: BACKUP_FORMAT_VERSION.to_string(),
        };

        tracing::info!(
            "Backup exported: {} subjects, {} notes, {} flashcards",
            backup.subjects.len(),
            backup.notes.len(),
            backup.flashcards.len()
        );
        Ok(backup)
    }

    /// Snapshot all six collections as a JSON string
    pub async fn export_json(&self) -> Result<String> {
        let backup = self.export().await?;
        Ok(serde_json::to_string(&backup)?)
    }

    /// Replace the store with the backup's records, ids preserved
    pub async fn import(&self, backup: &BackupFile) -> Result<()> {
        tracing::info!(
            "Importing backup from {} (version {})",
            backup.export_date,
            backup.version
        );

        self.repo
            .restore_all(
                &backup.subjects,
                &backup.notes,
                &backup.flashcards,
                &backup.quizzes,
                &backup.study_sessions,
                &backup.study_tasks,
            )
            .await?;

        tracing::info!("Backup imported successfully");
        Ok(())
    }

    /// Parse and import a JSON backup document.
    ///
    /// At minimum the subjects, notes and flashcards keys must be
    /// present as arrays; anything else fails validation before any
    /// record is touched.
    pub async fn import_json(&self, data: &str) -> Result<()> {
        let value: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| AppError::Validation(format!("invalid backup file: {}", e)))?;

        for key in ["subjects", "notes", "flashcards"] {
            if !value.get(key).map(serde_json::Value::is_array).unwrap_or(false) {
                return Err(AppError::Validation(format!(
                    "invalid backup file format: missing {} array",
                    key
                )));
            }
        }

        let backup: BackupFile = serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("invalid backup file: {}", e)))?;

        self.import(&backup).await
    }
}
