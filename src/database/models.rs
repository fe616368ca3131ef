//! Database models
//!
//! Rust structs representing the six StudyStash collections.
//! Serde names are camelCase to match the backup interchange format.
//! Tags, quiz questions and pomodoro settings live in JSON text columns,
//! so those models decode their rows by hand.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Top-level grouping entity for study materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A study note under a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub video_url: Option<String>,
    /// Position in the linked video, in seconds
    pub video_timestamp: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A flashcard with spaced-repetition state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: i64,
    pub subject_id: i64,
    pub front: String,
    pub back: String,
    pub tags: Option<Vec<String>>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review_date: Option<DateTime<Utc>>,
    /// 1-5 spaced-repetition weight; unreviewed cards carry none
    pub difficulty: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Question type tag. Only multiple-choice is produced by the generation
/// flow today; the other variants are accepted on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "mcq")]
    Mcq,
    #[serde(rename = "short-answer")]
    ShortAnswer,
    #[serde(rename = "fill-in-blank")]
    FillInBlank,
}

/// One question of a quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// A quiz with its ordered question sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    /// Last attempt score as an integer percentage
    pub last_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pomodoro timer configuration captured with a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub work_duration: i64,
    pub break_duration: i64,
    pub long_break_duration: i64,
    pub sessions_until_long_break: i64,
}

/// A recorded study session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: i64,
    pub subject_id: i64,
    pub date: DateTime<Utc>,
    /// Minutes studied
    pub duration: i64,
    pub notes: Option<String>,
    pub pomodoro_count: Option<i64>,
    pub pomodoro_settings: Option<PomodoroSettings>,
}

/// A planner task with a due date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudyTask {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn decode_json_column<T: DeserializeOwned>(
    column: &str,
    raw: Option<String>,
) -> sqlx::Result<Option<T>> {
    match raw {
        Some(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            }
        }),
        None => Ok(None),
    }
}

impl FromRow<'_, SqliteRow> for Note {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            tags: decode_json_column("tags", row.try_get("tags")?)?,
            video_url: row.try_get("video_url")?,
            video_timestamp: row.try_get("video_timestamp")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for Flashcard {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            front: row.try_get("front")?,
            back: row.try_get("back")?,
            tags: decode_json_column("tags", row.try_get("tags")?)?,
            last_reviewed: row.try_get("last_reviewed")?,
            next_review_date: row.try_get("next_review_date")?,
            difficulty: row.try_get("difficulty")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for Quiz {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let questions: Option<Vec<QuizQuestion>> =
            decode_json_column("questions", row.try_get("questions")?)?;
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            title: row.try_get("title")?,
            questions: questions.unwrap_or_default(),
            last_score: row.try_get("last_score")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl FromRow<'_, SqliteRow> for StudySession {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            subject_id: row.try_get("subject_id")?,
            date: row.try_get("date")?,
            duration: row.try_get("duration")?,
            notes: row.try_get("notes")?,
            pomodoro_count: row.try_get("pomodoro_count")?,
            pomodoro_settings: decode_json_column(
                "pomodoro_settings",
                row.try_get("pomodoro_settings")?,
            )?,
        })
    }
}

/// Create subject request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Update subject request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubjectRequest {
    pub id: i64,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Create note request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub subject_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub video_timestamp: Option<i64>,
}

/// Update note request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub video_timestamp: Option<i64>,
}

/// Create flashcard request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFlashcardRequest {
    pub subject_id: i64,
    pub front: String,
    pub back: String,
    pub tags: Option<Vec<String>>,
}

/// Update flashcard request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFlashcardRequest {
    pub id: i64,
    pub front: Option<String>,
    pub back: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<i64>,
}

/// Create quiz request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuizRequest {
    pub subject_id: i64,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// Create study session request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub subject_id: i64,
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub notes: Option<String>,
    pub pomodoro_count: Option<i64>,
    pub pomodoro_settings: Option<PomodoroSettings>,
}

/// Create study task request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub subject_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
}

/// Update study task request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}
