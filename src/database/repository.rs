//! Repository layer for database operations
//!
//! CRUD and query access for all six collections. Every multi-row
//! mutation (cascade delete, wipe, restore) runs in a single transaction
//! so readers observe all of it or none of it. Committed mutations are
//! announced on a broadcast change feed that derived views listen to.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::broadcast;

/// The six record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Subjects,
    Notes,
    Flashcards,
    Quizzes,
    StudySessions,
    StudyTasks,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Subjects => "subjects",
            Collection::Notes => "notes",
            Collection::Flashcards => "flashcards",
            Collection::Quizzes => "quizzes",
            Collection::StudySessions => "study_sessions",
            Collection::StudyTasks => "study_tasks",
        }
    }
}

/// Tables holding records owned by a subject, in cascade order.
const DEPENDENT_TABLES: [Collection; 5] = [
    Collection::Notes,
    Collection::Flashcards,
    Collection::Quizzes,
    Collection::StudySessions,
    Collection::StudyTasks,
];

/// A committed mutation, announced on the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChange {
    pub collection: Collection,
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    changes: broadcast::Sender<DataChange>,
}

fn encode_tags(tags: &Option<Vec<String>>) -> Result<Option<String>> {
    tags.as_ref()
        .map(|t| serde_json::to_string(t))
        .transpose()
        .map_err(AppError::from)
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", what)));
    }
    Ok(())
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self { pool, changes }
    }

    /// Subscribe to committed-mutation announcements.
    pub fn changes(&self) -> broadcast::Receiver<DataChange> {
        self.changes.subscribe()
    }

    fn notify(&self, collection: Collection) {
        // No receivers is fine; the feed is best-effort.
        let _ = self.changes.send(DataChange { collection });
    }

    /// Check that a subject id resolves; dependents refuse orphan creation.
    async fn ensure_subject(&self, subject_id: i64) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = ?)")
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(AppError::InvalidReference(subject_id));
        }
        Ok(())
    }

    // ===== Subjects =====

    /// Create a new subject
    pub async fn create_subject(&self, req: CreateSubjectRequest) -> Result<Subject> {
        require(&req.name, "subject name")?;
        let now = Utc::now();

        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, icon, color, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.icon)
        .bind(&req.color)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created subject: {}", subject.id);
        self.notify(Collection::Subjects);
        Ok(subject)
    }

    /// Get a subject by ID
    pub async fn get_subject(&self, id: i64) -> Result<Subject> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Subject", id))
    }

    /// List all subjects ordered by name
    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(subjects)
    }

    /// Update a subject
    pub async fn update_subject(&self, req: UpdateSubjectRequest) -> Result<Subject> {
        if let Some(name) = &req.name {
            require(name, "subject name")?;
        }
        let now = Utc::now();

        let mut query = "UPDATE subjects SET updated_at = ?".to_string();
        if req.name.is_some() {
            query.push_str(", name = ?");
        }
        if req.icon.is_some() {
            query.push_str(", icon = ?");
        }
        if req.color.is_some() {
            query.push_str(", color = ?");
        }
        query.push_str(" WHERE id = ?");

        let mut q = sqlx::query(&query).bind(now);
        if let Some(name) = &req.name {
            q = q.bind(name);
        }
        if let Some(icon) = &req.icon {
            q = q.bind(icon);
        }
        if let Some(color) = &req.color {
            q = q.bind(color);
        }

        let rows = q.bind(req.id).execute(&self.pool).await?.rows_affected();
        if rows == 0 {
            return Err(AppError::NotFound("Subject", req.id));
        }

        self.notify(Collection::Subjects);
        self.get_subject(req.id).await
    }

    /// Delete a subject and everything it owns, in one transaction.
    ///
    /// All five dependent collections are purged before the subject row,
    /// and readers never observe a partial cascade. Deleting an unknown
    /// id is a no-op.
    pub async fn delete_subject_with_dependents(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for collection in DEPENDENT_TABLES {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE subject_id = ?",
                collection.table()
            ))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let rows = sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::debug!("Deleted subject {} (existed: {})", id, rows > 0);
        for collection in DEPENDENT_TABLES {
            self.notify(collection);
        }
        self.notify(Collection::Subjects);
        Ok(())
    }

    /// Delete every record of `collection` belonging to a subject,
    /// returning how many were removed. Zero matches is not an error.
    pub async fn delete_for_subject(
        &self,
        collection: Collection,
        subject_id: i64,
    ) -> Result<u64> {
        if collection == Collection::Subjects {
            return Err(AppError::Validation(
                "subjects do not reference a subject".to_string(),
            ));
        }

        let rows = sqlx::query(&format!(
            "DELETE FROM {} WHERE subject_id = ?",
            collection.table()
        ))
        .bind(subject_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        tracing::debug!(
            "Deleted {} {} rows for subject {}",
            rows,
            collection.table(),
            subject_id
        );
        self.notify(collection);
        Ok(rows)
    }

    /// Count rows belonging to a subject (for `Subjects`, whether the row
    /// itself exists).
    pub async fn count_for_subject(&self, collection: Collection, subject_id: i64) -> Result<i64> {
        let sql = match collection {
            Collection::Subjects => "SELECT COUNT(*) FROM subjects WHERE id = ?".to_string(),
            other => format!(
                "SELECT COUNT(*) FROM {} WHERE subject_id = ?",
                other.table()
            ),
        };

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(subject_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // ===== Notes =====

    /// Create a note under an existing subject
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        require(&req.title, "note title")?;
        self.ensure_subject(req.subject_id).await?;
        let now = Utc::now();

        let note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (subject_id, title, content, tags, video_url, video_timestamp,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.subject_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(encode_tags(&req.tags)?)
        .bind(&req.video_url)
        .bind(req.video_timestamp)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {} under subject {}", note.id, req.subject_id);
        self.notify(Collection::Notes);
        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Note", id))
    }

    /// List all notes (newest change first)
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(notes)
    }

    /// List a subject's notes (newest change first)
    pub async fn list_notes_for_subject(&self, subject_id: i64) -> Result<Vec<Note>> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE subject_id = ? ORDER BY updated_at DESC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notes)
    }

    /// Update a note
    pub async fn update_note(&self, req: UpdateNoteRequest) -> Result<Note> {
        if let Some(title) = &req.title {
            require(title, "note title")?;
        }
        let now = Utc::now();

        let mut query = "UPDATE notes SET updated_at = ?".to_string();
        if req.title.is_some() {
            query.push_str(", title = ?");
        }
        if req.content.is_some() {
            query.push_str(", content = ?");
        }
        if req.tags.is_some() {
            query.push_str(", tags = ?");
        }
        if req.video_url.is_some() {
            query.push_str(", video_url = ?");
        }
        if req.video_timestamp.is_some() {
            query.push_str(", video_timestamp = ?");
        }
        query.push_str(" WHERE id = ?");

        let encoded_tags = encode_tags(&req.tags)?;

        let mut q = sqlx::query(&query).bind(now);
        if let Some(title) = &req.title {
            q = q.bind(title);
        }
        if let Some(content) = &req.content {
            q = q.bind(content);
        }
        if let Some(tags) = &encoded_tags {
            q = q.bind(tags);
        }
        if let Some(url) = &req.video_url {
            q = q.bind(url);
        }
        if let Some(ts) = req.video_timestamp {
            q = q.bind(ts);
        }

        let rows = q.bind(req.id).execute(&self.pool).await?.rows_affected();
        if rows == 0 {
            return Err(AppError::NotFound("Note", req.id));
        }

        self.notify(Collection::Notes);
        self.get_note(req.id).await
    }

    /// Delete a note; unknown ids are a no-op
    pub async fn delete_note(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted note: {}", id);
        self.notify(Collection::Notes);
        Ok(())
    }

    /// Case-insensitive substring search over note title and content,
    /// scoped to a subject's notes when a subject bound is available.
    pub async fn search_notes(&self, subject_id: Option<i64>, query: &str) -> Result<Vec<Note>> {
        let notes = match subject_id {
            Some(id) => self.list_notes_for_subject(id).await?,
            None => self.list_notes().await?,
        };

        let needle = query.to_lowercase();
        Ok(notes
            .into_iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// A subject's notes carrying the exact tag
    pub async fn list_notes_with_tag(&self, subject_id: i64, tag: &str) -> Result<Vec<Note>> {
        let notes = self.list_notes_for_subject(subject_id).await?;
        Ok(notes
            .into_iter()
            .filter(|note| {
                note.tags
                    .as_ref()
                    .is_some_and(|tags| tags.iter().any(|t| t == tag))
            })
            .collect())
    }

    // ===== Flashcards =====

    /// Create a flashcard under an existing subject
    pub async fn create_flashcard(&self, req: CreateFlashcardRequest) -> Result<Flashcard> {
        require(&req.front, "flashcard front")?;
        require(&req.back, "flashcard back")?;
        self.ensure_subject(req.subject_id).await?;
        let now = Utc::now();

        let card = sqlx::query_as::<_, Flashcard>(
            r#"
            INSERT INTO flashcards (subject_id, front, back, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.subject_id)
        .bind(&req.front)
        .bind(&req.back)
        .bind(encode_tags(&req.tags)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created flashcard: {} under subject {}", card.id, req.subject_id);
        self.notify(Collection::Flashcards);
        Ok(card)
    }

    /// Get a flashcard by ID
    pub async fn get_flashcard(&self, id: i64) -> Result<Flashcard> {
        sqlx::query_as::<_, Flashcard>("SELECT * FROM flashcards WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Flashcard", id))
    }

    /// List all flashcards
    pub async fn list_flashcards(&self) -> Result<Vec<Flashcard>> {
        let cards = sqlx::query_as::<_, Flashcard>("SELECT * FROM flashcards ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        Ok(cards)
    }

    /// List a subject's flashcards (oldest first)
    pub async fn list_flashcards_for_subject(&self, subject_id: i64) -> Result<Vec<Flashcard>> {
        let cards = sqlx::query_as::<_, Flashcard>(
            "SELECT * FROM flashcards WHERE subject_id = ? ORDER BY created_at",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Update a flashcard's user-editable fields
    pub async fn update_flashcard(&self, req: UpdateFlashcardRequest) -> Result<Flashcard> {
        if let Some(front) = &req.front {
            require(front, "flashcard front")?;
        }
        if let Some(back) = &req.back {
            require(back, "flashcard back")?;
        }
        if let Some(difficulty) = req.difficulty {
            if !(crate::config::MIN_DIFFICULTY..=crate::config::MAX_DIFFICULTY)
                .contains(&difficulty)
            {
                return Err(AppError::Validation(format!(
                    "difficulty must be between {} and {}",
                    crate::config::MIN_DIFFICULTY,
                    crate::config::MAX_DIFFICULTY
                )));
            }
        }
        let now = Utc::now();

        let mut query = "UPDATE flashcards SET updated_at = ?".to_string();
        if req.front.is_some() {
            query.push_str(", front = ?");
        }
        if req.back.is_some() {
            query.push_str(", back = ?");
        }
        if req.tags.is_some() {
            query.push_str(", tags = ?");
        }
        if req.difficulty.is_some() {
            query.push_str(", difficulty = ?");
        }
        query.push_str(" WHERE id = ?");

        let encoded_tags = encode_tags(&req.tags)?;

        let mut q = sqlx::query(&query).bind(now);
        if let Some(front) = &req.front {
            q = q.bind(front);
        }
        if let Some(back) = &req.back {
            q = q.bind(back);
        }
        if let Some(tags) = &encoded_tags {
            q = q.bind(tags);
        }
        if let Some(difficulty) = req.difficulty {
            q = q.bind(difficulty);
        }

        let rows = q.bind(req.id).execute(&self.pool).await?.rows_affected();
        if rows == 0 {
            return Err(AppError::NotFound("Flashcard", req.id));
        }

        self.notify(Collection::Flashcards);
        self.get_flashcard(req.id).await
    }

    /// Record a spaced-repetition review outcome
    pub async fn record_flashcard_review(
        &self,
        id: i64,
        difficulty: i64,
        reviewed_at: DateTime<Utc>,
        next_review: DateTime<Utc>,
    ) -> Result<Flashcard> {
        let rows = sqlx::query(
            r#"
            UPDATE flashcards
            SET difficulty = ?, last_reviewed = ?, next_review_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(difficulty)
        .bind(reviewed_at)
        .bind(next_review)
        .bind(reviewed_at)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound("Flashcard", id));
        }

        self.notify(Collection::Flashcards);
        self.get_flashcard(id).await
    }

    /// Delete a flashcard; unknown ids are a no-op
    pub async fn delete_flashcard(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM flashcards WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted flashcard: {}", id);
        self.notify(Collection::Flashcards);
        Ok(())
    }

    /// Flashcards due for review at or before `cutoff`, across subjects
    pub async fn due_flashcards(&self, cutoff: DateTime<Utc>) -> Result<Vec<Flashcard>> {
        let cards = sqlx::query_as::<_, Flashcard>(
            r#"
            SELECT * FROM flashcards
            WHERE next_review_date IS NOT NULL AND next_review_date <= ?
            ORDER BY next_review_date
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// A subject's flashcards due for review at or before `cutoff`
    pub async fn due_flashcards_for_subject(
        &self,
        subject_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        let cards = sqlx::query_as::<_, Flashcard>(
            r#"
            SELECT * FROM flashcards
            WHERE subject_id = ? AND next_review_date IS NOT NULL AND next_review_date <= ?
            ORDER BY next_review_date
            "#,
        )
        .bind(subject_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    /// Case-insensitive substring search over flashcard front and back
    pub async fn search_flashcards(
        &self,
        subject_id: Option<i64>,
        query: &str,
    ) -> Result<Vec<Flashcard>> {
        let cards = match subject_id {
            Some(id) => self.list_flashcards_for_subject(id).await?,
            None => self.list_flashcards().await?,
        };

        let needle = query.to_lowercase();
        Ok(cards
            .into_iter()
            .filter(|card| {
                card.front.to_lowercase().contains(&needle)
                    || card.back.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// A subject's flashcards carrying the exact tag
    pub async fn list_flashcards_with_tag(
        &self,
        subject_id: i64,
        tag: &str,
    ) -> Result<Vec<Flashcard>> {
        let cards = self.list_flashcards_for_subject(subject_id).await?;
        Ok(cards
            .into_iter()
            .filter(|card| {
                card.tags
                    .as_ref()
                    .is_some_and(|tags| tags.iter().any(|t| t == tag))
            })
            .collect())
    }

    // ===== Quizzes =====

    /// Create a quiz under an existing subject
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz> {
        require(&req.title, "quiz title")?;
        if req.questions.is_empty() {
            return Err(AppError::Validation(
                "a quiz needs at least one question".to_string(),
            ));
        }
        self.ensure_subject(req.subject_id).await?;
        let now = Utc::now();

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (subject_id, title, questions, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.subject_id)
        .bind(&req.title)
        .bind(serde_json::to_string(&req.questions)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created quiz: {} under subject {}", quiz.id, req.subject_id);
        self.notify(Collection::Quizzes);
        Ok(quiz)
    }

    /// Get a quiz by ID
    pub async fn get_quiz(&self, id: i64) -> Result<Quiz> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Quiz", id))
    }

    /// List all quizzes
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(quizzes)
    }

    /// List a subject's quizzes (newest change first)
    pub async fn list_quizzes_for_subject(&self, subject_id: i64) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            "SELECT * FROM quizzes WHERE subject_id = ? ORDER BY updated_at DESC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes)
    }

    /// Store the score of a completed attempt
    pub async fn update_quiz_score(&self, id: i64, score: i64) -> Result<Quiz> {
        if !(0..=100).contains(&score) {
            return Err(AppError::Validation(
                "score must be a percentage between 0 and 100".to_string(),
            ));
        }

        let rows = sqlx::query("UPDATE quizzes SET last_score = ?, updated_at = ? WHERE id = ?")
            .bind(score)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound("Quiz", id));
        }

        self.notify(Collection::Quizzes);
        self.get_quiz(id).await
    }

    /// Delete a quiz; unknown ids are a no-op
    pub async fn delete_quiz(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM quizzes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted quiz: {}", id);
        self.notify(Collection::Quizzes);
        Ok(())
    }

    // ===== Study sessions =====

    /// Record a study session under an existing subject
    pub async fn create_session(&self, req: CreateSessionRequest) -> Result<StudySession> {
        if req.duration <= 0 {
            return Err(AppError::Validation(
                "session duration must be a positive number of minutes".to_string(),
            ));
        }
        self.ensure_subject(req.subject_id).await?;

        let settings = req
            .pomodoro_settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let session = sqlx::query_as::<_, StudySession>(
            r#"
            INSERT INTO study_sessions (subject_id, date, duration, notes, pomodoro_count,
                                        pomodoro_settings)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.subject_id)
        .bind(req.date)
        .bind(req.duration)
        .bind(&req.notes)
        .bind(req.pomodoro_count)
        .bind(settings)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            "Recorded session: {} under subject {}",
            session.id,
            req.subject_id
        );
        self.notify(Collection::StudySessions);
        Ok(session)
    }

    /// Get a session by ID
    pub async fn get_session(&self, id: i64) -> Result<StudySession> {
        sqlx::query_as::<_, StudySession>("SELECT * FROM study_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("StudySession", id))
    }

    /// List all sessions ordered by date
    pub async fn list_sessions(&self) -> Result<Vec<StudySession>> {
        let sessions =
            sqlx::query_as::<_, StudySession>("SELECT * FROM study_sessions ORDER BY date")
                .fetch_all(&self.pool)
                .await?;

        Ok(sessions)
    }

    /// List a subject's sessions ordered by date
    pub async fn list_sessions_for_subject(&self, subject_id: i64) -> Result<Vec<StudySession>> {
        let sessions = sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE subject_id = ? ORDER BY date",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Sessions whose date falls within [start, end], inclusive
    pub async fn sessions_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StudySession>> {
        let sessions = sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE date >= ? AND date <= ? ORDER BY date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Sessions on or after `start`
    pub async fn sessions_since(&self, start: DateTime<Utc>) -> Result<Vec<StudySession>> {
        let sessions = sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE date >= ? ORDER BY date",
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Delete a session; unknown ids are a no-op
    pub async fn delete_session(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM study_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted session: {}", id);
        self.notify(Collection::StudySessions);
        Ok(())
    }

    // ===== Study tasks =====

    /// Create a task under an existing subject
    pub async fn create_task(&self, req: CreateTaskRequest) -> Result<StudyTask> {
        require(&req.title, "task title")?;
        self.ensure_subject(req.subject_id).await?;
        let now = Utc::now();

        let task = sqlx::query_as::<_, StudyTask>(
            r#"
            INSERT INTO study_tasks (subject_id, title, description, due_date, completed,
                                     created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.subject_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.due_date)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created task: {} under subject {}", task.id, req.subject_id);
        self.notify(Collection::StudyTasks);
        Ok(task)
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: i64) -> Result<StudyTask> {
        sqlx::query_as::<_, StudyTask>("SELECT * FROM study_tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("StudyTask", id))
    }

    /// List all tasks ordered by due date
    pub async fn list_tasks(&self) -> Result<Vec<StudyTask>> {
        let tasks = sqlx::query_as::<_, StudyTask>("SELECT * FROM study_tasks ORDER BY due_date")
            .fetch_all(&self.pool)
            .await?;

        Ok(tasks)
    }

    /// List a subject's tasks ordered by due date
    pub async fn list_tasks_for_subject(&self, subject_id: i64) -> Result<Vec<StudyTask>> {
        let tasks = sqlx::query_as::<_, StudyTask>(
            "SELECT * FROM study_tasks WHERE subject_id = ? ORDER BY due_date",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Update a task
    pub async fn update_task(&self, req: UpdateTaskRequest) -> Result<StudyTask> {
        if let Some(title) = &req.title {
            require(title, "task title")?;
        }
        let now = Utc::now();

        let mut query = "UPDATE study_tasks SET updated_at = ?".to_string();
        if req.title.is_some() {
            query.push_str(", title = ?");
        }
        if req.description.is_some() {
            query.push_str(", description = ?");
        }
        if req.due_date.is_some() {
            query.push_str(", due_date = ?");
        }
        if req.completed.is_some() {
            query.push_str(", completed = ?");
        }
        query.push_str(" WHERE id = ?");

        let mut q = sqlx::query(&query).bind(now);
        if let Some(title) = &req.title {
            q = q.bind(title);
        }
        if let Some(description) = &req.description {
            q = q.bind(description);
        }
        if let Some(due_date) = req.due_date {
            q = q.bind(due_date);
        }
        if let Some(completed) = req.completed {
            q = q.bind(completed);
        }

        let rows = q.bind(req.id).execute(&self.pool).await?.rows_affected();
        if rows == 0 {
            return Err(AppError::NotFound("StudyTask", req.id));
        }

        self.notify(Collection::StudyTasks);
        self.get_task(req.id).await
    }

    /// Delete a task; unknown ids are a no-op
    pub async fn delete_task(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM study_tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted task: {}", id);
        self.notify(Collection::StudyTasks);
        Ok(())
    }

    /// Tasks due within [start, end], inclusive, ordered by due date
    pub async fn tasks_due_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StudyTask>> {
        let tasks = sqlx::query_as::<_, StudyTask>(
            "SELECT * FROM study_tasks WHERE due_date >= ? AND due_date <= ? ORDER BY due_date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Incomplete tasks due at or before `cutoff`
    pub async fn overdue_tasks(&self, cutoff: DateTime<Utc>) -> Result<Vec<StudyTask>> {
        let tasks = sqlx::query_as::<_, StudyTask>(
            r#"
            SELECT * FROM study_tasks
            WHERE due_date <= ? AND completed = 0
            ORDER BY due_date
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    // ===== Store-wide operations =====

    /// Wipe all six collections in one transaction.
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for collection in DEPENDENT_TABLES {
            sqlx::query(&format!("DELETE FROM {}", collection.table()))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM subjects").execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::info!("Cleared all collections");
        for collection in DEPENDENT_TABLES {
            self.notify(collection);
        }
        self.notify(Collection::Subjects);
        Ok(())
    }

    /// Replace the whole store with the given records, preserving their
    /// ids, in one transaction. Nothing is committed if any insert fails.
    pub async fn restore_all(
        &self,
        subjects: &[Subject],
        notes: &[Note],
        flashcards: &[Flashcard],
        quizzes: &[Quiz],
        sessions: &[StudySession],
        tasks: &[StudyTask],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for collection in DEPENDENT_TABLES {
            sqlx::query(&format!("DELETE FROM {}", collection.table()))
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM subjects").execute(&mut *tx).await?;

        for subject in subjects {
            require(&subject.name, "subject name")?;
            sqlx::query(
                r#"
                INSERT INTO subjects (id, name, icon, color, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(subject.id)
            .bind(&subject.name)
            .bind(&subject.icon)
            .bind(&subject.color)
            .bind(subject.created_at)
            .bind(subject.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for note in notes {
            sqlx::query(
                r#"
                INSERT INTO notes (id, subject_id, title, content, tags, video_url,
                                   video_timestamp, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(note.id)
            .bind(note.subject_id)
            .bind(&note.title)
            .bind(&note.content)
            .bind(encode_tags(&note.tags)?)
            .bind(&note.video_url)
            .bind(note.video_timestamp)
            .bind(note.created_at)
            .bind(note.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for card in flashcards {
            sqlx::query(
                r#"
                INSERT INTO flashcards (id, subject_id, front, back, tags, last_reviewed,
                                        next_review_date, difficulty, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(card.id)
            .bind(card.subject_id)
            .bind(&card.front)
            .bind(&card.back)
            .bind(encode_tags(&card.tags)?)
            .bind(card.last_reviewed)
            .bind(card.next_review_date)
            .bind(card.difficulty)
            .bind(card.created_at)
            .bind(card.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for quiz in quizzes {
            sqlx::query(
                r#"
                INSERT INTO quizzes (id, subject_id, title, questions, last_score,
                                     created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(quiz.id)
            .bind(quiz.subject_id)
            .bind(&quiz.title)
            .bind(serde_json::to_string(&quiz.questions)?)
            .bind(quiz.last_score)
            .bind(quiz.created_at)
            .bind(quiz.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for session in sessions {
            let settings = session
                .pomodoro_settings
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            sqlx::query(
                r#"
                INSERT INTO study_sessions (id, subject_id, date, duration, notes,
                                            pomodoro_count, pomodoro_settings)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.id)
            .bind(session.subject_id)
            .bind(session.date)
            .bind(session.duration)
            .bind(&session.notes)
            .bind(session.pomodoro_count)
            .bind(settings)
            .execute(&mut *tx)
            .await?;
        }

        for task in tasks {
            sqlx::query(
                r#"
                INSERT INTO study_tasks (id, subject_id, title, description, due_date,
                                         completed, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(task.id)
            .bind(task.subject_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date)
            .bind(task.completed)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Restored store: {} subjects, {} notes, {} flashcards, {} quizzes, {} sessions, {} tasks",
            subjects.len(),
            notes.len(),
            flashcards.len(),
            quizzes.len(),
            sessions.len(),
            tasks.len()
        );
        for collection in DEPENDENT_TABLES {
            self.notify(collection);
        }
        self.notify(Collection::Subjects);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::create_memory_pool;
    use chrono::Duration;

    async fn create_test_repo() -> Repository {
        let pool = create_memory_pool().await.unwrap();
        Repository::new(pool)
    }

    async fn add_subject(repo: &Repository, name: &str) -> Subject {
        repo.create_subject(CreateSubjectRequest {
            name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_subject() {
        let repo = create_test_repo().await;

        let subject = add_subject(&repo, "Mathematics").await;
        assert_eq!(subject.name, "Mathematics");

        let fetched = repo.get_subject(subject.id).await.unwrap();
        assert_eq!(fetched.id, subject.id);
        assert_eq!(fetched.name, "Mathematics");
    }

    #[tokio::test]
    async fn test_create_subject_requires_name() {
        let repo = create_test_repo().await;

        let result = repo
            .create_subject(CreateSubjectRequest {
                name: "   ".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_subjects_sorted_by_name() {
        let repo = create_test_repo().await;

        add_subject(&repo, "Physics").await;
        add_subject(&repo, "Biology").await;
        add_subject(&repo, "Chemistry").await;

        let subjects = repo.list_subjects().await.unwrap();
        let names: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Biology", "Chemistry", "Physics"]);
    }

    #[tokio::test]
    async fn test_update_subject_refreshes_updated_at() {
        let repo = create_test_repo().await;

        let subject = add_subject(&repo, "History").await;

        let updated = repo
            .update_subject(UpdateSubjectRequest {
                id: subject.id,
                color: Some("#4F46E5".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.color.as_deref(), Some("#4F46E5"));
        assert_eq!(updated.name, "History");
        assert_eq!(updated.created_at, subject.created_at);
        assert!(updated.updated_at >= subject.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_subject_is_not_found() {
        let repo = create_test_repo().await;

        let result = repo
            .update_subject(UpdateSubjectRequest {
                id: 999,
                name: Some("Ghost".to_string()),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound("Subject", 999))));
    }

    #[tokio::test]
    async fn test_create_note_under_missing_subject_fails() {
        let repo = create_test_repo().await;

        let result = repo
            .create_note(CreateNoteRequest {
                subject_id: 42,
                title: "Orphan".to_string(),
                content: String::new(),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidReference(42))));
    }

    #[tokio::test]
    async fn test_note_tags_round_trip() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Biology").await;

        let note = repo
            .create_note(CreateNoteRequest {
                subject_id: subject.id,
                title: "Cells".to_string(),
                content: "Mitochondria".to_string(),
                tags: Some(vec!["organelles".to_string(), "exam".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();

        let fetched = repo.get_note(note.id).await.unwrap();
        assert_eq!(
            fetched.tags,
            Some(vec!["organelles".to_string(), "exam".to_string()])
        );

        let tagged = repo.list_notes_with_tag(subject.id, "exam").await.unwrap();
        assert_eq!(tagged.len(), 1);

        let untagged = repo.list_notes_with_tag(subject.id, "quiz").await.unwrap();
        assert!(untagged.is_empty());
    }

    #[tokio::test]
    async fn test_search_notes_scoped_to_subject() {
        let repo = create_test_repo().await;
        let biology = add_subject(&repo, "Biology").await;
        let physics = add_subject(&repo, "Physics").await;

        repo.create_note(CreateNoteRequest {
            subject_id: biology.id,
            title: "Photosynthesis".to_string(),
            content: "Light reactions".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        repo.create_note(CreateNoteRequest {
            subject_id: physics.id,
            title: "Optics".to_string(),
            content: "Light refraction".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let scoped = repo.search_notes(Some(biology.id), "LIGHT").await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].title, "Photosynthesis");

        let global = repo.search_notes(None, "light").await.unwrap();
        assert_eq!(global.len(), 2);
    }

    #[tokio::test]
    async fn test_update_note_merges_fields() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Chemistry").await;

        let note = repo
            .create_note(CreateNoteRequest {
                subject_id: subject.id,
                title: "Original".to_string(),
                content: "Body".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = repo
            .update_note(UpdateNoteRequest {
                id: note.id,
                title: Some("Updated".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.title, "Updated");
        assert_eq!(updated.content, "Body");
        assert_eq!(updated.created_at, note.created_at);
    }

    #[tokio::test]
    async fn test_delete_note_is_idempotent() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Chemistry").await;

        let note = repo
            .create_note(CreateNoteRequest {
                subject_id: subject.id,
                title: "Doomed".to_string(),
                content: String::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.delete_note(note.id).await.unwrap();
        repo.delete_note(note.id).await.unwrap();

        assert!(matches!(
            repo.get_note(note.id).await,
            Err(AppError::NotFound("Note", _))
        ));
    }

    #[tokio::test]
    async fn test_due_flashcards_inclusive_cutoff() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Spanish").await;
        let now = Utc::now();

        let due = repo
            .create_flashcard(CreateFlashcardRequest {
                subject_id: subject.id,
                front: "hola".to_string(),
                back: "hello".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.record_flashcard_review(due.id, 3, now - Duration::days(3), now)
            .await
            .unwrap();

        let later = repo
            .create_flashcard(CreateFlashcardRequest {
                subject_id: subject.id,
                front: "adios".to_string(),
                back: "goodbye".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.record_flashcard_review(later.id, 3, now, now + Duration::days(3))
            .await
            .unwrap();

        // A card with no review date is never due
        repo.create_flashcard(CreateFlashcardRequest {
            subject_id: subject.id,
            front: "gracias".to_string(),
            back: "thanks".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let due_now = repo.due_flashcards(now).await.unwrap();
        assert_eq!(due_now.len(), 1);
        assert_eq!(due_now[0].id, due.id);

        let due_for_subject = repo
            .due_flashcards_for_subject(subject.id, now)
            .await
            .unwrap();
        assert_eq!(due_for_subject.len(), 1);
    }

    #[tokio::test]
    async fn test_update_flashcard_rejects_bad_difficulty() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Spanish").await;

        let card = repo
            .create_flashcard(CreateFlashcardRequest {
                subject_id: subject.id,
                front: "uno".to_string(),
                back: "one".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let result = repo
            .update_flashcard(UpdateFlashcardRequest {
                id: card.id,
                difficulty: Some(6),
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    fn mcq(question: &str, correct: &str) -> QuizQuestion {
        QuizQuestion {
            question: question.to_string(),
            question_type: QuestionType::Mcq,
            options: vec![
                correct.to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            correct_answer: correct.to_string(),
        }
    }

    #[tokio::test]
    async fn test_quiz_questions_round_trip() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Geography").await;

        let quiz = repo
            .create_quiz(CreateQuizRequest {
                subject_id: subject.id,
                title: "Capitals".to_string(),
                questions: vec![mcq("Capital of France?", "Paris"), mcq("Capital of Peru?", "Lima")],
            })
            .await
            .unwrap();

        let fetched = repo.get_quiz(quiz.id).await.unwrap();
        assert_eq!(fetched.questions.len(), 2);
        assert_eq!(fetched.questions[0].correct_answer, "Paris");
        assert_eq!(fetched.questions[0].question_type, QuestionType::Mcq);
        assert_eq!(fetched.last_score, None);
    }

    #[tokio::test]
    async fn test_update_quiz_score_bounds() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Geography").await;

        let quiz = repo
            .create_quiz(CreateQuizRequest {
                subject_id: subject.id,
                title: "Capitals".to_string(),
                questions: vec![mcq("Capital of France?", "Paris")],
            })
            .await
            .unwrap();

        let scored = repo.update_quiz_score(quiz.id, 80).await.unwrap();
        assert_eq!(scored.last_score, Some(80));

        assert!(matches!(
            repo.update_quiz_score(quiz.id, 101).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_sessions_between_is_inclusive() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Latin").await;
        let base = Utc::now();

        for offset in [0i64, 1, 2] {
            repo.create_session(CreateSessionRequest {
                subject_id: subject.id,
                date: base + Duration::days(offset),
                duration: 30,
                notes: None,
                pomodoro_count: None,
                pomodoro_settings: None,
            })
            .await
            .unwrap();
        }

        let sessions = repo
            .sessions_between(base, base + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(sessions.len(), 2);

        let since = repo.sessions_since(base + Duration::days(1)).await.unwrap();
        assert_eq!(since.len(), 2);
    }

    #[tokio::test]
    async fn test_session_requires_positive_duration() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Latin").await;

        let result = repo
            .create_session(CreateSessionRequest {
                subject_id: subject.id,
                date: Utc::now(),
                duration: 0,
                notes: None,
                pomodoro_count: None,
                pomodoro_settings: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_pomodoro_settings_round_trip() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Latin").await;

        let settings = PomodoroSettings {
            work_duration: 25,
            break_duration: 5,
            long_break_duration: 15,
            sessions_until_long_break: 4,
        };

        let session = repo
            .create_session(CreateSessionRequest {
                subject_id: subject.id,
                date: Utc::now(),
                duration: 50,
                notes: Some("focused".to_string()),
                pomodoro_count: Some(2),
                pomodoro_settings: Some(settings.clone()),
            })
            .await
            .unwrap();

        let fetched = repo.get_session(session.id).await.unwrap();
        assert_eq!(fetched.pomodoro_settings, Some(settings));
        assert_eq!(fetched.pomodoro_count, Some(2));
    }

    #[tokio::test]
    async fn test_overdue_tasks_excludes_completed() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Law").await;
        let now = Utc::now();

        let overdue = repo
            .create_task(CreateTaskRequest {
                subject_id: subject.id,
                title: "Read chapter 4".to_string(),
                description: None,
                due_date: now - Duration::days(2),
            })
            .await
            .unwrap();

        let done = repo
            .create_task(CreateTaskRequest {
                subject_id: subject.id,
                title: "Read chapter 3".to_string(),
                description: None,
                due_date: now - Duration::days(3),
            })
            .await
            .unwrap();
        repo.update_task(UpdateTaskRequest {
            id: done.id,
            completed: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();

        repo.create_task(CreateTaskRequest {
            subject_id: subject.id,
            title: "Read chapter 5".to_string(),
            description: None,
            due_date: now + Duration::days(1),
        })
        .await
        .unwrap();

        let found = repo.overdue_tasks(now - Duration::days(1)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, overdue.id);
    }

    #[tokio::test]
    async fn test_tasks_due_between() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Law").await;
        let now = Utc::now();

        for offset in [1i64, 3, 10] {
            repo.create_task(CreateTaskRequest {
                subject_id: subject.id,
                title: format!("Task in {} days", offset),
                description: None,
                due_date: now + Duration::days(offset),
            })
            .await
            .unwrap();
        }

        let week = repo
            .tasks_due_between(now, now + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(week.len(), 2);
    }

    #[tokio::test]
    async fn test_cascade_delete_purges_dependents() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Doomed").await;
        let keep = add_subject(&repo, "Kept").await;
        let now = Utc::now();

        repo.create_note(CreateNoteRequest {
            subject_id: subject.id,
            title: "n".to_string(),
            content: String::new(),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.create_flashcard(CreateFlashcardRequest {
            subject_id: subject.id,
            front: "f".to_string(),
            back: "b".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.create_quiz(CreateQuizRequest {
            subject_id: subject.id,
            title: "q".to_string(),
            questions: vec![mcq("?", "A")],
        })
        .await
        .unwrap();
        repo.create_session(CreateSessionRequest {
            subject_id: subject.id,
            date: now,
            duration: 30,
            notes: None,
            pomodoro_count: None,
            pomodoro_settings: None,
        })
        .await
        .unwrap();
        repo.create_task(CreateTaskRequest {
            subject_id: subject.id,
            title: "t".to_string(),
            description: None,
            due_date: now,
        })
        .await
        .unwrap();

        let kept_note = repo
            .create_note(CreateNoteRequest {
                subject_id: keep.id,
                title: "survivor".to_string(),
                content: String::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.delete_subject_with_dependents(subject.id).await.unwrap();

        for collection in DEPENDENT_TABLES {
            let count = repo.count_for_subject(collection, subject.id).await.unwrap();
            assert_eq!(count, 0, "{} not purged", collection.table());
        }
        assert!(matches!(
            repo.get_subject(subject.id).await,
            Err(AppError::NotFound("Subject", _))
        ));

        // Unrelated subject untouched
        assert!(repo.get_note(kept_note.id).await.is_ok());
        assert!(repo.get_subject(keep.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_for_subject_counts_matches() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Pruned").await;

        for i in 0..3 {
            repo.create_note(CreateNoteRequest {
                subject_id: subject.id,
                title: format!("note {}", i),
                content: String::new(),
                ..Default::default()
            })
            .await
            .unwrap();
        }

        let removed = repo
            .delete_for_subject(Collection::Notes, subject.id)
            .await
            .unwrap();
        assert_eq!(removed, 3);

        // Nothing left to match; still not an error
        let removed = repo
            .delete_for_subject(Collection::Notes, subject.id)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn test_change_feed_announces_mutations() {
        let repo = create_test_repo().await;
        let mut changes = repo.changes();

        add_subject(&repo, "Announce").await;

        let change = changes.recv().await.unwrap();
        assert_eq!(change.collection, Collection::Subjects);
    }

    #[tokio::test]
    async fn test_clear_all_empties_every_collection() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Wiped").await;
        repo.create_note(CreateNoteRequest {
            subject_id: subject.id,
            title: "n".to_string(),
            content: String::new(),
            ..Default::default()
        })
        .await
        .unwrap();

        repo.clear_all().await.unwrap();

        assert!(repo.list_subjects().await.unwrap().is_empty());
        assert!(repo.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_all_preserves_ids() {
        let repo = create_test_repo().await;
        let subject = add_subject(&repo, "Source").await;
        let note = repo
            .create_note(CreateNoteRequest {
                subject_id: subject.id,
                title: "n".to_string(),
                content: "c".to_string(),
                tags: Some(vec!["t".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();

        let subjects = repo.list_subjects().await.unwrap();
        let notes = repo.list_notes().await.unwrap();

        // Restore into a fresh store
        let other = create_test_repo().await;
        other
            .restore_all(&subjects, &notes, &[], &[], &[], &[])
            .await
            .unwrap();

        let restored = other.get_note(note.id).await.unwrap();
        assert_eq!(restored, note);
        assert_eq!(other.get_subject(subject.id).await.unwrap(), subject);
    }
}
