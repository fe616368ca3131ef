//! Planner service
//!
//! Study tasks and sessions, due-window queries, and the activity
//! heatmap aggregation used by the week/month/quarter views.

use crate::database::{
    CreateSessionRequest, CreateTaskRequest, Repository, StudySession, StudyTask,
    UpdateTaskRequest,
};
use crate::error::Result;
use crate::time::{end_of_previous_local_day, local_date, local_day_bounds, start_of_day};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Total study minutes per local calendar day over the trailing
/// `window_days` ending on the day containing `now`, inclusive.
///
/// Every day of the window is present; days without sessions map to 0.
/// Sessions outside the window are ignored.
pub fn activity_heatmap(
    sessions: &[StudySession],
    window_days: u32,
    now: DateTime<Utc>,
) -> BTreeMap<NaiveDate, i64> {
    let today = local_date(now);
    let first = today - Duration::days(window_days as i64 - 1);

    let mut heatmap: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut day = first;
    while day <= today {
        heatmap.insert(day, 0);
        day += Duration::days(1);
    }

    for session in sessions {
        let day = local_date(session.date);
        if let Some(total) = heatmap.get_mut(&day) {
            *total += session.duration;
        }
    }

    heatmap
}

/// Service for study tasks and sessions
#[derive(Clone)]
pub struct PlannerService {
    repo: Repository,
}

impl PlannerService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    // ===== Tasks =====

    /// Create a new task under a subject
    pub async fn create_task(&self, req: CreateTaskRequest) -> Result<StudyTask> {
        tracing::info!("Creating task '{}' under subject {}", req.title, req.subject_id);

        let task = self.repo.create_task(req).await?;

        tracing::info!("Task created successfully: {}", task.id);
        Ok(task)
    }

    /// Get a task by ID
    pub async fn get_task(&self, id: i64) -> Result<StudyTask> {
        self.repo.get_task(id).await
    }

    /// List a subject's tasks ordered by due date
    pub async fn list_tasks(&self, subject_id: i64) -> Result<Vec<StudyTask>> {
        self.repo.list_tasks_for_subject(subject_id).await
    }

    /// Update a task
    pub async fn update_task(&self, req: UpdateTaskRequest) -> Result<StudyTask> {
        tracing::debug!("Updating task: {}", req.id);
        self.repo.update_task(req).await
    }

    /// Flip a task's completion state
    pub async fn toggle_task(&self, id: i64) -> Result<StudyTask> {
        let task = self.repo.get_task(id).await?;
        self.repo
            .update_task(UpdateTaskRequest {
                id,
                completed: Some(!task.completed),
                ..Default::default()
            })
            .await
    }

    /// Delete a task
    pub async fn delete_task(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting task: {}", id);
        self.repo.delete_task(id).await
    }

    /// Tasks due between now and `days` days ahead, inclusive
    pub async fn tasks_due_within(
        &self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudyTask>> {
        self.repo
            .tasks_due_between(now, now + Duration::days(days as i64))
            .await
    }

    /// Incomplete tasks whose due date has passed the end of yesterday
    pub async fn overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<StudyTask>> {
        self.repo.overdue_tasks(end_of_previous_local_day(now)).await
    }

    // ===== Sessions =====

    /// Record a study session under a subject
    pub async fn record_session(&self, req: CreateSessionRequest) -> Result<StudySession> {
        tracing::info!(
            "Recording {} minute session under subject {}",
            req.duration,
            req.subject_id
        );

        self.repo.create_session(req).await
    }

    /// List a subject's sessions ordered by date
    pub async fn list_sessions(&self, subject_id: i64) -> Result<Vec<StudySession>> {
        self.repo.list_sessions_for_subject(subject_id).await
    }

    /// Delete a session
    pub async fn delete_session(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting session: {}", id);
        self.repo.delete_session(id).await
    }

    /// Sessions falling on the local calendar day `day`
    pub async fn sessions_on_day(
        &self,
        day: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<StudySession>> {
        let (start, end) = local_day_bounds(day, now);
        self.repo.sessions_between(start, end).await
    }

    /// Per-day study minutes over the trailing window ending today
    pub async fn heatmap(
        &self,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, i64>> {
        let first = local_date(now) - Duration::days(window_days as i64 - 1);
        let sessions = self.repo.sessions_since(start_of_day(first, now)).await?;

        Ok(activity_heatmap(&sessions, window_days, now))
    }
}
