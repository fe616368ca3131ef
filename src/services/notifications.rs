//! Notifications service
//!
//! Derives the notification feed from overdue tasks and due flashcards.
//! The feed is exposed through an explicit subscription: `subscribe`
//! hands out a watch receiver, and a background task recomputes the feed
//! hourly and whenever a relevant collection changes.

use crate::config::NOTIFICATION_REFRESH_INTERVAL;
use crate::database::{Collection, Repository};
use crate::error::Result;
use crate::time::{end_of_previous_local_day, start_of_local_day};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, watch};

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    /// An incomplete task whose due date has passed
    OverdueTask,
    /// Flashcards in a subject have come due for review
    FlashcardsDue,
}

/// One entry of the notification feed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Stable identity within a feed, e.g. "task-3" or "flashcard-7"
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub subject_id: i64,
    /// Set for task notifications so the task can be completed in place
    pub task_id: Option<i64>,
}

/// Service deriving and publishing the notification feed
#[derive(Clone)]
pub struct NotificationsService {
    repo: Repository,
    feed: watch::Sender<Vec<Notification>>,
}

impl NotificationsService {
    pub fn new(repo: Repository) -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self { repo, feed }
    }

    /// Subscribe to the feed. The receiver holds the latest computed
    /// value; callers drop it to unsubscribe.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.feed.subscribe()
    }

    /// Compute the current feed without publishing it
    pub async fn compute(&self, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        let mut notifications = Vec::new();
        let mut subject_names: BTreeMap<i64, String> = BTreeMap::new();
        for subject in self.repo.list_subjects().await? {
            subject_names.insert(subject.id, subject.name);
        }
        let unknown = "Unknown Subject".to_string();

        let overdue = self.repo.overdue_tasks(end_of_previous_local_day(now)).await?;
        for task in overdue {
            let subject_name = subject_names.get(&task.subject_id).unwrap_or(&unknown);
            notifications.push(Notification {
                id: format!("task-{}", task.id),
                kind: NotificationKind::OverdueTask,
                message: format!("Overdue task: {} - {}", subject_name, task.title),
                subject_id: task.subject_id,
                task_id: Some(task.id),
            });
        }

        let due = self.repo.due_flashcards(start_of_local_day(now)).await?;
        let mut due_by_subject: BTreeMap<i64, usize> = BTreeMap::new();
        for card in due {
            *due_by_subject.entry(card.subject_id).or_insert(0) += 1;
        }

        for (subject_id, count) in due_by_subject {
            let subject_name = subject_names.get(&subject_id).unwrap_or(&unknown);
            notifications.push(Notification {
                id: format!("flashcard-{}", subject_id),
                kind: NotificationKind::FlashcardsDue,
                message: format!("{} flashcards due for review in {}", count, subject_name),
                subject_id,
                task_id: None,
            });
        }

        Ok(notifications)
    }

    /// Recompute the feed and publish it to all subscribers
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<()> {
        let notifications = self.compute(now).await?;

        tracing::debug!("Notification feed refreshed: {} entries", notifications.len());
        self.feed.send_replace(notifications);
        Ok(())
    }

    /// Mark a task notification's task completed; the feed drops it on
    /// the next recomputation
    pub async fn complete_task(&self, task_id: i64) -> Result<()> {
        self.repo
            .update_task(crate::database::UpdateTaskRequest {
                id: task_id,
                completed: Some(true),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    /// Start the background refresher.
    ///
    /// Recomputes at the configured interval, and immediately when a
    /// task, flashcard or subject mutation is announced on the change
    /// feed. Runs until the repository is dropped.
    pub fn start_refresher(self) {
        tokio::spawn(async move {
            tracing::info!("Starting notification refresher");

            let mut changes = self.repo.changes();
            let mut interval = tokio::time::interval(NOTIFICATION_REFRESH_INTERVAL);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    change = changes.recv() => match change {
                        Ok(change) if matches!(
                            change.collection,
                            Collection::StudyTasks | Collection::Flashcards | Collection::Subjects
                        ) => {}
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Notification refresher lagged {} changes", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }

                if let Err(e) = self.refresh(Utc::now()).await {
                    tracing::error!("Error refreshing notifications: {}", e);
                }
            }

            tracing::info!("Notification refresher stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        create_memory_pool, CreateFlashcardRequest, CreateSubjectRequest, CreateTaskRequest,
    };
    use chrono::Duration;

    async fn create_test_service() -> (NotificationsService, Repository, i64) {
        let pool = create_memory_pool().await.unwrap();
        let repo = Repository::new(pool);

        let subject = repo
            .create_subject(CreateSubjectRequest {
                name: "Anatomy".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        (NotificationsService::new(repo.clone()), repo, subject.id)
    }

    #[tokio::test]
    async fn test_overdue_task_appears_and_completion_removes_it() {
        let (service, repo, subject_id) = create_test_service().await;
        let now = Utc::now();

        let task = repo
            .create_task(CreateTaskRequest {
                subject_id,
                title: "Label the skeleton".to_string(),
                description: None,
                due_date: now - Duration::days(2),
            })
            .await
            .unwrap();

        let feed = service.compute(now).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::OverdueTask);
        assert_eq!(feed[0].id, format!("task-{}", task.id));
        assert_eq!(
            feed[0].message,
            "Overdue task: Anatomy - Label the skeleton"
        );

        service.complete_task(task.id).await.unwrap();

        let feed = service.compute(now).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_due_flashcards_grouped_per_subject() {
        let (service, repo, subject_id) = create_test_service().await;
        let now = Utc::now();

        for front in ["femur", "tibia", "ulna"] {
            let card = repo
                .create_flashcard(CreateFlashcardRequest {
                    subject_id,
                    front: front.to_string(),
                    back: "a bone".to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
            repo.record_flashcard_review(card.id, 3, now - Duration::days(5), now - Duration::days(2))
                .await
                .unwrap();
        }

        let feed = service.compute(now).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::FlashcardsDue);
        assert_eq!(feed[0].message, "3 flashcards due for review in Anatomy");
    }

    #[tokio::test]
    async fn test_task_due_today_is_not_overdue() {
        let (service, repo, subject_id) = create_test_service().await;
        let now = Utc::now();

        repo.create_task(CreateTaskRequest {
            subject_id,
            title: "Due later today".to_string(),
            description: None,
            due_date: now,
        })
        .await
        .unwrap();

        let feed = service.compute(now).await.unwrap();
        assert!(feed.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_publishes_to_subscribers() {
        let (service, repo, subject_id) = create_test_service().await;
        let now = Utc::now();

        let mut rx = service.subscribe();
        assert!(rx.borrow().is_empty());

        repo.create_task(CreateTaskRequest {
            subject_id,
            title: "Missed deadline".to_string(),
            description: None,
            due_date: now - Duration::days(1),
        })
        .await
        .unwrap();

        service.refresh(now).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }
}
