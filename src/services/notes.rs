//! Notes service
//!
//! High-level business logic for notes under a subject, including
//! subject-scoped search and tag filtering.

use crate::database::{CreateNoteRequest, Note, Repository, UpdateNoteRequest};
use crate::error::Result;

/// Service for managing notes
#[derive(Clone)]
pub struct NotesService {
    repo: Repository,
}

impl NotesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new note under a subject
    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        tracing::info!("Creating note '{}' under subject {}", req.title, req.subject_id);

        let note = self.repo.create_note(req).await?;

        tracing::info!("Note created successfully: {}", note.id);
        Ok(note)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        self.repo.get_note(id).await
    }

    /// List a subject's notes, most recently changed first
    pub async fn list_notes(&self, subject_id: i64) -> Result<Vec<Note>> {
        self.repo.list_notes_for_subject(subject_id).await
    }

    /// Update a note
    pub async fn update_note(&self, req: UpdateNoteRequest) -> Result<Note> {
        tracing::debug!("Updating note: {}", req.id);
        self.repo.update_note(req).await
    }

    /// Delete a note
    pub async fn delete_note(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting note: {}", id);
        self.repo.delete_note(id).await
    }

    /// Search notes by title or content, optionally scoped to a subject
    pub async fn search_notes(&self, subject_id: Option<i64>, query: &str) -> Result<Vec<Note>> {
        self.repo.search_notes(subject_id, query).await
    }

    /// A subject's notes carrying the exact tag
    pub async fn notes_with_tag(&self, subject_id: i64, tag: &str) -> Result<Vec<Note>> {
        self.repo.list_notes_with_tag(subject_id, tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, CreateSubjectRequest};

    async fn create_test_service() -> (NotesService, i64) {
        let pool = create_memory_pool().await.unwrap();
        let repo = Repository::new(pool);

        let subject = repo
            .create_subject(CreateSubjectRequest {
                name: "Biology".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        (NotesService::new(repo), subject.id)
    }

    #[tokio::test]
    async fn test_create_and_get_note() {
        let (service, subject_id) = create_test_service().await;

        let note = service
            .create_note(CreateNoteRequest {
                subject_id,
                title: "Cells".to_string(),
                content: "The cell is the basic unit of life".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let fetched = service.get_note(note.id).await.unwrap();
        assert_eq!(fetched.id, note.id);
        assert_eq!(fetched.title, "Cells");
    }

    #[tokio::test]
    async fn test_search_notes() {
        let (service, subject_id) = create_test_service().await;

        for (title, content) in [
            ("Photosynthesis", "Chloroplasts capture light"),
            ("Respiration", "Mitochondria burn glucose"),
            ("Osmosis", "Water crosses membranes"),
        ] {
            service
                .create_note(CreateNoteRequest {
                    subject_id,
                    title: title.to_string(),
                    content: content.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let results = service
            .search_notes(Some(subject_id), "mitochondria")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Respiration");
    }

    #[tokio::test]
    async fn test_notes_sorted_by_last_change() {
        let (service, subject_id) = create_test_service().await;

        let first = service
            .create_note(CreateNoteRequest {
                subject_id,
                title: "First".to_string(),
                content: String::new(),
                ..Default::default()
            })
            .await
            .unwrap();
        service
            .create_note(CreateNoteRequest {
                subject_id,
                title: "Second".to_string(),
                content: String::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        // Touching the first note moves it to the top
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service
            .update_note(UpdateNoteRequest {
                id: first.id,
                content: Some("edited".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let notes = service.list_notes(subject_id).await.unwrap();
        assert_eq!(notes[0].title, "First");
    }
}
