//! Subjects service
//!
//! Lifecycle management for subjects, including the cascading delete
//! that keeps the five dependent collections consistent.

use crate::database::{
    CreateSubjectRequest, Repository, Subject, UpdateSubjectRequest,
};
use crate::error::Result;

/// Service for managing subjects
#[derive(Clone)]
pub struct SubjectsService {
    repo: Repository,
}

impl SubjectsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new subject
    pub async fn create_subject(&self, req: CreateSubjectRequest) -> Result<Subject> {
        tracing::info!("Creating subject: {}", req.name);

        let subject = self.repo.create_subject(req).await?;

        tracing::info!("Subject created successfully: {}", subject.id);
        Ok(subject)
    }

    /// Get a subject by ID
    pub async fn get_subject(&self, id: i64) -> Result<Subject> {
        self.repo.get_subject(id).await
    }

    /// List all subjects ordered by name
    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.repo.list_subjects().await
    }

    /// Update a subject
    pub async fn update_subject(&self, req: UpdateSubjectRequest) -> Result<Subject> {
        tracing::debug!("Updating subject: {}", req.id);
        self.repo.update_subject(req).await
    }

    /// Delete a subject together with its notes, flashcards, quizzes,
    /// sessions and tasks. The cascade is a single unit of work.
    pub async fn delete_subject(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting subject {} and all dependent records", id);

        self.repo.delete_subject_with_dependents(id).await?;

        tracing::info!("Subject deleted successfully: {}", id);
        Ok(())
    }
}
