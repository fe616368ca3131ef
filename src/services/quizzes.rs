//! Quizzes service
//!
//! Quiz lifecycle with question validation and attempt grading.
//! Grading is exact string equality against the stored correct answer.

use crate::config::QUIZ_OPTION_COUNT;
use crate::database::{CreateQuizRequest, Quiz, QuizQuestion, Repository};
use crate::error::{AppError, Result};

/// Validate a question sequence before it is stored.
///
/// Every question must carry exactly four options and a correct answer
/// that is one of them.
pub fn validate_questions(questions: &[QuizQuestion]) -> Result<()> {
    for q in questions {
        if q.question.trim().is_empty() || q.correct_answer.trim().is_empty() {
            return Err(AppError::Validation(
                "one or more questions are missing required fields".to_string(),
            ));
        }
        if q.options.len() != QUIZ_OPTION_COUNT {
            return Err(AppError::Validation(format!(
                "multiple-choice questions must have exactly {} options",
                QUIZ_OPTION_COUNT
            )));
        }
        if !q.options.contains(&q.correct_answer) {
            return Err(AppError::Validation(
                "correct answer must be one of the options provided".to_string(),
            ));
        }
    }
    Ok(())
}

/// Service for managing quizzes
#[derive(Clone)]
pub struct QuizzesService {
    repo: Repository,
}

impl QuizzesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new quiz under a subject after validating its questions
    pub async fn create_quiz(&self, req: CreateQuizRequest) -> Result<Quiz> {
        validate_questions(&req.questions)?;

        tracing::info!(
            "Creating quiz '{}' with {} questions under subject {}",
            req.title,
            req.questions.len(),
            req.subject_id
        );

        let quiz = self.repo.create_quiz(req).await?;

        tracing::info!("Quiz created successfully: {}", quiz.id);
        Ok(quiz)
    }

    /// Get a quiz by ID
    pub async fn get_quiz(&self, id: i64) -> Result<Quiz> {
        self.repo.get_quiz(id).await
    }

    /// List a subject's quizzes, most recently changed first
    pub async fn list_quizzes(&self, subject_id: i64) -> Result<Vec<Quiz>> {
        self.repo.list_quizzes_for_subject(subject_id).await
    }

    /// Delete a quiz
    pub async fn delete_quiz(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting quiz: {}", id);
        self.repo.delete_quiz(id).await
    }

    /// Grade an attempt and store the score.
    ///
    /// `answers` line up with the question order; missing answers count
    /// as wrong. Matching is exact string equality.
    pub async fn grade_attempt(&self, id: i64, answers: &[String]) -> Result<Quiz> {
        let quiz = self.repo.get_quiz(id).await?;
        if quiz.questions.is_empty() {
            return Err(AppError::Validation(
                "cannot grade a quiz with no questions".to_string(),
            ));
        }

        let correct = quiz
            .questions
            .iter()
            .zip(answers.iter())
            .filter(|(q, a)| &q.correct_answer == *a)
            .count();

        let score = (correct * 100 / quiz.questions.len()) as i64;

        tracing::debug!(
            "Graded quiz {}: {}/{} correct ({}%)",
            id,
            correct,
            quiz.questions.len(),
            score
        );

        self.repo.update_quiz_score(id, score).await
    }

    /// Store an externally computed score
    pub async fn record_score(&self, id: i64, score: i64) -> Result<Quiz> {
        self.repo.update_quiz_score(id, score).await
    }
}
