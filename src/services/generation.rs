//! Generation service
//!
//! Quota-gated flows against the generative-language API: chat turns,
//! quiz generation from selected notes, and per-note flashcard
//! generation. The quota is checked before any request leaves the
//! process and recorded only after the generated content is stored.

use crate::ai::{GenerationParams, GenerationRequest, GenerativeClient};
use crate::config::{MAX_QUIZ_QUESTIONS, MIN_QUIZ_QUESTIONS};
use crate::database::{
    CreateFlashcardRequest, CreateQuizRequest, Flashcard, Quiz, QuestionType, QuizQuestion,
    Repository,
};
use crate::error::{AppError, Result};
use crate::services::quizzes::validate_questions;
use crate::services::quota::{QuotaKey, QuotaTracker};
use crate::time::local_date;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// Output cap for content-producing generations
const CONTENT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Slice out the first JSON array in a response, tolerating explanatory
/// text around it.
fn extract_json_array(text: &str) -> &str {
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    question: String,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedCard {
    front: String,
    back: String,
}

fn parse_generated_questions(text: &str) -> Result<Vec<QuizQuestion>> {
    let raw: Vec<GeneratedQuestion> = serde_json::from_str(extract_json_array(text))
        .map_err(|_| {
            AppError::Validation("invalid questions format received from the API".to_string())
        })?;

    if raw.is_empty() {
        return Err(AppError::Validation(
            "invalid questions format received from the API".to_string(),
        ));
    }

    // Whatever the model claims, the stored questions are multiple-choice
    Ok(raw
        .into_iter()
        .map(|q| QuizQuestion {
            question: q.question,
            question_type: QuestionType::Mcq,
            options: q.options,
            correct_answer: q.correct_answer,
        })
        .collect())
}

fn parse_generated_cards(text: &str) -> Result<Vec<GeneratedCard>> {
    let cards: Vec<GeneratedCard> = serde_json::from_str(extract_json_array(text))
        .map_err(|_| {
            AppError::Validation("invalid flashcards format received from the API".to_string())
        })?;

    if cards.is_empty() {
        return Err(AppError::Validation(
            "invalid flashcards format received from the API".to_string(),
        ));
    }

    Ok(cards)
}

fn quiz_prompt(question_count: usize, note_contents: &str) -> String {
    format!(
        "Based on the following study notes, create a comprehensive quiz with exactly {count} multiple-choice questions.\n\
         \n\
         For each question:\n\
         - Create challenging, thought-provoking questions that test deep understanding\n\
         - Provide exactly 4 answer options (A, B, C, D)\n\
         - Include one clear correct answer and three plausible distractors\n\
         - Ensure all options are approximately the same length\n\
         - Avoid patterns in correct answer positions\n\
         \n\
         Format the response as a JSON array of questions following this structure:\n\
         [\n\
           {{\n\
             \"question\": \"The question text\",\n\
             \"type\": \"mcq\",\n\
             \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],\n\
             \"correctAnswer\": \"The correct answer text exactly matching one of the options\"\n\
           }}\n\
         ]\n\
         \n\
         Make sure the questions test understanding of important concepts from the notes and cover a broad range of topics.\n\
         \n\
         Here are the study notes:\n\
         \n\
         {notes}",
        count = question_count,
        notes = note_contents
    )
}

fn flashcard_prompt(note_content: &str) -> String {
    format!(
        "Generate flashcards from the following notes. For each important concept, \
         create a question-and-answer pair. Format as JSON array with \"front\" (question) \
         and \"back\" (answer) properties for each card. Limit to exactly 15 flashcards \
         per note. Notes: {}",
        note_content
    )
}

/// Service running the quota-gated generation flows
pub struct GenerationService<C> {
    repo: Repository,
    quota: Arc<QuotaTracker>,
    client: C,
}

impl<C: GenerativeClient> GenerationService<C> {
    pub fn new(repo: Repository, quota: Arc<QuotaTracker>, client: C) -> Self {
        Self {
            repo,
            quota,
            client,
        }
    }

    /// Send one chat turn. Gated by the global chat quota.
    pub async fn send_chat_message(&self, message: &str, now: DateTime<Utc>) -> Result<String> {
        let key = QuotaKey::chat();
        let today = local_date(now);
        self.quota.check(&key, today).await?;

        let response = self
            .client
            .generate(GenerationRequest::new(message.to_string()))
            .await?;

        self.quota.record(&key, today).await?;
        Ok(response.text)
    }

    /// Generate a quiz from the given notes and store it under the
    /// subject. Gated by the per-subject quiz quota; the question count
    /// must be within the configured bounds.
    pub async fn generate_quiz(
        &self,
        subject_id: i64,
        note_ids: &[i64],
        title: &str,
        question_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Quiz> {
        if !(MIN_QUIZ_QUESTIONS..=MAX_QUIZ_QUESTIONS).contains(&question_count) {
            return Err(AppError::Validation(format!(
                "question count must be between {} and {}",
                MIN_QUIZ_QUESTIONS, MAX_QUIZ_QUESTIONS
            )));
        }
        if note_ids.is_empty() {
            return Err(AppError::Validation(
                "select at least one note to generate a quiz from".to_string(),
            ));
        }

        let key = QuotaKey::quiz_generation(subject_id);
        let today = local_date(now);
        self.quota.check(&key, today).await?;

        let mut note_contents = Vec::with_capacity(note_ids.len());
        for &note_id in note_ids {
            let note = self.repo.get_note(note_id).await?;
            note_contents.push(format!(
                "Note Title: {}\nContent: {}",
                note.title, note.content
            ));
        }

        tracing::info!(
            "Generating a {}-question quiz for subject {} from {} notes",
            question_count,
            subject_id,
            note_ids.len()
        );

        let response = self
            .client
            .generate(GenerationRequest {
                prompt: quiz_prompt(question_count, &note_contents.join("\n\n")),
                params: GenerationParams {
                    max_output_tokens: CONTENT_MAX_OUTPUT_TOKENS,
                    ..Default::default()
                },
            })
            .await?;

        let mut questions = parse_generated_questions(&response.text)?;
        if questions.len() > question_count {
            questions.truncate(question_count);
        } else if questions.len() < question_count {
            tracing::warn!(
                "Only {} questions were generated instead of {}",
                questions.len(),
                question_count
            );
        }
        validate_questions(&questions)?;

        let quiz = self
            .repo
            .create_quiz(CreateQuizRequest {
                subject_id,
                title: title.to_string(),
                questions,
            })
            .await?;

        self.quota.record(&key, today).await?;

        tracing::info!("Generated quiz {} for subject {}", quiz.id, subject_id);
        Ok(quiz)
    }

    /// Generate flashcards from one note and store them under the
    /// note's subject. Gated by the per-note flashcard quota.
    pub async fn generate_flashcards(
        &self,
        note_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Flashcard>> {
        let note = self.repo.get_note(note_id).await?;

        let key = QuotaKey::flashcard_generation(note_id);
        let today = local_date(now);
        self.quota.check(&key, today).await?;

        tracing::info!("Generating flashcards from note {}", note_id);

        let response = self
            .client
            .generate(GenerationRequest {
                prompt: flashcard_prompt(&format!(
                    "Note Title: {}\nContent: {}",
                    note.title, note.content
                )),
                params: GenerationParams {
                    max_output_tokens: CONTENT_MAX_OUTPUT_TOKENS,
                    ..Default::default()
                },
            })
            .await?;

        let generated = parse_generated_cards(&response.text)?;

        let mut cards = Vec::with_capacity(generated.len());
        for card in generated {
            cards.push(
                self.repo
                    .create_flashcard(CreateFlashcardRequest {
                        subject_id: note.subject_id,
                        front: card.front,
                        back: card.back,
                        tags: None,
                    })
                    .await?,
            );
        }

        self.quota.record(&key, today).await?;

        tracing::info!("Generated {} flashcards from note {}", cards.len(), note_id);
        Ok(cards)
    }
}
