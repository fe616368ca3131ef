//! Generative-language API client
//!
//! The remote API is an opaque collaborator: a prompt and generation
//! parameters go in, generated text comes out. The trait seam lets the
//! generation flows run against a scripted client under test.

use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Sampling parameters sent with every request
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            params: GenerationParams::default(),
        }
    }
}

/// The generated text of a successful request
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
}

/// Client seam for the generative-language API
pub trait GenerativeClient: Send + Sync {
    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GenerationResponse>> + Send;
}

/// Harm categories blocked at medium severity and above
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorEnvelope {
    #[serde(default)]
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// HTTP client against a `generateContent`-style endpoint
#[derive(Clone)]
pub struct HttpGenerativeClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpGenerativeClient {
    pub fn new(endpoint: String, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

impl GenerativeClient for HttpGenerativeClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let safety_settings: Vec<_> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": SAFETY_THRESHOLD }))
            .collect();

        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "temperature": request.params.temperature,
                "topK": request.params.top_k,
                "topP": request.params.top_p,
                "maxOutputTokens": request.params.max_output_tokens,
            },
            "safetySettings": safety_settings,
        });

        tracing::debug!("Sending generation request ({} chars)", request.prompt.len());

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let envelope: ApiErrorEnvelope = response.json().await.unwrap_or_default();
            let message = if envelope.error.message.is_empty() {
                status.to_string()
            } else {
                envelope.error.message
            };
            return Err(AppError::Generic(format!("API Error: {}", message)));
        }

        let data: GenerateContentResponse = response.json().await?;

        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                AppError::Generic("Generation API returned no candidates".to_string())
            })?;

        tracing::debug!("Received generation response ({} chars)", text.len());
        Ok(GenerationResponse { text })
    }
}
