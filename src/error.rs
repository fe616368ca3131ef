//! Error types for the StudyStash engine
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for display in a host application.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    #[error("Invalid reference: subject {0} does not exist")]
    InvalidReference(i64),

    #[error("Daily limit reached for {feature} ({limit}/day)")]
    QuotaExceeded { feature: String, limit: u32 },

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
