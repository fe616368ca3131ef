//! Preferences service
//!
//! Small UI preferences (theme, accent) persisted as a JSON file with an
//! explicit load/save contract. Missing keys default.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// User interface preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// "light" or "dark"
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Accent color name or hex value
    #[serde(default = "default_accent")]
    pub accent: String,
}

fn default_theme() -> String {
    "light".to_string()
}

fn default_accent() -> String {
    "#4F46E5".to_string()
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            accent: default_accent(),
        }
    }
}

/// Service for managing preferences
#[derive(Clone)]
pub struct PreferencesService {
    preferences_path: PathBuf,
}

impl PreferencesService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            preferences_path: data_dir.join("preferences.json"),
        }
    }

    /// Load preferences from disk or create defaults if not present
    pub async fn load(&self) -> Result<Preferences> {
        if !self.preferences_path.exists() {
            tracing::info!("Preferences file not found, creating defaults");
            let default = Preferences::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.preferences_path).await?;
        let preferences: Preferences = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse preferences: {}", e)))?;

        Ok(preferences)
    }

    /// Save preferences to disk
    pub async fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.preferences_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(preferences)?;
        fs::write(&self.preferences_path, content).await?;
        tracing::info!("Preferences saved to {:?}", self.preferences_path);

        Ok(())
    }

    /// Update the theme, leaving other preferences untouched
    pub async fn set_theme(&self, theme: &str) -> Result<()> {
        let mut preferences = self.load().await?;
        preferences.theme = theme.to_string();
        self.save(&preferences).await
    }

    /// Update the accent, leaving other preferences untouched
    pub async fn set_accent(&self, accent: &str) -> Result<()> {
        let mut preferences = self.load().await?;
        preferences.accent = accent.to_string();
        self.save(&preferences).await
    }
}
