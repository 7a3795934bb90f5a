//! Configuration management
//!
//! Settings live in `settings.json` inside the kasboek directory:
//! ```json
//! {
//!   "import": { "chunkSize": 50, "maxConcurrency": 5, "maxAttempts": 3,
//!               "retryBackoffMs": 500, "defaultAccountName": "Hoofdrekening" },
//!   "classifier": { "model": "gpt-4o", "baseUrl": "https://api.openai.com/v1/",
//!                   "timeoutSecs": 30 }
//! }
//! ```
//!
//! The API key is never stored; it comes from `OPENAI_API_KEY`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    classifier: ClassifierSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Batch import tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSettings {
    /// Records classified and persisted together
    pub chunk_size: usize,
    /// Classifier calls in flight at once
    pub max_concurrency: usize,
    /// Attempts per classifier call, including the first
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Name of the account created for a household's first import
    pub default_account_name: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_concurrency: 5,
            max_attempts: 3,
            retry_backoff_ms: 500,
            default_account_name: "Hoofdrekening".to_string(),
        }
    }
}

impl ImportSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// External classifier endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierSettings {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Kasboek configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    pub classifier: ClassifierSettings,
    /// Classifier API key; classification is disabled without one
    pub api_key: Option<String>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the kasboek directory
    ///
    /// Environment overrides:
    /// - `OPENAI_API_KEY`
    /// - `KASBOEK_OPENAI_BASE_URL`
    /// - `KASBOEK_CHUNK_SIZE`
    /// - `KASBOEK_MAX_CONCURRENCY`
    pub fn load(kasboek_dir: &Path) -> Result<Self> {
        Self::load_with_env(kasboek_dir, |key| std::env::var(key).ok())
    }

    fn load_with_env(kasboek_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = kasboek_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let mut import = raw.import.clone();
        let mut classifier = raw.classifier.clone();

        if let Some(url) = env("KASBOEK_OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            classifier.base_url = url;
        }
        if let Some(size) = env("KASBOEK_CHUNK_SIZE").and_then(|v| v.trim().parse().ok()) {
            import.chunk_size = size;
        }
        if let Some(limit) = env("KASBOEK_MAX_CONCURRENCY").and_then(|v| v.trim().parse().ok()) {
            import.max_concurrency = limit;
        }

        // Zero would stall the batch
        import.chunk_size = import.chunk_size.max(1);
        import.max_concurrency = import.max_concurrency.max(1);
        import.max_attempts = import.max_attempts.max(1);

        Ok(Self {
            import,
            classifier,
            api_key: env("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            _raw_settings: raw,
        })
    }

    /// Save config to the kasboek directory
    /// Preserves settings kasboek doesn't manage
    pub fn save(&self, kasboek_dir: &Path) -> Result<()> {
        let settings_path = kasboek_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.import = self.import.clone();
        settings.classifier = self.classifier.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn classification_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
