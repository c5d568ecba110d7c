//! KhirMinTaki configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::directive::DirectiveMarkers;

/// Main KhirMinTaki configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inference provider configuration
    pub llm: LlmConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Tutor interaction settings
    pub tutor: TutorConfig,

    /// Directive marker vocabulary shared with the prompts
    pub markers: DirectiveMarkers,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before starting a chat
    ///
    /// Checks that API key environment variables are set for every configured
    /// provider and that the marker vocabulary is usable.
    pub fn validate(&self) -> Result<()> {
        self.llm.primary.get_api_key()?;
        if let Some(fallback) = &self.llm.fallback {
            fallback.get_api_key()?;
        }
        self.markers.validate().map_err(|e| eyre::eyre!(e))?;
        if self.tutor.history_window == 0 {
            return Err(eyre::eyre!("tutor.history-window must be at least 1"));
        }
        if self.tutor.save_retries == 0 {
            return Err(eyre::eyre!("tutor.save-retries must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .khirmintaki.yml
        let local_config = PathBuf::from(".khirmintaki.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/khirmintaki/khirmintaki.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("khirmintaki").join("khirmintaki.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Inference provider configuration: a primary and an optional fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub primary: ProviderConfig,

    pub fallback: Option<ProviderConfig>,

    /// Upper bound for one provider attempt, in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            primary: ProviderConfig::groq(),
            fallback: Some(ProviderConfig::gemini()),
            timeout_ms: 60_000,
        }
    }
}

/// One inference provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name: "groq", "openai" or "gemini"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// HTTP request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::groq()
    }
}

impl ProviderConfig {
    /// Groq, through its OpenAI-compatible endpoint
    pub fn groq() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            base_url: "https://api.groq.com/openai".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }

    /// Google Gemini
    pub fn gemini() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 60_000,
        }
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).map_err(|_| {
            eyre::eyre!(
                "API key for provider '{}' not found. Set the {} environment variable.",
                self.provider,
                self.api_key_env
            )
        })
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the session store
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: khirstore::cli::default_store_path(),
        }
    }
}

/// Tutor interaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    /// Number of most recent turns sent with each request
    #[serde(rename = "history-window")]
    pub history_window: usize,

    /// Diagnostic questions expected before the plan is produced
    #[serde(rename = "assessment-questions")]
    pub assessment_questions: u32,

    /// Extra save attempts after a failed session write (at least 1)
    #[serde(rename = "save-retries")]
    pub save_retries: u32,

    /// Max tokens requested per reply
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Directory with prompt template overrides (`<name>.pmt`)
    #[serde(rename = "prompts-dir")]
    pub prompts_dir: Option<PathBuf>,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            history_window: 3,
            assessment_questions: 10,
            save_retries: 1,
            max_tokens: 2048,
            prompts_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.primary.provider, "groq");
        assert_eq!(config.llm.fallback.as_ref().map(|f| f.provider.as_str()), Some("gemini"));
        assert_eq!(config.llm.timeout_ms, 60_000);
        assert_eq!(config.tutor.history_window, 3);
        assert_eq!(config.tutor.assessment_questions, 10);
        assert_eq!(config.tutor.save_retries, 1);
        assert_eq!(config.markers, DirectiveMarkers::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
llm:
  primary:
    provider: openai
    model: gpt-4o-mini
    api-key-env: OPENAI_API_KEY
    base-url: https://api.openai.com
  fallback: null
  timeout-ms: 5000
tutor:
  history-window: 6
markers:
  plan-ready: "<<PLAN>>"
log-level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.primary.provider, "openai");
        assert_eq!(config.llm.primary.max_tokens, 4096);
        assert!(config.llm.fallback.is_none());
        assert_eq!(config.llm.timeout_ms, 5000);
        assert_eq!(config.tutor.history_window, 6);
        assert_eq!(config.tutor.save_retries, 1);
        assert_eq!(config.markers.plan_ready, "<<PLAN>>");
        assert_eq!(config.markers.resume_update, "[RESUME_UPDATE]");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tutor:\n  assessment-questions: 5").unwrap();
        let path = file.path().to_path_buf();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.tutor.assessment_questions, 5);
        assert_eq!(Config::load_log_level(Some(&path)), None);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/khirmintaki.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    #[serial]
    fn test_validate_requires_api_keys() {
        let mut config = Config::default();
        config.llm.primary.api_key_env = "KT_TEST_PRIMARY_KEY".to_string();
        config.llm.fallback = None;

        // SAFETY: serialized with other env-mutating tests
        unsafe { std::env::remove_var("KT_TEST_PRIMARY_KEY") };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KT_TEST_PRIMARY_KEY"));

        unsafe { std::env::set_var("KT_TEST_PRIMARY_KEY", "secret") };
        assert!(config.validate().is_ok());
        unsafe { std::env::remove_var("KT_TEST_PRIMARY_KEY") };
    }

    #[test]
    #[serial]
    fn test_validate_requires_a_save_retry() {
        let mut config = Config::default();
        config.llm.primary.api_key_env = "KT_TEST_RETRY_KEY".to_string();
        config.llm.fallback = None;

        unsafe { std::env::set_var("KT_TEST_RETRY_KEY", "secret") };
        let zero: TutorConfig = serde_yaml::from_str("save-retries: 0").unwrap();
        config.tutor = zero;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("save-retries"));

        config.tutor.save_retries = 1;
        assert!(config.validate().is_ok());
        unsafe { std::env::remove_var("KT_TEST_RETRY_KEY") };
    }

    #[test]
    #[serial]
    fn test_validate_rejects_empty_marker() {
        let mut config = Config::default();
        config.llm.primary.api_key_env = "KT_TEST_MARKER_KEY".to_string();
        config.llm.fallback = None;
        config.markers.resume_update = String::new();

        unsafe { std::env::set_var("KT_TEST_MARKER_KEY", "secret") };
        assert!(config.validate().is_err());
        unsafe { std::env::remove_var("KT_TEST_MARKER_KEY") };
    }
}
