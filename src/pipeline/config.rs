//! Pipeline configuration.
//!
//! Generation limits, retry budget, storage location and the question types
//! requested for new tasks.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::records::QuestionType;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the pipeline coordinator and its agents.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Generation settings
    /// Bound on a single generation call.
    pub generation_timeout: Duration,
    /// Sampling temperature for every agent.
    pub temperature: f64,
    /// Output token limit for the content stage.
    pub content_max_tokens: u32,
    /// Output token limit for the rt and de stages.
    pub review_max_tokens: u32,
    /// Output token limit for the validator stage.
    pub validator_max_tokens: u32,

    // Retry settings
    /// Attempts per stage in `run_all` before the failure becomes fatal.
    pub max_stage_attempts: u32,

    // Storage and inputs
    /// Root directory for task files and exported results.
    pub data_dir: PathBuf,
    /// Optional directory overriding the built-in templates and rubrics.
    pub templates_dir: Option<PathBuf>,
    /// Question types requested for new tasks.
    pub question_types: Vec<QuestionType>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(120),
            temperature: 0.7,
            content_max_tokens: 2000,
            review_max_tokens: 2000,
            validator_max_tokens: 3000,

            max_stage_attempts: 3,

            data_dir: PathBuf::from("./data"),
            templates_dir: None,
            question_types: QuestionType::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QUIZ_GENERATION_TIMEOUT_SECS`: Per-call generation timeout (default: 120)
    /// - `QUIZ_MAX_STAGE_ATTEMPTS`: Attempts per stage in `run_all` (default: 3)
    /// - `QUIZ_TEMPERATURE`: Sampling temperature (default: 0.7)
    /// - `QUIZ_DATA_DIR`: Task and output directory (default: ./data)
    /// - `QUIZ_TEMPLATES_DIR`: Template and rubric overrides (optional)
    /// - `QUIZ_QUESTION_TYPES`: Comma-separated question types (default: all)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUIZ_GENERATION_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "QUIZ_GENERATION_TIMEOUT_SECS")?;
            config.generation_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("QUIZ_MAX_STAGE_ATTEMPTS") {
            config.max_stage_attempts = parse_env_value(&val, "QUIZ_MAX_STAGE_ATTEMPTS")?;
        }

        if let Ok(val) = std::env::var("QUIZ_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "QUIZ_TEMPERATURE")?;
        }

        if let Ok(val) = std::env::var("QUIZ_DATA_DIR") {
            config.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("QUIZ_TEMPLATES_DIR") {
            if !val.trim().is_empty() {
                config.templates_dir = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("QUIZ_QUESTION_TYPES") {
            config.question_types = parse_question_types(&val).map_err(|message| {
                ConfigError::InvalidValue {
                    key: "QUIZ_QUESTION_TYPES".to_string(),
                    message,
                }
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "generation_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_stage_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_stage_attempts must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.content_max_tokens == 0 || self.review_max_tokens == 0 || self.validator_max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "token limits must be greater than 0".to_string(),
            ));
        }

        if self.question_types.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "at least one question type is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder method to set the generation timeout.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Builder method to set temperature.
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    /// Builder method to set the retry budget per stage.
    pub fn with_max_stage_attempts(mut self, attempts: u32) -> Self {
        self.max_stage_attempts = attempts;
        self
    }

    /// Builder method to set the content stage token limit.
    pub fn with_content_max_tokens(mut self, tokens: u32) -> Self {
        self.content_max_tokens = tokens;
        self
    }

    /// Builder method to set the review stages token limit.
    pub fn with_review_max_tokens(mut self, tokens: u32) -> Self {
        self.review_max_tokens = tokens;
        self
    }

    /// Builder method to set the validator stage token limit.
    pub fn with_validator_max_tokens(mut self, tokens: u32) -> Self {
        self.validator_max_tokens = tokens;
        self
    }

    /// Builder method to set the data directory.
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Builder method to set the templates directory.
    pub fn with_templates_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(path.into());
        self
    }

    /// Builder method to set the requested question types.
    pub fn with_question_types(mut self, types: Vec<QuestionType>) -> Self {
        self.question_types = types;
        self
    }
}

/// Parses a comma-separated list of question types, dropping duplicates.
pub fn parse_question_types(value: &str) -> Result<Vec<QuestionType>, String> {
    let mut types = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let question_type: QuestionType = part.parse().map_err(|e| format!("{}", e))?;
        if !types.contains(&question_type) {
            types.push(question_type);
        }
    }
    if types.is_empty() {
        return Err("no question types given".to_string());
    }
    Ok(types)
}

/// Helper function to parse environment variable values.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
