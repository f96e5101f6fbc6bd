use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{info, warn};

use crate::chunker::DEFAULT_CHUNK_CHARS;
use crate::llm_providers::LLMProviderType;

// Import logging macros
use crate::{log_system_event, log_validation};

const PLACEHOLDER_API_KEY: &str = "your-api-key";

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LLMConfig,
    pub quiz: QuizConfig,
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Large Language Model client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub provider: LLMProviderType,
    pub model: Option<String>,
    pub timeout_secs: u64,
}

/// Quiz generation and summarization tuning
#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    pub max_attempts: usize,
    pub summary_chunk_chars: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Upload limits
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_upload_mb: u64,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            llm: LLMConfig::from_env()?,
            quiz: QuizConfig::from_env()?,
            server: ServerConfig::from_env()?,
            upload: UploadConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            llm_provider = ?self.llm.provider,
            llm_model = ?self.llm.model,
            llm_api_key_masked = %mask_sensitive_data(&self.llm.api_key),
            quiz_max_attempts = self.quiz.max_attempts,
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            max_upload_mb = self.upload.max_upload_mb,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.upload.max_upload_mb == 0 {
            return Err(anyhow!("MAX_UPLOAD_MB must be greater than 0"));
        }

        if self.llm.api_key.is_empty() || self.llm.api_key == PLACEHOLDER_API_KEY {
            warn!("LLM API key appears to be placeholder or empty - AI features will fail");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Unusual log level '{}', tracing may fall back to defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let name = env::var("DATABASE_NAME").unwrap_or_else(|_| "study_buddy.db".to_string());
            format!("sqlite:{}", name)
        });

        Ok(DatabaseConfig { url })
    }
}

impl LLMConfig {
    fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .unwrap_or_else(|_| PLACEHOLDER_API_KEY.to_string());

        let base_url = env::var("LLM_BASE_URL").ok();

        let provider = LLMProviderType::parse(
            &env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string()),
        );

        let model = env::var("LLM_MODEL").ok();

        let timeout_str = env::var("LLM_TIMEOUT_SECS").unwrap_or_else(|_| "120".to_string());
        let timeout_secs = timeout_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid LLM_TIMEOUT_SECS value: '{}'", timeout_str))?;

        Ok(LLMConfig {
            api_key,
            base_url,
            provider,
            model,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl QuizConfig {
    fn from_env() -> Result<Self> {
        let attempts_str = env::var("QUIZ_MAX_ATTEMPTS").unwrap_or_else(|_| "2".to_string());
        let max_attempts = attempts_str
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid QUIZ_MAX_ATTEMPTS value: '{}'", attempts_str))?;

        let chunk_str =
            env::var("SUMMARY_CHUNK_CHARS").unwrap_or_else(|_| DEFAULT_CHUNK_CHARS.to_string());
        let summary_chunk_chars = chunk_str
            .parse::<usize>()
            .map_err(|_| anyhow!("Invalid SUMMARY_CHUNK_CHARS value: '{}'", chunk_str))?;

        Ok(QuizConfig {
            max_attempts,
            summary_chunk_chars,
        })
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            summary_chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl UploadConfig {
    fn from_env() -> Result<Self> {
        let size_str = env::var("MAX_UPLOAD_MB").unwrap_or_else(|_| "10".to_string());
        let max_upload_mb = size_str
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid MAX_UPLOAD_MB value: '{}'", size_str))?;

        Ok(UploadConfig { max_upload_mb })
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb * 1024 * 1024) as usize
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_upload_mb: 10 }
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,study_buddy=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn sample_config() -> Config {
        Config {
            database: DatabaseConfig {
                url: "sqlite:test.db".to_string(),
            },
            llm: LLMConfig {
                api_key: "AIza-valid-key".to_string(),
                base_url: None,
                provider: LLMProviderType::Gemini,
                model: None,
                timeout_secs: 120,
            },
            quiz: QuizConfig::default(),
            server: ServerConfig {
                port: 8000,
                host: "0.0.0.0".to_string(),
            },
            upload: UploadConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        }
    }

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("sqlite:study_buddy.db"), "sqli***y.db");
        assert_eq!(mask_sensitive_data("AIzaSyD-1234567890"), "AIza***7890");
    }

    #[test]
    fn test_config_validation() {
        let config = sample_config();
        assert!(config.validate().is_ok());

        let mut invalid_port = config.clone();
        invalid_port.server.port = 0;
        assert!(invalid_port.validate().is_err());

        let mut postgres = config.clone();
        postgres.database.url = "postgres://localhost/db".to_string();
        assert!(postgres.validate().is_err());

        let mut no_uploads = config;
        no_uploads.upload.max_upload_mb = 0;
        assert!(no_uploads.validate().is_err());
    }

    // Env-mutating checks share one test so they cannot race each other.
    #[test]
    fn test_env_defaults_and_overrides() {
        unsafe {
            env::remove_var("DATABASE_URL");
            env::set_var("DATABASE_NAME", "notes.db");
            env::remove_var("PORT");
            env::remove_var("HOST");
            env::remove_var("QUIZ_MAX_ATTEMPTS");
            env::remove_var("LLM_API_KEY");
            env::set_var("GEMINI_API_KEY", "gemini-secret");
        }

        assert_eq!(DatabaseConfig::from_env().unwrap().url, "sqlite:notes.db");

        let server = ServerConfig::from_env().unwrap();
        assert_eq!(server.port, 8000);
        assert_eq!(server.host, "0.0.0.0");

        assert_eq!(QuizConfig::from_env().unwrap().max_attempts, 2);
        assert_eq!(LLMConfig::from_env().unwrap().api_key, "gemini-secret");

        unsafe { env::set_var("PORT", "not-a-number"); }
        assert!(ServerConfig::from_env().is_err());

        unsafe {
            env::remove_var("PORT");
            env::remove_var("DATABASE_NAME");
            env::remove_var("GEMINI_API_KEY");
        }
    }

    #[test]
    fn test_upload_limit_in_bytes() {
        assert_eq!(UploadConfig { max_upload_mb: 2 }.max_upload_bytes(), 2 * 1024 * 1024);
    }
}
