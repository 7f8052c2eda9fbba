use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend API, without a trailing slash
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Lead time before token expiry at which renewal is attempted
    pub buffer_seconds: u64,
    /// Minimum interval between renewal attempts
    pub cooldown_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: 300, // 5 minutes
            cooldown_seconds: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let base_url = std::env::var("IDEABOARD_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let buffer_seconds = std::env::var("REFRESH_BUFFER_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let cooldown_seconds = std::env::var("REFRESH_COOLDOWN_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let config = Config {
            api: ApiConfig {
                base_url,
                request_timeout_seconds,
            },
            refresh: RefreshConfig {
                buffer_seconds,
                cooldown_seconds,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "IDEABOARD_API_URL cannot be empty".to_string(),
            ));
        }

        if self.refresh.buffer_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "REFRESH_BUFFER_SECONDS must be greater than zero".to_string(),
            ));
        }

        if self.refresh.cooldown_seconds >= self.refresh.buffer_seconds {
            tracing::warn!(
                "Refresh cooldown ({}s) is at least as long as the refresh buffer ({}s). \
                 A failed renewal may not be retryable before expiry.",
                self.refresh.cooldown_seconds,
                self.refresh.buffer_seconds
            );
        }

        Ok(())
    }
}
