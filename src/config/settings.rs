//! # Configuration Settings
//!
//! Defines the configuration structure for the optfin backend.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name).and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env_var(name).map(|s| s.to_lowercase() == "true" || s == "1").unwrap_or(default)
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[validate(nested)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Telegram collaborator configuration
    #[validate(nested)]
    pub telegram: TelegramConfig,
}

impl AppConfig {
    /// Load the full configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
            telegram: TelegramConfig::from_env(),
        };
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Custom validation logic that goes beyond what the validator crate can do
    fn validate_custom(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(Error::validation("JWT secret must be at least 32 characters long"));
        }

        if self.auth.access_token_lifetime_seconds >= self.auth.refresh_token_lifetime_seconds {
            return Err(Error::validation(
                "Access token lifetime must be shorter than refresh token lifetime",
            ));
        }

        if !self.database.url.starts_with("sqlite:") {
            return Err(Error::validation("Database URL must start with 'sqlite:'"));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, enable_cors: true }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: env_parse("SERVER_PORT", 8080),
            enable_cors: env_bool("SERVER_ENABLE_CORS", true),
        }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 60, message = "Connect timeout must be between 1 and 60 seconds"))]
    pub connect_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/optfin.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: env_var("DATABASE_URL").unwrap_or_else(|| "sqlite://./data/optfin.db".to_string()),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 0),
            connect_timeout_seconds: env_parse("DATABASE_CONNECT_TIMEOUT_SECONDS", 10),
            auto_migrate: env_bool("DATABASE_AUTO_MIGRATE", true),
        }
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Authentication configuration
///
/// The signing secret and token lifetimes are fixed for the lifetime of the
/// process; services receive this struct by reference at construction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// HS256 signing secret shared by the token codec and confirmation signer
    #[validate(length(min = 32, message = "JWT secret must be at least 32 characters"))]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[validate(range(min = 1, message = "Access token lifetime must be positive"))]
    pub access_token_lifetime_seconds: u64,

    /// Refresh token lifetime in seconds
    #[validate(range(min = 1, message = "Refresh token lifetime must be positive"))]
    pub refresh_token_lifetime_seconds: u64,

    /// When true, accounts start inactive and must confirm their email
    /// address before they can authenticate. When false, accounts are active
    /// at registration. Inactive accounts are rejected either way.
    pub require_email_confirmation: bool,

    /// Maximum age of an email confirmation token in seconds
    pub confirmation_token_max_age_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "insecure-development-secret-change-me-00".to_string(),
            access_token_lifetime_seconds: 3600,
            refresh_token_lifetime_seconds: 60 * 60 * 24 * 7,
            require_email_confirmation: false,
            confirmation_token_max_age_seconds: 60 * 60 * 24,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt_secret: env_var("JWT_SECRET_KEY").unwrap_or(defaults.jwt_secret),
            access_token_lifetime_seconds: env_parse(
                "JWT_ACCESS_TOKEN_LIFETIME",
                defaults.access_token_lifetime_seconds,
            ),
            refresh_token_lifetime_seconds: env_parse(
                "JWT_REFRESH_TOKEN_LIFETIME",
                defaults.refresh_token_lifetime_seconds,
            ),
            require_email_confirmation: env_bool("AUTH_REQUIRE_EMAIL_CONFIRMATION", false),
            confirmation_token_max_age_seconds: env_parse(
                "EMAIL_CONFIRMATION_TOKEN_MAX_AGE",
                defaults.confirmation_token_max_age_seconds,
            ),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: env_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json_logs: env_var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        }
    }
}

/// Telegram collaborator configuration
///
/// The bot token is optional: without it the backend falls back to a no-op
/// notifier and chat messages are only logged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: Option<String>,

    /// Chat id of the admin conversation messages are bridged into
    pub admin_chat_id: Option<String>,

    /// Telegram API base URL (overridable for tests)
    pub api_base: Option<String>,
}

impl TelegramConfig {
    pub fn from_env() -> Self {
        Self {
            bot_token: env_var("TELEGRAM_BOT_TOKEN"),
            admin_chat_id: env_var("ADMIN_CHAT_ID"),
            api_base: env_var("TELEGRAM_API_BASE"),
        }
    }

    /// True when enough settings are present to talk to the Telegram API
    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.admin_chat_id.is_some()
    }
}
