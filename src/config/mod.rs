//! # Configuration
//!
//! Immutable application configuration, constructed once at process start
//! from environment variables and passed explicitly to the components that
//! need it. Nothing in the crate reads ambient global settings after startup.

mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, ServerConfig, TelegramConfig,
};
