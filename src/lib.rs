//! # optfin backend
//!
//! REST backend for user accounts, news articles, crypto/exchange listings,
//! and a Telegram-bridged support chat. The core is the JWT session flow:
//! issuance, verification, refresh with single-slot rotation, and ownership
//! checks on mutating endpoints.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "optfin";
