//! HTTP request handlers.

pub mod auth;
pub mod chat;
pub mod cryptocurrencies;
pub mod exchanges;
pub mod health;
pub mod news;
pub mod users;
