//! Repository traits and their SQLite implementations.

mod crypto_coin;
mod exchange;
mod news;
mod user;

pub use crypto_coin::{CryptoCoin, CryptoCoinRepository, NewCryptoCoin, SqlxCryptoCoinRepository};
pub use exchange::{Exchange, ExchangeRepository, NewExchange, SqlxExchangeRepository};
pub use news::{NewNews, News, NewsRepository, SqlxNewsRepository, UpdateNews};
pub use user::{SqlxUserRepository, UserRepository};
