//! Edge collaborators: the Telegram bridge and the in-process chat relay.

pub mod chat_relay;
pub mod telegram;

pub use chat_relay::{parse_user_id_tag, ChatRelay};
pub use telegram::{ChatNotifier, NoopNotifier, TelegramClient};
