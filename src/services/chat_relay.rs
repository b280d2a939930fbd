//! In-process registry that routes admin replies to connected WebSocket
//! sessions.
//!
//! The Telegram side (bot polling or a webhook) lives outside this process;
//! whatever ingests admin replies calls [`ChatRelay::deliver`] with the user
//! id parsed from the forwarded message's tag line.

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::UserId;

const CHANNEL_CAPACITY: usize = 32;

/// One broadcast channel per user with at least one open socket.
#[derive(Default)]
pub struct ChatRelay {
    channels: DashMap<UserId, broadcast::Sender<String>>,
}

impl ChatRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a socket to the user's reply stream, creating the channel on
    /// first use. Multiple sockets for the same user each get every message.
    pub fn subscribe(&self, user_id: &UserId) -> broadcast::Receiver<String> {
        self.channels
            .entry(user_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Push a message to the user's open sockets. Returns the number of
    /// sockets that received it; channels with no remaining subscribers are
    /// dropped from the registry.
    pub fn deliver(&self, user_id: &UserId, message: String) -> usize {
        let delivered = match self.channels.get(user_id) {
            Some(sender) => sender.send(message).unwrap_or(0),
            None => 0,
        };

        if delivered == 0 {
            self.channels.remove_if(user_id, |_, sender| sender.receiver_count() == 0);
            debug!(%user_id, "No open sockets for user, message dropped");
        }

        delivered
    }

    /// Drop the user's channel when no subscribers remain. Socket handlers
    /// call this after releasing their receiver so closed sessions do not
    /// leave an entry behind.
    pub fn prune(&self, user_id: &UserId) {
        self.channels.remove_if(user_id, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of users with a live channel, for diagnostics.
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }
}

/// Extract the user id from a forwarded message's tag line
/// (`UserID:{id} | {login} wrote:` followed by the body).
pub fn parse_user_id_tag(text: &str) -> Option<UserId> {
    let rest = text.strip_prefix("UserID:")?;
    let id = rest.split([' ', '|']).next()?.trim();
    if id.is_empty() {
        return None;
    }
    Some(UserId::from_string(id.to_string()))
}
