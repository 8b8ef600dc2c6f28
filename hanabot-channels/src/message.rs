//! Inbound chat events.

use serde::{Deserialize, Serialize};

/// A line of chat addressed to a channel or to the bot directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Transport-local message id
    pub id: String,
    /// Nick of the speaker
    pub sender: String,
    /// Channel the line was said in; `None` for a private message
    pub channel: Option<String>,
    /// Raw text, addressing prefix included
    pub text: String,
    /// Unix millis
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn public(
        sender: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::build(sender.into(), Some(channel.into()), text.into())
    }

    pub fn private(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::build(sender.into(), None, text.into())
    }

    fn build(sender: String, channel: Option<String>, text: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            channel,
            text,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.channel.is_none()
    }
}

/// Everything a transport reports to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(ChatMessage),
    /// Someone, possibly the bot itself, joined a channel.
    Joined { channel: String, nick: String },
    /// `nick` was kicked from `channel` by `by`.
    Kicked {
        channel: String,
        nick: String,
        by: String,
    },
}
