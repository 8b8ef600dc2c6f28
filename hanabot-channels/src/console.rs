//! Console transport for playing locally in a terminal.
//!
//! Every stdin line is said in one pretend channel. A line of the form
//! `<nick> text` speaks as `nick`, so one terminal can play several seats.

use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::message::{ChatEvent, ChatMessage};
use crate::traits::{Transport, TransportResult};

/// The pretend channel console lines are said in.
pub const CONSOLE_CHANNEL: &str = "#console";

pub struct ConsoleTransport {
    user: String,
    nickname: String,
}

impl ConsoleTransport {
    /// `user` speaks unprefixed lines and is the channel operator.
    pub fn new(user: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            nickname: nickname.into(),
        }
    }

    /// Split an input line into speaker and text.
    pub fn parse_line(&self, line: &str) -> Option<ChatMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if let Some(rest) = line.strip_prefix('<') {
            if let Some((nick, text)) = rest.split_once('>') {
                let nick = nick.trim();
                if !nick.is_empty() && !nick.contains(char::is_whitespace) {
                    return Some(ChatMessage::public(nick, CONSOLE_CHANNEL, text.trim()));
                }
            }
        }
        Some(ChatMessage::public(self.user.as_str(), CONSOLE_CHANNEL, line))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    fn nickname(&self) -> String {
        self.nickname.clone()
    }

    async fn send_public(&self, channel: &str, line: &str) -> TransportResult<()> {
        println!("[{channel}] {line}");
        Ok(())
    }

    async fn send_private(&self, nick: &str, line: &str) -> TransportResult<()> {
        println!("[-> {nick}] {line}");
        Ok(())
    }

    async fn join(&self, channel: &str) -> TransportResult<()> {
        println!("* {} joins {channel}", self.nickname);
        Ok(())
    }

    async fn part(&self, channel: &str) -> TransportResult<()> {
        println!("* {} leaves {channel}", self.nickname);
        Ok(())
    }

    async fn set_topic(&self, channel: &str, topic: &str) -> TransportResult<()> {
        println!("* topic for {channel}: {topic}");
        Ok(())
    }

    fn is_operator(&self, _channel: &str, nick: &str) -> bool {
        nick == self.user
    }

    async fn listen(&self, tx: mpsc::Sender<ChatEvent>) -> TransportResult<()> {
        let mut lines = BufReader::new(io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim() == "/quit" || line.trim() == "/exit" {
                break;
            }
            let Some(msg) = self.parse_line(&line) else {
                continue;
            };
            if tx.send(ChatEvent::Message(msg)).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    fn reconnects(&self) -> bool {
        false
    }

    async fn shutdown(&self, reason: &str) -> TransportResult<()> {
        println!("* {} quits ({reason})", self.nickname);
        Ok(())
    }
}
