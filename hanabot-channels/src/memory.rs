//! In-memory transport for tests.
//!
//! Records every outgoing call in order and replays a scripted list of
//! events from `listen`.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::ChatEvent;
use crate::traits::{Transport, TransportError, TransportResult};

/// One recorded outgoing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Public { channel: String, line: String },
    Private { nick: String, line: String },
    Join(String),
    Part(String),
    Topic { channel: String, topic: String },
    Quit(String),
}

#[derive(Default)]
pub struct MemoryTransport {
    nickname: String,
    sent: Mutex<Vec<Sent>>,
    operators: Mutex<HashSet<(String, String)>>,
    /// Nicks whose private sends fail
    unreachable: Mutex<HashSet<String>>,
    script: Mutex<Vec<ChatEvent>>,
}

impl MemoryTransport {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            ..Self::default()
        }
    }

    /// Give `nick` operator status in `channel`.
    pub fn with_operator(self, channel: &str, nick: &str) -> Self {
        self.operators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((channel.to_string(), nick.to_string()));
        self
    }

    /// Make private sends to `nick` fail.
    pub fn with_unreachable(self, nick: &str) -> Self {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(nick.to_string());
        self
    }

    /// Events `listen` delivers, in order, before returning.
    pub fn with_script(self, events: Vec<ChatEvent>) -> Self {
        *self.script.lock().unwrap_or_else(PoisonError::into_inner) = events;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines said in `channel`, in order.
    pub fn public_lines(&self, channel: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Public { channel: c, line } if c == channel => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Lines sent to `nick`, in order.
    pub fn private_lines(&self, nick: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Private { nick: n, line } if n == nick => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, sent: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sent);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn nickname(&self) -> String {
        self.nickname.clone()
    }

    async fn send_public(&self, channel: &str, line: &str) -> TransportResult<()> {
        self.record(Sent::Public {
            channel: channel.to_string(),
            line: line.to_string(),
        });
        Ok(())
    }

    async fn send_private(&self, nick: &str, line: &str) -> TransportResult<()> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(nick);
        if unreachable {
            return Err(TransportError::SendFailed(format!("no such nick {nick}")));
        }
        self.record(Sent::Private {
            nick: nick.to_string(),
            line: line.to_string(),
        });
        Ok(())
    }

    async fn join(&self, channel: &str) -> TransportResult<()> {
        self.record(Sent::Join(channel.to_string()));
        Ok(())
    }

    async fn part(&self, channel: &str) -> TransportResult<()> {
        self.record(Sent::Part(channel.to_string()));
        Ok(())
    }

    async fn set_topic(&self, channel: &str, topic: &str) -> TransportResult<()> {
        self.record(Sent::Topic {
            channel: channel.to_string(),
            topic: topic.to_string(),
        });
        Ok(())
    }

    fn is_operator(&self, channel: &str, nick: &str) -> bool {
        self.operators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(channel.to_string(), nick.to_string()))
    }

    async fn listen(&self, tx: mpsc::Sender<ChatEvent>) -> TransportResult<()> {
        let events =
            std::mem::take(&mut *self.script.lock().unwrap_or_else(PoisonError::into_inner));
        for event in events {
            tx.send(event)
                .await
                .map_err(|_| TransportError::Connection("event receiver dropped".into()))?;
        }
        Ok(())
    }

    fn reconnects(&self) -> bool {
        false
    }

    async fn shutdown(&self, reason: &str) -> TransportResult<()> {
        self.record(Sent::Quit(reason.to_string()));
        Ok(())
    }
}
