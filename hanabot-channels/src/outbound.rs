//! Outbound reply routing.
//!
//! Takes the public and private halves of a reply and puts each line on the
//! wire: public lines to the channel first, then private lines to the
//! sender, one transport call per line and in the order given.

use std::sync::Arc;

use crate::traits::Transport;

/// Where a reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Channel for public lines
    pub channel: String,
    /// Nick for private lines
    pub nick: String,
}

impl ReplyTarget {
    pub fn new(channel: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            nick: nick.into(),
        }
    }
}

/// Result of a send operation.
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Whether the send was successful
    pub success: bool,
    /// Channel or nick the line was sent to
    pub target: String,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Per-line results of one delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub results: Vec<SendResult>,
}

impl DeliveryReport {
    pub fn sent(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.sent()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }
}

/// Sends replies through one transport.
#[derive(Clone)]
pub struct OutboundRouter {
    transport: Arc<dyn Transport>,
}

impl OutboundRouter {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Deliver both halves of a reply.
    ///
    /// A failed line is logged and counted; the lines after it are still sent.
    pub async fn deliver(
        &self,
        target: &ReplyTarget,
        public: &[String],
        private: &[String],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for line in public {
            let result = self.transport.send_public(&target.channel, line).await;
            report.results.push(self.record(&target.channel, result));
        }
        for line in private {
            let result = self.transport.send_private(&target.nick, line).await;
            report.results.push(self.record(&target.nick, result));
        }

        if !report.is_complete() {
            tracing::warn!(
                transport = self.transport.name(),
                channel = %target.channel,
                nick = %target.nick,
                failed = report.failed(),
                sent = report.sent(),
                "reply partially delivered"
            );
        }
        report
    }

    fn record(&self, to: &str, result: crate::traits::TransportResult<()>) -> SendResult {
        match result {
            Ok(()) => SendResult {
                success: true,
                target: to.to_string(),
                error: None,
            },
            Err(e) => {
                tracing::error!(transport = self.transport.name(), to = %to, "send failed: {e}");
                SendResult {
                    success: false,
                    target: to.to_string(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
