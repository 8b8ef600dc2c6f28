//! The bot loop.
//!
//! One transport listener feeds a single event queue. Everything after that
//! (classify, dispatch, reply) happens on the one task that drains the
//! queue, so the session registry is never shared and needs no lock.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hanabot_channels::{ChatEvent, ChatMessage, OutboundRouter, ReplyTarget, Transport};
use hanabot_common::config::Config;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::dispatcher::{Action, Dispatcher};

const EVENT_QUEUE_SIZE: usize = 100;

/// Said after rejoining a channel the bot was kicked from.
pub const KICK_COMPLAINT: &str = "Why I outta....";

/// Reason sent to the server on Ctrl-C.
const INTERRUPT_REASON: &str = "Interrupted";

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub sigil: char,
    /// Set on every channel the bot joins
    pub topic: Option<String>,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    /// Wait before rejoining after a kick
    pub kick_rejoin_delay: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            sigil: '!',
            topic: None,
            initial_backoff_secs: 2,
            max_backoff_secs: 60,
            kick_rejoin_delay: Duration::from_secs(1),
        }
    }
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sigil: config.router.sigil_char(),
            topic: config.irc.topic.clone(),
            initial_backoff_secs: config.irc.initial_backoff_secs,
            max_backoff_secs: config.irc.max_backoff_secs,
            ..Self::default()
        }
    }
}

/// Whether the loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Hanabot {
    transport: Arc<dyn Transport>,
    outbound: OutboundRouter,
    dispatcher: Dispatcher,
    classifier: Classifier,
    settings: BotSettings,
}

impl Hanabot {
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Dispatcher,
        settings: BotSettings,
    ) -> Self {
        let classifier = Classifier::new(settings.sigil, dispatcher.home_channel());
        Self {
            outbound: OutboundRouter::new(Arc::clone(&transport)),
            transport,
            dispatcher,
            classifier,
            settings,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Serve until `die`, Ctrl-C, or the transport stops for good.
    pub async fn run(mut self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE_SIZE);
        let listener = spawn_listener(
            Arc::clone(&self.transport),
            tx,
            self.settings.initial_backoff_secs,
            self.settings.max_backoff_secs,
        );

        info!(
            transport = self.transport.name(),
            nick = %self.transport.nickname(),
            scope = self.dispatcher.scope().as_str(),
            home = %self.dispatcher.home_channel(),
            "hanabot running"
        );

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        info!("event stream closed, stopping");
                        break;
                    };
                    if self.handle_event(event).await == Flow::Stop {
                        break;
                    }
                }
                signal = &mut ctrl_c => {
                    signal.context("failed to listen for Ctrl-C")?;
                    info!("interrupted, shutting down");
                    if let Err(e) = self.transport.shutdown(INTERRUPT_REASON).await {
                        warn!("shutdown failed: {e}");
                    }
                    break;
                }
            }
        }

        listener.abort();
        Ok(())
    }

    /// React to one transport event.
    pub async fn handle_event(&mut self, event: ChatEvent) -> Flow {
        match event {
            ChatEvent::Message(msg) => self.on_message(&msg).await,
            ChatEvent::Joined { channel, nick } => {
                if self.is_me(&nick) {
                    self.on_joined(&channel).await;
                }
                Flow::Continue
            }
            ChatEvent::Kicked { channel, nick, by } => {
                if self.is_me(&nick) {
                    self.on_kicked(&channel, &by).await;
                }
                Flow::Continue
            }
        }
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.transport.nickname())
    }

    async fn on_message(&mut self, msg: &ChatMessage) -> Flow {
        let Some(inv) = self.classifier.classify(msg, &self.transport.nickname()) else {
            return Flow::Continue;
        };

        let outcome = self.dispatcher.handle(&inv, self.transport.as_ref());
        let target = ReplyTarget::new(inv.channel.as_str(), inv.sender.as_str());
        self.outbound
            .deliver(&target, &outcome.response.public, &outcome.response.private)
            .await;

        for action in outcome.actions {
            match action {
                Action::Join(channel) => {
                    if let Err(e) = self.transport.join(&channel).await {
                        error!(channel = %channel, "join failed: {e}");
                    }
                }
                Action::Part(channel) => {
                    if let Err(e) = self.transport.part(&channel).await {
                        error!(channel = %channel, "part failed: {e}");
                    }
                }
                Action::Shutdown { reason } => {
                    info!(by = %inv.sender, reason = %reason, "shutting down");
                    if let Err(e) = self.transport.shutdown(&reason).await {
                        warn!("shutdown failed: {e}");
                    }
                    return Flow::Stop;
                }
            }
        }
        Flow::Continue
    }

    async fn on_joined(&self, channel: &str) {
        info!(channel, "joined channel");
        if let Some(topic) = &self.settings.topic {
            if let Err(e) = self.transport.set_topic(channel, topic).await {
                warn!(channel, "could not set topic: {e}");
            }
        }
    }

    async fn on_kicked(&self, channel: &str, by: &str) {
        warn!(channel, by, "kicked, rejoining");
        tokio::time::sleep(self.settings.kick_rejoin_delay).await;
        if let Err(e) = self.transport.join(channel).await {
            error!(channel, "rejoin failed: {e}");
            return;
        }
        if let Err(e) = self.transport.send_public(channel, KICK_COMPLAINT).await {
            debug!(channel, "complaint not delivered: {e}");
        }
    }
}

/// Start the transport listener, supervised when the transport can reconnect.
pub fn spawn_listener(
    transport: Arc<dyn Transport>,
    tx: mpsc::Sender<ChatEvent>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    if transport.reconnects() {
        return spawn_supervised_listener(transport, tx, initial_backoff_secs, max_backoff_secs);
    }
    tokio::spawn(async move {
        if let Err(e) = transport.listen(tx).await {
            error!("Transport {} error: {e}", transport.name());
        }
    })
}

/// Keep a listener running, restarting it with exponential backoff.
pub fn spawn_supervised_listener(
    transport: Arc<dyn Transport>,
    tx: mpsc::Sender<ChatEvent>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);

        loop {
            let result = transport.listen(tx.clone()).await;

            if tx.is_closed() {
                break;
            }

            match result {
                Ok(()) => {
                    warn!("Transport {} exited unexpectedly; restarting", transport.name());
                }
                Err(e) => {
                    error!("Transport {} error: {e}; restarting", transport.name());
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use hanabot_channels::{MemoryTransport, Sent, TransportError, TransportResult};
    use hanabot_common::SessionScope;
    use hanabot_engine::Markup;

    use crate::error::RenderContext;
    use crate::names::NameAllocator;
    use crate::registry::SessionRegistry;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            SessionRegistry::hanabi(NameAllocator::ordered(), Markup::Ascii),
            SessionScope::Named,
            "#hanabi",
            RenderContext {
                markup: Markup::Ascii,
                sigil: '!',
            },
        )
    }

    fn settings() -> BotSettings {
        BotSettings {
            topic: Some("Hanabi! Say !help".into()),
            kick_rejoin_delay: Duration::from_millis(1),
            ..BotSettings::default()
        }
    }

    fn bot(memory: &Arc<MemoryTransport>) -> Hanabot {
        Hanabot::new(memory.clone(), dispatcher(), settings())
    }

    #[tokio::test]
    async fn commands_are_answered() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = bot(&memory);

        let flow = bot
            .handle_event(ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "!new")))
            .await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            memory.public_lines("#hanabi"),
            vec!["New game \"BUFFY\" started by olive. Accepting joins now."]
        );
    }

    #[tokio::test]
    async fn chatter_gets_no_reply() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = bot(&memory);
        bot.handle_event(ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "hello all")))
            .await;
        assert!(memory.sent().is_empty());
    }

    #[tokio::test]
    async fn private_commands_reply_in_home_channel() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = bot(&memory);
        bot.handle_event(ChatEvent::Message(ChatMessage::private("olive", "new alpha")))
            .await;
        assert_eq!(memory.public_lines("#hanabi").len(), 1);
        assert!(bot.dispatcher().registry().contains("alpha"));
    }

    #[tokio::test]
    async fn die_from_operator_stops() {
        let memory = Arc::new(MemoryTransport::new("hanabot").with_operator("#hanabi", "giles"));
        let mut bot = bot(&memory);

        let flow = bot
            .handle_event(ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "!die")))
            .await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(memory.private_lines("olive").len(), 1);

        let flow = bot
            .handle_event(ChatEvent::Message(ChatMessage::public("giles", "#hanabi", "!die")))
            .await;
        assert_eq!(flow, Flow::Stop);
        assert_eq!(
            memory.sent().last(),
            Some(&Sent::Quit("Seppuku Successful".into()))
        );
    }

    #[tokio::test]
    async fn part_and_join_actions_reach_the_transport() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = Hanabot::new(
            memory.clone(),
            Dispatcher::new(
                SessionRegistry::hanabi(NameAllocator::ordered(), Markup::Ascii),
                SessionScope::Channel,
                "#hanabi",
                RenderContext::default(),
            ),
            settings(),
        );

        bot.handle_event(ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "!new games")))
            .await;
        bot.handle_event(ChatEvent::Message(ChatMessage::public("olive", "#games", "!part")))
            .await;

        let sent = memory.sent();
        assert!(sent.contains(&Sent::Join("#games".into())));
        assert_eq!(sent.last(), Some(&Sent::Part("#games".into())));
        assert_eq!(memory.public_lines("#games"), vec!["Hanabot leaving channel."]);
    }

    #[tokio::test]
    async fn kick_rejoins_and_complains() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = bot(&memory);

        bot.handle_event(ChatEvent::Kicked {
            channel: "#hanabi".into(),
            nick: "maisie".into(),
            by: "giles".into(),
        })
        .await;
        assert!(memory.sent().is_empty());

        bot.handle_event(ChatEvent::Kicked {
            channel: "#hanabi".into(),
            nick: "HanaBot".into(),
            by: "giles".into(),
        })
        .await;
        assert_eq!(
            memory.sent(),
            vec![
                Sent::Join("#hanabi".into()),
                Sent::Public {
                    channel: "#hanabi".into(),
                    line: KICK_COMPLAINT.into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn joining_sets_topic() {
        let memory = Arc::new(MemoryTransport::new("hanabot"));
        let mut bot = bot(&memory);
        bot.handle_event(ChatEvent::Joined {
            channel: "#games".into(),
            nick: "hanabot".into(),
        })
        .await;
        bot.handle_event(ChatEvent::Joined {
            channel: "#games".into(),
            nick: "olive".into(),
        })
        .await;
        assert_eq!(
            memory.sent(),
            vec![Sent::Topic {
                channel: "#games".into(),
                topic: "Hanabi! Say !help".into()
            }]
        );
    }

    #[tokio::test]
    async fn run_drains_script_then_stops() {
        let memory = Arc::new(MemoryTransport::new("hanabot").with_script(vec![
            ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "!new")),
            ChatEvent::Message(ChatMessage::public("olive", "#hanabi", "!join")),
        ]));
        bot(&memory).run().await.unwrap();
        assert_eq!(memory.public_lines("#hanabi").len(), 2);
    }

    struct AlwaysFailTransport {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transport for AlwaysFailTransport {
        fn name(&self) -> &str {
            "always-fail"
        }
        fn nickname(&self) -> String {
            "hanabot".into()
        }
        async fn send_public(&self, _: &str, _: &str) -> TransportResult<()> {
            Ok(())
        }
        async fn send_private(&self, _: &str, _: &str) -> TransportResult<()> {
            Ok(())
        }
        async fn join(&self, _: &str) -> TransportResult<()> {
            Ok(())
        }
        async fn part(&self, _: &str) -> TransportResult<()> {
            Ok(())
        }
        async fn set_topic(&self, _: &str, _: &str) -> TransportResult<()> {
            Ok(())
        }
        fn is_operator(&self, _: &str, _: &str) -> bool {
            false
        }
        async fn listen(&self, _tx: mpsc::Sender<ChatEvent>) -> TransportResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connection("listen boom".into()))
        }
        async fn shutdown(&self, _: &str) -> TransportResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn supervised_listener_restarts_on_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport: Arc<dyn Transport> = Arc::new(AlwaysFailTransport {
            calls: Arc::clone(&calls),
        });
        assert!(transport.reconnects());

        let (tx, rx) = mpsc::channel::<ChatEvent>(1);
        let handle = spawn_listener(transport, tx, 1, 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        drop(rx);
        handle.abort();
        let _ = handle.await;

        assert!(calls.load(Ordering::SeqCst) >= 1);
    }
}
