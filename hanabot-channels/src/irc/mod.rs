//! IRC transport over plain TCP.
//!
//! One connection per `listen` call. The listener registers, answers PINGs,
//! joins the home channel once the server welcomes us, and keeps a roster so
//! operator checks never need a round trip. Replies go out as NOTICEs.

pub mod proto;
pub mod roster;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use hanabot_common::config::IrcConfig;
use hanabot_common::util::sanitize_for_log;

use crate::message::{ChatEvent, ChatMessage};
use crate::traits::{Transport, TransportError, TransportResult};
use proto::{is_channel, split_names_prefix, IrcCommand, IrcMessage};
use roster::Roster;

pub use proto::sanitize;

pub struct IrcTransport {
    server: String,
    port: u16,
    realname: String,
    nick_password: Option<String>,
    home_channel: String,
    /// Nick we asked for, before any collision suffixes.
    wanted_nick: String,
    nickname: RwLock<String>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    roster: Roster,
    registered: AtomicBool,
}

impl IrcTransport {
    pub fn new(config: &IrcConfig) -> Self {
        Self {
            server: config.server.clone(),
            port: config.port,
            realname: config.realname.clone(),
            nick_password: config.nick_password.clone(),
            home_channel: config.home_channel(),
            wanted_nick: config.nickname.clone(),
            nickname: RwLock::new(config.nickname.clone()),
            writer: Mutex::new(None),
            roster: Roster::new(),
            registered: AtomicBool::new(false),
        }
    }

    pub fn home_channel(&self) -> &str {
        &self.home_channel
    }

    fn set_nickname(&self, nick: &str) {
        let mut current = self.nickname.write().unwrap_or_else(PoisonError::into_inner);
        *current = nick.to_string();
    }

    fn is_me(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nickname())
    }

    async fn send_command(&self, command: IrcCommand<'_>) -> TransportResult<()> {
        let line = command.to_string();
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(TransportError::NotReady)?;
        tracing::trace!(line = %sanitize_for_log(&line), "irc >>");
        stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    /// Like `send_command`, for traffic the server only accepts after 001.
    async fn send_chat(&self, command: IrcCommand<'_>) -> TransportResult<()> {
        if !self.registered.load(Ordering::SeqCst) {
            return Err(TransportError::NotReady);
        }
        self.send_command(command).await
    }

    /// React to one server line. Events for the bot go to `tx`.
    async fn handle_line(
        &self,
        msg: IrcMessage,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> TransportResult<()> {
        let from = msg.nick().unwrap_or_default().to_string();
        match msg.command.as_str() {
            "PING" => {
                self.send_command(IrcCommand::Pong(msg.param(0).unwrap_or_default()))
                    .await?;
            }
            // RPL_WELCOME
            "001" => {
                if let Some(me) = msg.param(0) {
                    self.set_nickname(me);
                }
                self.registered.store(true, Ordering::SeqCst);
                tracing::info!(
                    server = %self.server,
                    nick = %self.nickname(),
                    "IRC registration complete"
                );
                if let Some(password) = &self.nick_password {
                    let identify = format!("IDENTIFY {} {password}", self.wanted_nick);
                    self.send_command(IrcCommand::Privmsg {
                        target: "NickServ",
                        text: &identify,
                    })
                    .await?;
                }
                self.send_command(IrcCommand::Join(&self.home_channel)).await?;
            }
            // ERR_NICKNAMEINUSE
            "433" => {
                let taken = msg.param(1).map_or_else(|| self.nickname(), str::to_string);
                let next = format!("{taken}_");
                tracing::warn!(taken = %taken, next = %next, "nickname in use");
                self.set_nickname(&next);
                self.send_command(IrcCommand::Nick(&next)).await?;
            }
            // RPL_NAMREPLY: me = #channel :names
            "353" => {
                if let (Some(channel), Some(names)) = (msg.param(2), msg.param(3)) {
                    for entry in names.split_whitespace() {
                        let (nick, op) = split_names_prefix(entry);
                        self.roster.names(channel, nick, op);
                    }
                }
            }
            "JOIN" => {
                let Some(channel) = msg.param(0) else {
                    return Ok(());
                };
                if self.is_me(&from) {
                    self.roster.forget(channel);
                    tracing::info!(channel = %channel, "joined channel");
                }
                self.roster.join(channel, &from);
                self.emit(
                    tx,
                    ChatEvent::Joined {
                        channel: channel.to_string(),
                        nick: from,
                    },
                )
                .await;
            }
            "PART" => {
                if let Some(channel) = msg.param(0) {
                    if self.is_me(&from) {
                        self.roster.forget(channel);
                    } else {
                        self.roster.part(channel, &from);
                    }
                }
            }
            "KICK" => {
                let (Some(channel), Some(victim)) = (msg.param(0), msg.param(1)) else {
                    return Ok(());
                };
                if self.is_me(victim) {
                    tracing::warn!(channel = %channel, by = %from, "kicked from channel");
                    self.roster.forget(channel);
                } else {
                    self.roster.part(channel, victim);
                }
                self.emit(
                    tx,
                    ChatEvent::Kicked {
                        channel: channel.to_string(),
                        nick: victim.to_string(),
                        by: from,
                    },
                )
                .await;
            }
            "QUIT" => self.roster.quit(&from),
            "NICK" => {
                if let Some(new) = msg.param(0) {
                    if self.is_me(&from) {
                        self.set_nickname(new);
                    }
                    self.roster.rename(&from, new);
                }
            }
            "MODE" => {
                if let (Some(channel), Some(modes)) = (msg.param(0), msg.param(1)) {
                    if is_channel(channel) {
                        self.roster.apply_mode(channel, modes, &msg.params[2..]);
                    }
                }
            }
            "PRIVMSG" => {
                let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
                    return Ok(());
                };
                // CTCP
                if text.starts_with('\x01') {
                    return Ok(());
                }
                let message = if is_channel(target) {
                    ChatMessage::public(from, target, text)
                } else {
                    ChatMessage::private(from, text)
                };
                self.emit(tx, ChatEvent::Message(message)).await;
            }
            "ERROR" => {
                return Err(TransportError::Connection(
                    msg.param(0).unwrap_or("server closed the link").to_string(),
                ));
            }
            "464" | "465" => {
                return Err(TransportError::Auth(
                    msg.params.last().cloned().unwrap_or_default(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    async fn emit(&self, tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) {
        if tx.send(event).await.is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

#[async_trait]
impl Transport for IrcTransport {
    fn name(&self) -> &str {
        "irc"
    }

    fn nickname(&self) -> String {
        self.nickname
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn send_public(&self, channel: &str, line: &str) -> TransportResult<()> {
        self.send_chat(IrcCommand::Notice {
            target: channel,
            text: line,
        })
        .await
    }

    async fn send_private(&self, nick: &str, line: &str) -> TransportResult<()> {
        self.send_chat(IrcCommand::Notice {
            target: nick,
            text: line,
        })
        .await
    }

    async fn join(&self, channel: &str) -> TransportResult<()> {
        self.send_chat(IrcCommand::Join(channel)).await
    }

    async fn part(&self, channel: &str) -> TransportResult<()> {
        self.send_chat(IrcCommand::Part(channel)).await
    }

    async fn set_topic(&self, channel: &str, topic: &str) -> TransportResult<()> {
        self.send_chat(IrcCommand::Topic { channel, topic }).await
    }

    fn is_operator(&self, channel: &str, nick: &str) -> bool {
        self.roster.is_operator(channel, nick)
    }

    async fn listen(&self, tx: mpsc::Sender<ChatEvent>) -> TransportResult<()> {
        let addr = format!("{}:{}", self.server, self.port);
        tracing::info!(addr = %addr, "connecting to IRC server");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransportError::Connection(format!("{addr}: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(write_half);
        self.registered.store(false, Ordering::SeqCst);
        self.set_nickname(&self.wanted_nick);

        self.send_command(IrcCommand::Nick(&self.wanted_nick)).await?;
        self.send_command(IrcCommand::User {
            user: &self.wanted_nick,
            realname: &self.realname,
        })
        .await?;

        let mut lines = BufReader::new(read_half).lines();
        let result = loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    break Err(TransportError::Connection(
                        "server closed the connection".into(),
                    ))
                }
                Err(e) => break Err(TransportError::Io(e)),
            };
            tracing::trace!(line = %line, "irc <<");
            let Some(msg) = IrcMessage::parse(&line) else {
                continue;
            };
            if let Err(e) = self.handle_line(msg, &tx).await {
                break Err(e);
            }
            if tx.is_closed() {
                break Ok(());
            }
        };

        self.registered.store(false, Ordering::SeqCst);
        *self.writer.lock().await = None;
        result
    }

    async fn shutdown(&self, reason: &str) -> TransportResult<()> {
        tracing::info!(reason = %reason, "leaving IRC");
        let quit = self.send_command(IrcCommand::Quit(reason)).await;
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.registered.store(false, Ordering::SeqCst);
        quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn config(port: u16) -> IrcConfig {
        IrcConfig {
            server: "127.0.0.1".into(),
            port,
            nickname: "hanabot".into(),
            nick_password: Some("sekrit".into()),
            channel: "hanabi".into(),
            ..IrcConfig::default()
        }
    }

    #[test]
    fn home_channel_gets_prefix() {
        let irc = IrcTransport::new(&config(6667));
        assert_eq!(irc.home_channel(), "#hanabi");
        assert_eq!(irc.nickname(), "hanabot");
        assert_eq!(irc.name(), "irc");
    }

    #[tokio::test]
    async fn send_before_connect_is_not_ready() {
        let irc = IrcTransport::new(&config(6667));
        let err = irc.send_public("#hanabi", "hello").await.unwrap_err();
        assert!(matches!(err, TransportError::NotReady));
    }

    #[tokio::test]
    async fn chat_waits_for_welcome() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let irc = std::sync::Arc::new(IrcTransport::new(&config(port)));

        let (tx, _rx) = mpsc::channel(8);
        let client = {
            let irc = irc.clone();
            tokio::spawn(async move { irc.listen(tx).await })
        };

        let (sock, _) = server.accept().await.unwrap();
        let (read_half, mut write_half) = sock.into_split();
        let mut lines = BufReader::new(read_half).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NICK hanabot");

        let err = irc.join("#games").await.unwrap_err();
        assert!(matches!(err, TransportError::NotReady));

        write_half.write_all(b":srv 001 hanabot :Welcome\r\n").await.unwrap();
        while let Some(line) = lines.next_line().await.unwrap() {
            if line == "JOIN #hanabi" {
                break;
            }
        }
        irc.join("#games").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "JOIN #games");

        drop(lines);
        drop(write_half);
        let _ = client.await;
    }

    #[tokio::test]
    async fn handle_line_tracks_ops_and_messages() {
        let irc = IrcTransport::new(&config(6667));
        let (tx, mut rx) = mpsc::channel(8);

        let names = IrcMessage::parse(":srv 353 hanabot = #hanabi :@olive maisie").unwrap();
        irc.handle_line(names, &tx).await.unwrap();
        assert!(irc.is_operator("#hanabi", "olive"));
        assert!(!irc.is_operator("#hanabi", "maisie"));

        let mode = IrcMessage::parse(":olive!o@h MODE #hanabi +o maisie").unwrap();
        irc.handle_line(mode, &tx).await.unwrap();
        assert!(irc.is_operator("#hanabi", "maisie"));

        let privmsg = IrcMessage::parse(":maisie!m@h PRIVMSG #hanabi :!new").unwrap();
        irc.handle_line(privmsg, &tx).await.unwrap();
        match rx.recv().await.unwrap() {
            ChatEvent::Message(m) => {
                assert_eq!(m.sender, "maisie");
                assert_eq!(m.channel.as_deref(), Some("#hanabi"));
                assert_eq!(m.text, "!new");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let private = IrcMessage::parse(":maisie!m@h PRIVMSG hanabot :games").unwrap();
        irc.handle_line(private, &tx).await.unwrap();
        match rx.recv().await.unwrap() {
            ChatEvent::Message(m) => assert!(m.is_private()),
            other => panic!("unexpected event {other:?}"),
        }

        let kick = IrcMessage::parse(":olive!o@h KICK #hanabi hanabot :bye").unwrap();
        irc.handle_line(kick, &tx).await.unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ChatEvent::Kicked {
                channel: "#hanabi".into(),
                nick: "hanabot".into(),
                by: "olive".into()
            }
        );
        assert!(!irc.is_operator("#hanabi", "olive"));
    }

    #[tokio::test]
    async fn ctcp_is_ignored() {
        let irc = IrcTransport::new(&config(6667));
        let (tx, mut rx) = mpsc::channel(8);
        let ctcp = IrcMessage::parse(":m!m@h PRIVMSG hanabot :\x01VERSION\x01").unwrap();
        irc.handle_line(ctcp, &tx).await.unwrap();
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn registers_identifies_and_joins() {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let irc = std::sync::Arc::new(IrcTransport::new(&config(port)));

        let (tx, mut rx) = mpsc::channel(8);
        let client = {
            let irc = irc.clone();
            tokio::spawn(async move { irc.listen(tx).await })
        };

        let (mut sock, _) = server.accept().await.unwrap();
        sock.write_all(b":srv 433 * hanabot :Nickname is already in use\r\n")
            .await
            .unwrap();
        sock.write_all(b":srv 001 hanabot_ :Welcome\r\nPING :token\r\n")
            .await
            .unwrap();
        sock.write_all(b":hanabot_!h@h JOIN #hanabi\r\n").await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            ChatEvent::Joined {
                channel: "#hanabi".into(),
                nick: "hanabot_".into()
            }
        );
        assert_eq!(irc.nickname(), "hanabot_");
        irc.send_public("#hanabi", "hello").await.unwrap();
        irc.shutdown("bye").await.unwrap();

        let mut received = String::new();
        sock.read_to_string(&mut received).await.unwrap();
        let lines: Vec<&str> = received.lines().collect();
        assert_eq!(lines[0], "NICK hanabot");
        assert_eq!(lines[1], "USER hanabot 0 * :Mumford J. Hanabot");
        assert_eq!(lines[2], "NICK hanabot_");
        assert_eq!(lines[3], "PRIVMSG NickServ :IDENTIFY hanabot sekrit");
        assert_eq!(lines[4], "JOIN #hanabi");
        assert_eq!(lines[5], "PONG :token");
        assert_eq!(lines[6], "NOTICE #hanabi :hello");
        assert_eq!(lines[7], "QUIT :bye");

        drop(sock);
        let _ = client.await;
    }
}
