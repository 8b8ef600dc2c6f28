//! Picking commands out of chat.
//!
//! A channel line is a command when it starts with the sigil or with
//! `botnick:`. Everything else is conversation and is ignored. Private
//! messages are always commands; the sigil is optional there.

use hanabot_channels::ChatMessage;

/// One command line with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub sender: String,
    /// Channel public replies go to. The home channel for private messages.
    pub channel: String,
    /// Command text with the addressing stripped
    pub line: String,
    pub private: bool,
}

impl Invocation {
    /// A command said in `channel`.
    pub fn public(
        sender: impl Into<String>,
        channel: impl Into<String>,
        line: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            channel: channel.into(),
            line: line.into(),
            private: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    sigil: char,
    home_channel: String,
}

impl Classifier {
    pub fn new(sigil: char, home_channel: impl Into<String>) -> Self {
        Self {
            sigil,
            home_channel: home_channel.into(),
        }
    }

    pub fn classify(&self, msg: &ChatMessage, bot_nick: &str) -> Option<Invocation> {
        let (line, channel) = match &msg.channel {
            Some(channel) => (
                strip_address(&msg.text, bot_nick, self.sigil)?,
                channel.clone(),
            ),
            None => (
                strip_address(&msg.text, bot_nick, self.sigil).unwrap_or(msg.text.as_str()),
                self.home_channel.clone(),
            ),
        };

        Some(Invocation {
            sender: msg.sender.clone(),
            channel,
            line: line.trim().to_string(),
            private: msg.channel.is_none(),
        })
    }
}

/// The text after `nick:` or the sigil, if the line starts with either.
fn strip_address<'a>(text: &'a str, bot_nick: &str, sigil: char) -> Option<&'a str> {
    let text = text.trim_start();
    if let Some((head, rest)) = text.split_once(':') {
        if head.trim().eq_ignore_ascii_case(bot_nick) {
            return Some(rest);
        }
    }
    text.strip_prefix(sigil)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new('!', "#hanabi")
    }

    #[test]
    fn sigil_lines_are_commands() {
        let msg = ChatMessage::public("olive", "#games", "!play C");
        let inv = classifier().classify(&msg, "hanabot").unwrap();
        assert_eq!(inv, Invocation::public("olive", "#games", "play C"));
    }

    #[test]
    fn nick_prefix_is_case_insensitive() {
        let msg = ChatMessage::public("olive", "#games", "HanaBot: hint maisie 3");
        let inv = classifier().classify(&msg, "hanabot").unwrap();
        assert_eq!(inv.line, "hint maisie 3");
    }

    #[test]
    fn chatter_is_ignored() {
        let c = classifier();
        assert!(c
            .classify(&ChatMessage::public("olive", "#games", "nice play!"), "hanabot")
            .is_none());
        assert!(c
            .classify(&ChatMessage::public("olive", "#games", "maisie: your turn"), "hanabot")
            .is_none());
    }

    #[test]
    fn bare_sigil_is_an_empty_command() {
        let inv = classifier()
            .classify(&ChatMessage::public("olive", "#games", "!"), "hanabot")
            .unwrap();
        assert_eq!(inv.line, "");
    }

    #[test]
    fn private_messages_reply_in_home_channel() {
        let c = classifier();
        let inv = c.classify(&ChatMessage::private("olive", "status"), "hanabot").unwrap();
        assert!(inv.private);
        assert_eq!(inv.channel, "#hanabi");
        assert_eq!(inv.line, "status");

        let inv = c.classify(&ChatMessage::private("olive", "!games"), "hanabot").unwrap();
        assert_eq!(inv.line, "games");
    }

    #[test]
    fn other_sigils() {
        let c = Classifier::new('.', "#hanabi");
        assert!(c
            .classify(&ChatMessage::public("olive", "#hanabi", "!new"), "hanabot")
            .is_none());
        assert_eq!(
            c.classify(&ChatMessage::public("olive", "#hanabi", ".new"), "hanabot")
                .unwrap()
                .line,
            "new"
        );
    }
}
