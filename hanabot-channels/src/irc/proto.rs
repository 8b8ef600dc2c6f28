//! IRC line codec.
//!
//! `[:prefix] COMMAND param param ... [:trailing]`, one message per line.

use std::fmt;

/// One parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    /// Middle params followed by the trailing param, if any.
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a line with or without its CRLF. `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();
        if rest.is_empty() {
            return None;
        }

        // IRCv3 message tags, not used
        if rest.starts_with('@') {
            let (_, after) = rest.split_once(' ')?;
            rest = after.trim_start();
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, after) = stripped.split_once(' ')?;
            rest = after.trim_start();
            Some(prefix.to_string())
        } else {
            None
        };

        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };
        let mut words = head.split_whitespace();
        let command = words.next()?.to_ascii_uppercase();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split_once('!').map_or(prefix, |(nick, _)| nick))
    }

    pub fn param(&self, i: usize) -> Option<&str> {
        self.params.get(i).map(String::as_str)
    }
}

/// Outgoing commands the bot sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcCommand<'a> {
    Nick(&'a str),
    User { user: &'a str, realname: &'a str },
    Pong(&'a str),
    Join(&'a str),
    Part(&'a str),
    Privmsg { target: &'a str, text: &'a str },
    Notice { target: &'a str, text: &'a str },
    Topic { channel: &'a str, topic: &'a str },
    Quit(&'a str),
}

impl fmt::Display for IrcCommand<'_> {
    /// Wire form without the CRLF. Free text is flattened to one line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nick(nick) => write!(f, "NICK {nick}"),
            Self::User { user, realname } => {
                write!(f, "USER {user} 0 * :{}", sanitize(realname))
            }
            Self::Pong(token) => write!(f, "PONG :{token}"),
            Self::Join(channel) => write!(f, "JOIN {channel}"),
            Self::Part(channel) => write!(f, "PART {channel}"),
            Self::Privmsg { target, text } => write!(f, "PRIVMSG {target} :{}", sanitize(text)),
            Self::Notice { target, text } => write!(f, "NOTICE {target} :{}", sanitize(text)),
            Self::Topic { channel, topic } => write!(f, "TOPIC {channel} :{}", sanitize(topic)),
            Self::Quit(reason) => write!(f, "QUIT :{}", sanitize(reason)),
        }
    }
}

/// Replace CR and LF so a line cannot smuggle a second command.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

/// Channel names start with `#` or `&`.
pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// Strip the status prefix from a NAMES entry. True if it marks an operator.
pub fn split_names_prefix(entry: &str) -> (&str, bool) {
    let nick = entry.trim_start_matches(['~', '&', '@', '%', '+']);
    let prefix = &entry[..entry.len() - nick.len()];
    (nick, prefix.contains(['~', '&', '@']))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_privmsg() {
        let msg = IrcMessage::parse(":olive!o@example.org PRIVMSG #hanabi :!play A\r\n").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.nick(), Some("olive"));
        assert_eq!(msg.params, vec!["#hanabi", "!play A"]);
    }

    #[test]
    fn parses_without_prefix() {
        let msg = IrcMessage::parse("PING :irc.libera.chat").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.param(0), Some("irc.libera.chat"));
    }

    #[test]
    fn parses_numeric_with_middle_params() {
        let msg = IrcMessage::parse(":server 353 hanabot = #hanabi :@olive +maisie fred").unwrap();
        assert_eq!(msg.command, "353");
        assert_eq!(msg.params, vec!["hanabot", "=", "#hanabi", "@olive +maisie fred"]);
    }

    #[test]
    fn parses_mode_and_tags() {
        let msg = IrcMessage::parse("@time=2024-01-01 :op!u@h MODE #hanabi +o olive").unwrap();
        assert_eq!(msg.nick(), Some("op"));
        assert_eq!(msg.params, vec!["#hanabi", "+o", "olive"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(IrcMessage::parse("\r\n").is_none());
        assert!(IrcMessage::parse("   ").is_none());
    }

    #[test]
    fn trailing_keeps_colons_and_spaces() {
        let msg = IrcMessage::parse(":a!b@c PRIVMSG hanabot :hanabot: new  game").unwrap();
        assert_eq!(msg.param(1), Some("hanabot: new  game"));
    }

    #[test]
    fn formats_commands() {
        assert_eq!(
            IrcCommand::Notice {
                target: "#hanabi",
                text: "two\r\nlines"
            }
            .to_string(),
            "NOTICE #hanabi :two  lines"
        );
        assert_eq!(
            IrcCommand::User {
                user: "hanabot",
                realname: "Mumford J. Hanabot"
            }
            .to_string(),
            "USER hanabot 0 * :Mumford J. Hanabot"
        );
        assert_eq!(IrcCommand::Pong("abc").to_string(), "PONG :abc");
    }

    #[test]
    fn names_prefixes() {
        assert_eq!(split_names_prefix("@olive"), ("olive", true));
        assert_eq!(split_names_prefix("+maisie"), ("maisie", false));
        assert_eq!(split_names_prefix("@+fred"), ("fred", true));
        assert_eq!(split_names_prefix("giles"), ("giles", false));
    }
}
