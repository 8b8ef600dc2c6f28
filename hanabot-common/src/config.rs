//! Configuration management for hanabot.
//!
//! The bot reads a single JSON file, by default `~/.hanabot/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Command line flags (applied by the binary)
//! 2. Environment variables (HANABOT_* prefix)
//! 3. Explicit config file values
//! 4. Default values
//!
//! # Environment Variable Mapping
//!
//! - `HANABOT_SERVER` → irc.server
//! - `HANABOT_PORT` → irc.port
//! - `HANABOT_CHANNEL` → irc.channel
//! - `HANABOT_NICK` → irc.nickname
//! - `HANABOT_NICK_PASSWORD` → irc.nick_password
//! - `HANABOT_SCOPE` → router.scope
//! - `HANABOT_LOG_LEVEL` → observability.log_level

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::util::has_pass_suffix;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".hanabot"),
        |dirs| dirs.home_dir().join(".hanabot"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(raw).map_or_else(|_| raw.to_string(), |p| p.into_owned()))
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// IRC connection settings
    #[serde(default)]
    pub irc: IrcConfig,

    /// Command routing settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Logging settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================================================
// IRC
// ============================================================================

/// IRC connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrcConfig {
    /// IRC server host
    #[serde(default = "default_server")]
    pub server: String,

    /// IRC server port (plain text)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Nickname the bot registers with
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Real name shown in WHOIS
    #[serde(default = "default_realname")]
    pub realname: String,

    /// NickServ password, sent as IDENTIFY after the welcome reply
    #[serde(default)]
    pub nick_password: Option<String>,

    /// Home channel. The bot joins it on connect and never parts it.
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Topic set on every channel the bot joins
    #[serde(default)]
    pub topic: Option<String>,

    /// First reconnect delay after the connection drops
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    /// Upper bound for the reconnect delay
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            nickname: default_nickname(),
            realname: default_realname(),
            nick_password: None,
            channel: default_channel(),
            topic: None,
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

impl IrcConfig {
    /// Home channel, forced to start with `#`.
    pub fn home_channel(&self) -> String {
        normalize_channel(&self.channel)
    }
}

/// Force a channel name to start with a channel prefix.
pub fn normalize_channel(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('#') || name.starts_with('&') {
        name.to_string()
    } else {
        format!("#{name}")
    }
}

/// Registry key for a channel. IRC channel names are case-insensitive.
pub fn channel_key(name: &str) -> String {
    normalize_channel(name).to_ascii_lowercase()
}

// ============================================================================
// Router
// ============================================================================

/// How game sessions are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// Sessions are keyed by a game name unique across the whole process.
    #[default]
    Named,
    /// One session per channel, keyed by the channel name.
    Channel,
}

impl SessionScope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Named => "named",
            Self::Channel => "channel",
        }
    }
}

impl std::str::FromStr for SessionScope {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "named" => Ok(Self::Named),
            "channel" => Ok(Self::Channel),
            other => Err(Error::invalid(
                "router.scope",
                format!("unknown scope '{other}', expected 'named' or 'channel'"),
            )),
        }
    }
}

/// Command routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Session keying policy
    #[serde(default)]
    pub scope: SessionScope,

    /// Single character that marks a channel line as a command
    #[serde(default = "default_sigil")]
    pub sigil: String,

    /// Text markup flavour: irc, xterm or ascii
    #[serde(default = "default_markup")]
    pub markup: String,

    /// Replacement pool for anonymous game names (empty = built-in pool)
    #[serde(default)]
    pub game_names: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            scope: SessionScope::default(),
            sigil: default_sigil(),
            markup: default_markup(),
            game_names: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// The sigil as a char. Falls back to `!` for an invalid value;
    /// `Config::validate` rejects those before they get here.
    pub fn sigil_char(&self) -> char {
        let mut chars = self.sigil.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() => c,
            _ => '!',
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to force to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load from an optional explicit path, then apply environment overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(server) = std::env::var("HANABOT_SERVER") {
            self.irc.server = server;
        }
        if let Ok(port) = std::env::var("HANABOT_PORT") {
            if let Ok(p) = port.parse() {
                self.irc.port = p;
            }
        }
        if let Ok(channel) = std::env::var("HANABOT_CHANNEL") {
            self.irc.channel = channel;
        }
        if let Ok(nick) = std::env::var("HANABOT_NICK") {
            self.irc.nickname = nick;
        }
        if let Ok(password) = std::env::var("HANABOT_NICK_PASSWORD") {
            self.irc.nick_password = Some(password);
        }
        if let Ok(scope) = std::env::var("HANABOT_SCOPE") {
            match scope.parse() {
                Ok(s) => self.router.scope = s,
                Err(e) => tracing::warn!("Ignoring HANABOT_SCOPE: {e}"),
            }
        }
        if let Ok(level) = std::env::var("HANABOT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }

    /// Validate the entire configuration.
    pub fn validate(&self) -> crate::Result<()> {
        let mut errors = Vec::new();

        if self.irc.server.trim().is_empty() {
            errors.push(Error::invalid("irc.server", "must not be empty"));
        }
        if self.irc.port == 0 {
            errors.push(Error::invalid("irc.port", "must be between 1 and 65535"));
        }
        if self.irc.nickname.is_empty() || self.irc.nickname.chars().any(char::is_whitespace) {
            errors.push(Error::invalid(
                "irc.nickname",
                "must be non-empty and contain no whitespace",
            ));
        }
        if self.irc.channel.trim().trim_start_matches(['#', '&']).is_empty() {
            errors.push(Error::invalid("irc.channel", "must not be empty"));
        }

        let mut sigil = self.router.sigil.chars();
        match (sigil.next(), sigil.next()) {
            (Some(c), None) if !c.is_whitespace() => {}
            _ => errors.push(Error::invalid(
                "router.sigil",
                "must be exactly one non-whitespace character",
            )),
        }
        if !MARKUPS.contains(&self.router.markup.as_str()) {
            errors.push(Error::invalid(
                "router.markup",
                format!("expected one of {}", MARKUPS.join(", ")),
            ));
        }
        if self
            .router
            .game_names
            .iter()
            .any(|n| n.is_empty() || n.chars().any(char::is_whitespace))
        {
            errors.push(Error::invalid(
                "router.game_names",
                "names must be non-empty and contain no whitespace",
            ));
        }
        if let Some(name) = self.router.game_names.iter().find(|n| has_pass_suffix(n)) {
            errors.push(Error::invalid(
                "router.game_names",
                format!("'{name}' ends in _<number>, which is reserved for repeated names"),
            ));
        }

        if !LOG_FORMATS.contains(&self.observability.log_format.as_str()) {
            errors.push(Error::invalid(
                "observability.log_format",
                format!("expected one of {}", LOG_FORMATS.join(", ")),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(Error::Multiple(errors))
        }
    }
}

/// Accepted values for `router.markup`.
pub const MARKUPS: &[&str] = &["irc", "xterm", "ascii"];

/// Accepted values for `observability.log_format`.
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];

fn default_server() -> String {
    "irc.libera.chat".into()
}
fn default_port() -> u16 {
    6667
}
fn default_nickname() -> String {
    "hanabot".into()
}
fn default_realname() -> String {
    "Mumford J. Hanabot".into()
}
fn default_channel() -> String {
    "#hanabi".into()
}
fn default_initial_backoff_secs() -> u64 {
    2
}
fn default_max_backoff_secs() -> u64 {
    60
}
fn default_sigil() -> String {
    "!".into()
}
fn default_markup() -> String {
    "irc".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.irc.port, 6667);
        assert_eq!(config.irc.home_channel(), "#hanabi");
        assert_eq!(config.router.scope, SessionScope::Named);
        assert_eq!(config.router.sigil_char(), '!');
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.irc.nickname, "hanabot");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "irc": {{ "server": "irc.example.org", "channel": "games", "topic": "Hanabi!" }},
                "router": {{ "scope": "channel", "markup": "ascii" }},
                "observability": {{ "level": "debug" }}
            }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.irc.server, "irc.example.org");
        assert_eq!(config.irc.home_channel(), "#games");
        assert_eq!(config.irc.topic.as_deref(), Some("Hanabi!"));
        assert_eq!(config.router.scope, SessionScope::Channel);
        assert_eq!(config.router.markup, "ascii");
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_bad_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut config = Config::default();
        config.irc.port = 0;
        config.irc.nickname = "two words".into();
        config.router.sigil = "!!".into();
        config.router.markup = "html".into();

        match config.validate() {
            Err(Error::Multiple(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn validate_single_error() {
        let mut config = Config::default();
        config.observability.log_format = "xml".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidValue { ref field, .. } if field == "observability.log_format"
        ));
    }

    #[test]
    fn validate_rejects_bad_game_names() {
        let mut config = Config::default();
        config.router.game_names = vec!["fine".into(), "not fine".into()];
        assert!(config.validate().is_err());

        config.router.game_names = vec!["a".into(), "a_1".into()];
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("a_1"));

        config.router.game_names = vec!["the_master".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scope_parses_case_insensitively() {
        assert_eq!("Channel".parse::<SessionScope>().unwrap(), SessionScope::Channel);
        assert_eq!(" named ".parse::<SessionScope>().unwrap(), SessionScope::Named);
        assert!("global".parse::<SessionScope>().is_err());
    }

    #[test]
    fn normalize_channel_adds_prefix() {
        assert_eq!(normalize_channel("hanabi"), "#hanabi");
        assert_eq!(normalize_channel("#hanabi"), "#hanabi");
        assert_eq!(normalize_channel("&local"), "&local");
    }

    #[test]
    fn channel_key_folds_case() {
        assert_eq!(channel_key("#Hanabi"), "#hanabi");
        assert_eq!(channel_key("HANABI"), "#hanabi");
        assert_eq!(channel_key(" #hanabi "), channel_key("#HaNaBi"));
    }

    #[test]
    fn expand_path_leaves_plain_paths_alone() {
        assert_eq!(expand_path("/tmp/hanabot.json"), PathBuf::from("/tmp/hanabot.json"));
    }
}
