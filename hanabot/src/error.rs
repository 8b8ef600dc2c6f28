//! Router error taxonomy and its rendering to chat lines.
//!
//! Every failure a command can hit is one [`RouterError`] variant. Handlers
//! return them with `?`; [`RouterError::render`] is the single place that
//! turns one into the lines a player sees.

use hanabot_engine::{EngineError, Markup, Response};

use crate::commands;

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// What a lookup failed to find.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Missing {
    #[error("no games are running")]
    Games,

    #[error("game {0} not found")]
    Game(String),

    #[error("{0} is not in any game")]
    Player(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("no command given")]
    NoCommand,

    #[error("unknown command: {line}")]
    UnknownCommand { line: String },

    #[error("{verb} takes {expected} argument(s), got {got}")]
    Arity {
        verb: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("argument {token:?} to {verb} is not a {expected}")]
    Type {
        verb: &'static str,
        token: String,
        expected: &'static str,
    },

    #[error("game {0} already exists")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(Missing),

    #[error("{count} games are running, a game id is required")]
    Ambiguous { count: usize },

    #[error("no active game in {channel}")]
    NoActiveGame { channel: String },

    #[error("{player} is already in game {game}")]
    AlreadyInGame { player: String, game: String },

    #[error("engine failure in {verb} during {operation}: {source}")]
    Engine {
        verb: &'static str,
        operation: &'static str,
        source: EngineError,
    },
}

/// Display settings used when rendering errors.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub markup: Markup,
    pub sigil: char,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            markup: Markup::Irc,
            sigil: '!',
        }
    }
}

impl RouterError {
    /// Short machine-readable name, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCommand => "no_command",
            Self::UnknownCommand { .. } => "unknown_command",
            Self::Arity { .. } => "arity",
            Self::Type { .. } => "type",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Ambiguous { .. } => "ambiguous",
            Self::NoActiveGame { .. } => "no_active_game",
            Self::AlreadyInGame { .. } => "already_in_game",
            Self::Engine { .. } => "engine_failure",
        }
    }

    /// Engine failures leave shared game state in doubt; everything else is
    /// a mistake by the sender.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Engine { .. })
    }

    /// The lines this error shows in chat.
    ///
    /// Engine failures and a missing channel game go to the channel; the rest
    /// go to the sender only.
    pub fn render(&self, ctx: &RenderContext) -> Response {
        let bold = |s: &str| ctx.markup.bold(s);
        let sigil = ctx.sigil;

        match self {
            Self::NoCommand => Response::private("Giving a command would be more useful."),
            Self::UnknownCommand { line } => Response::private(format!(
                "My dearest brother Willis, I do not understand this \"{line}\" of which you speak."
            )),
            Self::Arity { verb, .. } => {
                let mut out = Response::private(format!("Wrong number of arguments to {verb}."));
                if let Some(usage) = commands::usage(verb, sigil) {
                    out.push_private(usage);
                }
                out
            }
            Self::Type {
                verb,
                token,
                expected,
            } => {
                let mut out = Response::private(format!(
                    "Wrong type for argument {token} in command {verb}, expected a {expected}."
                ));
                if let Some(usage) = commands::usage(verb, sigil) {
                    out.push_private(usage);
                }
                out
            }
            Self::Conflict(name) => {
                Response::private(format!("The game {} already exists.", bold(name)))
            }
            Self::NotFound(Missing::Games) => Response::private(format!(
                "No games available. Start one with {sigil}new [gameID]"
            )),
            Self::NotFound(Missing::Game(name)) => {
                Response::private(format!("GameID {} not found.", bold(name)))
            }
            Self::NotFound(Missing::Player(_)) => Response::private("You are not in any game."),
            Self::Ambiguous { .. } => {
                Response::private("More than one active game, specify which with the gameID")
            }
            Self::NoActiveGame { channel } => Response::public(format!(
                "There is no active game in {channel}! Start one with {sigil}new."
            )),
            Self::AlreadyInGame { game, .. } => Response::private(format!(
                "You are already in game {}. One game per nick please.",
                bold(game)
            )),
            Self::Engine {
                verb,
                operation,
                source,
            } => {
                let mut out = Response::public(
                    "Does not compute. Unknown error happened. All bets are off about game(s) \
                     state. Guru contemplation haiku:",
                );
                out.push_public(format!("Error in command {verb}, engine call {operation}."));
                out.push_public(format!("Error text: {source}"));
                out
            }
        }
    }
}

/// Wrap an engine result so a failure names the command and call it came from.
pub fn engine_call<T>(
    verb: &'static str,
    operation: &'static str,
    result: hanabot_engine::EngineResult<T>,
) -> Result<T> {
    result.map_err(|source| RouterError::Engine {
        verb,
        operation,
        source,
    })
}
