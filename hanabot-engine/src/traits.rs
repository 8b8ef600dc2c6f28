//! The contract between the command router and a rules engine.

use crate::card::{CardLabel, Hint};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
///
/// Rule violations (not your turn, unknown card, ...) are not errors: they
/// come back as private response lines. An `EngineError` means the engine's
/// own state is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("game {game} is started but has no turn order")]
    NoTurnOrder { game: String },

    #[error("player {player} is in the turn order of {game} but has no hand")]
    MissingPlayer { game: String, player: String },

    #[error("internal engine error: {0}")]
    Internal(String),
}

/// Lines produced by one engine call.
///
/// `public` goes to the channel, `private` to the player who made the call.
/// Order inside each list is the order the lines must be delivered in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub public: Vec<String>,
    pub private: Vec<String>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response with a single public line.
    pub fn public(line: impl Into<String>) -> Self {
        Self {
            public: vec![line.into()],
            private: Vec::new(),
        }
    }

    /// A response with a single private line.
    pub fn private(line: impl Into<String>) -> Self {
        Self {
            public: Vec::new(),
            private: vec![line.into()],
        }
    }

    pub fn push_public(&mut self, line: impl Into<String>) {
        self.public.push(line.into());
    }

    pub fn push_private(&mut self, line: impl Into<String>) {
        self.private.push(line.into());
    }

    /// Append another response, keeping both orders.
    pub fn extend(&mut self, other: Response) {
        self.public.extend(other.public);
        self.private.extend(other.private);
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.private.is_empty()
    }
}

/// A running game as seen by the router.
///
/// Every player-facing operation returns the lines to show. The predicates at
/// the bottom are the only state the router inspects directly.
pub trait GameEngine: Send + Sync {
    /// Game name, used in the lines the engine produces.
    fn name(&self) -> &str;

    fn add_player(&mut self, player: &str) -> EngineResult<Response>;
    fn remove_player(&mut self, player: &str) -> EngineResult<Response>;
    fn start_game(&mut self, player: &str) -> EngineResult<Response>;

    fn play_card(&mut self, player: &str, card: CardLabel) -> EngineResult<Response>;
    fn discard_card(&mut self, player: &str, card: CardLabel) -> EngineResult<Response>;
    fn hint_player(&mut self, player: &str, target: &str, hint: Hint) -> EngineResult<Response>;

    /// Move `card` to 1-based position `index`, sliding the others right.
    fn move_card(&mut self, player: &str, card: CardLabel, index: usize) -> EngineResult<Response>;
    fn swap_cards(&mut self, player: &str, a: CardLabel, b: CardLabel) -> EngineResult<Response>;
    fn sort_cards(&mut self, player: &str) -> EngineResult<Response>;

    fn get_hands(&self, player: &str) -> EngineResult<Response>;
    fn get_table(&self) -> EngineResult<Response>;
    fn get_discard_pile(&self) -> EngineResult<Response>;
    fn turn(&self) -> EngineResult<Response>;
    fn turns(&self) -> EngineResult<Response>;
    fn get_status(&self, player: &str) -> EngineResult<Response>;

    /// Everything, including every hand and the deck. Operators only.
    fn show_game_state(&self) -> EngineResult<Response>;

    fn has_started(&self) -> bool;
    fn game_over(&self) -> bool;
    /// Player ids in join order.
    fn players(&self) -> Vec<String>;
    fn in_game(&self, player: &str) -> bool;
}
