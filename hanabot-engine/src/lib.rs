//! hanabot engine - the Hanabi rules and the text markup used to show them.
//!
//! The router only ever talks to a game through [`GameEngine`];
//! [`HanabiGame`] is the implementation it ships with.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod card;
pub mod game;
pub mod hand;
pub mod markup;
pub mod traits;

pub use card::{Card, CardLabel, Color, Hint};
pub use game::HanabiGame;
pub use markup::Markup;
pub use traits::{EngineError, EngineResult, GameEngine, Response};
