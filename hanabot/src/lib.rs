//! hanabot - Hanabi games over IRC.
//!
//! This crate provides:
//! - Argument coercion for command lines
//! - Game name allocation
//! - The registry of running games
//! - The command table and dispatcher
//! - The bot loop that ties a transport to the dispatcher
//!
//! ```text
//! transport → ChatEvent → Classifier → Dispatcher → handler → GameEngine
//!                                          ↓
//! transport ← OutboundRouter ←──── Outcome (public/private lines, actions)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod classify;
pub mod commands;
pub mod dispatcher;
pub mod error;
mod handlers;
pub mod names;
pub mod registry;
pub mod service;
pub mod validator;

pub use classify::{Classifier, Invocation};
pub use dispatcher::{Action, Dispatcher, Outcome};
pub use error::{RenderContext, RouterError};
pub use names::NameAllocator;
pub use registry::SessionRegistry;
pub use service::{BotSettings, Flow, Hanabot};
