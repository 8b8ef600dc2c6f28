//! hanabot channels - chat transports for the Hanabi bot.
//!
//! This crate provides:
//! - The [`Transport`] trait every chat backend implements
//! - IRC over plain TCP
//! - A console transport for local play
//! - An in-memory transport for tests (`testing` feature)
//! - [`OutboundRouter`], which puts reply lines on the wire
//!
//! ```text
//! IRC server → IrcTransport::listen → mpsc → bot loop
//!                                               ↓
//! IRC server ←── send ←── OutboundRouter ←── reply
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod console;
pub mod irc;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod message;
pub mod outbound;
pub mod traits;

pub use console::{ConsoleTransport, CONSOLE_CHANNEL};
pub use irc::IrcTransport;
#[cfg(any(test, feature = "testing"))]
pub use memory::{MemoryTransport, Sent};
pub use message::{ChatEvent, ChatMessage};
pub use outbound::{DeliveryReport, OutboundRouter, ReplyTarget, SendResult};
pub use traits::{OperatorCheck, Transport, TransportError, TransportResult};
