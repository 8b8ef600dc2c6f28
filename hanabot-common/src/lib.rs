//! hanabot common - shared configuration, errors and logging.
//!
//! This crate provides:
//! - Configuration types, loading and validation
//! - The process-level error type
//! - Logging setup
//! - String helpers used when composing chat lines

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;

pub use config::{Config, IrcConfig, ObservabilityConfig, RouterConfig, SessionScope};
pub use error::{Error, Result};

