//! Argument arity and type checking.
//!
//! [`coerce`] is pure: it either turns every raw token into a typed [`Arg`]
//! or fails without touching anything, so it runs before any session lookup
//! or engine call.

use hanabot_engine::{CardLabel, Hint};

use crate::error::{Result, RouterError};

/// What a command expects in one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Any token, e.g. a nick
    Word,
    /// A 1-based position in a hand
    Index,
    /// A card letter, A to E
    Card,
    /// A colour or a number
    Hint,
}

impl ArgKind {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Index => "position number",
            Self::Card => "card letter (A-E)",
            Self::Hint => "color or number",
        }
    }

    fn coerce(self, token: &str) -> Option<Arg> {
        match self {
            Self::Word => Some(Arg::Word(token.to_string())),
            Self::Index => token.parse().ok().map(Arg::Index),
            Self::Card => token.parse().ok().map(Arg::Card),
            Self::Hint => token.parse().ok().map(Arg::Hint),
        }
    }
}

/// One coerced argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Word(String),
    Index(usize),
    Card(CardLabel),
    Hint(Hint),
}

impl Arg {
    fn kind(&self) -> ArgKind {
        match self {
            Self::Word(_) => ArgKind::Word,
            Self::Index(_) => ArgKind::Index,
            Self::Card(_) => ArgKind::Card,
            Self::Hint(_) => ArgKind::Hint,
        }
    }
}

/// The typed arguments of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    verb: &'static str,
    values: Vec<Arg>,
}

impl Args {
    /// No arguments.
    pub fn none(verb: &'static str) -> Self {
        Self {
            verb,
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Arg] {
        &self.values
    }

    pub fn word(&self, i: usize) -> Result<&str> {
        match self.get(i)? {
            Arg::Word(w) => Ok(w),
            other => Err(self.mismatch(other, ArgKind::Word)),
        }
    }

    pub fn index(&self, i: usize) -> Result<usize> {
        match self.get(i)? {
            Arg::Index(n) => Ok(*n),
            other => Err(self.mismatch(other, ArgKind::Index)),
        }
    }

    pub fn card(&self, i: usize) -> Result<CardLabel> {
        match self.get(i)? {
            Arg::Card(c) => Ok(*c),
            other => Err(self.mismatch(other, ArgKind::Card)),
        }
    }

    pub fn hint(&self, i: usize) -> Result<Hint> {
        match self.get(i)? {
            Arg::Hint(h) => Ok(*h),
            other => Err(self.mismatch(other, ArgKind::Hint)),
        }
    }

    fn get(&self, i: usize) -> Result<&Arg> {
        self.values.get(i).ok_or(RouterError::Arity {
            verb: self.verb,
            expected: i + 1,
            got: self.values.len(),
        })
    }

    fn mismatch(&self, got: &Arg, want: ArgKind) -> RouterError {
        RouterError::Type {
            verb: self.verb,
            token: format!("{:?}", got.kind()).to_lowercase(),
            expected: want.describe(),
        }
    }
}

/// Check `tokens` against `kinds` and convert them.
///
/// Fails with `Arity` when the counts differ and with `Type` naming the
/// first token that does not convert.
pub fn coerce(verb: &'static str, tokens: &[&str], kinds: &[ArgKind]) -> Result<Args> {
    if tokens.len() != kinds.len() {
        return Err(RouterError::Arity {
            verb,
            expected: kinds.len(),
            got: tokens.len(),
        });
    }

    let values = tokens
        .iter()
        .zip(kinds)
        .map(|(token, kind)| {
            kind.coerce(token).ok_or_else(|| RouterError::Type {
                verb,
                token: (*token).to_string(),
                expected: kind.describe(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Args { verb, values })
}
