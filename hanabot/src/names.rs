//! Names for games created without one.
//!
//! The pool is shuffled and handed out one name at a time. Once every name
//! has been used the pool is reshuffled and the next pass carries a `_1`
//! suffix, then `_2`, and so on, so an allocator never repeats itself.

use std::collections::{HashSet, VecDeque};

use hanabot_common::util::has_pass_suffix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;

/// The default pool.
pub const GAME_NAMES: &[&str] = &[
    "buffy",
    "xander",
    "willow",
    "tara",
    "anyanka",
    "spike",
    "giles",
    "angel",
    "mal",
    "wash",
    "simon",
    "kaylee",
    "zoe",
    "river",
    "book",
    "inara",
    "jayne",
    "cordelia",
    "oz",
    "anya",
    "dawn",
    "the_master",
    "drusilla",
    "darla",
    "the_mayor",
    "adam",
    "glory",
    "joyce",
    "jenny",
    "wesley",
    "harmony",
    "kendra",
    "olive",
    "maisie",
];

enum Order {
    Shuffled(StdRng),
    /// Pool order, every pass. Used in tests.
    Fixed,
}

pub struct NameAllocator {
    pool: Vec<String>,
    pass: VecDeque<String>,
    epoch: usize,
    order: Order,
    /// Counter for an empty pool
    fallback: usize,
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::with_order(Order::Shuffled(StdRng::from_entropy()))
    }

    /// Same sequence every time for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_order(Order::Shuffled(StdRng::seed_from_u64(seed)))
    }

    /// No shuffling: names come out in pool order.
    pub fn ordered() -> Self {
        Self::with_order(Order::Fixed)
    }

    fn with_order(order: Order) -> Self {
        let mut names = Self {
            pool: GAME_NAMES.iter().map(|s| (*s).to_string()).collect(),
            pass: VecDeque::new(),
            epoch: 0,
            order,
            fallback: 0,
        };
        names.refill();
        names
    }

    /// Replace the pool. Duplicates are dropped and the epoch restarts at 0.
    ///
    /// Names ending in `_<number>` are dropped too: a later pass could
    /// produce them again.
    pub fn with_pool<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        self.pool = names
            .into_iter()
            .map(Into::into)
            .filter(|n| {
                if has_pass_suffix(n) {
                    warn!(name = %n, "ignoring pool name with a pass suffix");
                    return false;
                }
                seen.insert(n.clone())
            })
            .collect();
        self.epoch = 0;
        self.refill();
        self
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Completed passes over the pool.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// The next name. Never repeats for the life of this allocator.
    pub fn next_name(&mut self) -> String {
        if self.pool.is_empty() {
            self.fallback += 1;
            return format!("game_{}", self.fallback);
        }
        if self.pass.is_empty() {
            self.epoch += 1;
            self.refill();
        }

        let base = self.pass.pop_front().unwrap_or_default();
        if self.epoch == 0 {
            base
        } else {
            format!("{base}_{}", self.epoch)
        }
    }

    fn refill(&mut self) {
        let mut names = self.pool.clone();
        if let Order::Shuffled(rng) = &mut self.order {
            names.shuffle(rng);
        }
        self.pass = names.into();
    }
}

impl Iterator for NameAllocator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_name())
    }
}
