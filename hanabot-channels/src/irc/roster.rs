//! Who is in which channel, and who holds ops there.
//!
//! Built from NAMES replies and kept current from JOIN, PART, KICK, QUIT,
//! NICK and MODE. Channel and nick keys are compared case-insensitively.

use std::collections::HashMap;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct Roster {
    /// channel -> nick -> is operator
    channels: DashMap<String, HashMap<String, bool>>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one NAMES entry, prefix already stripped.
    pub fn names(&self, channel: &str, nick: &str, operator: bool) {
        self.channels
            .entry(key(channel))
            .or_default()
            .insert(key(nick), operator);
    }

    pub fn join(&self, channel: &str, nick: &str) {
        self.names(channel, nick, false);
    }

    pub fn part(&self, channel: &str, nick: &str) {
        if let Some(mut members) = self.channels.get_mut(&key(channel)) {
            members.remove(&key(nick));
        }
    }

    /// Drop a whole channel, used when the bot itself leaves it.
    pub fn forget(&self, channel: &str) {
        self.channels.remove(&key(channel));
    }

    pub fn quit(&self, nick: &str) {
        let nick = key(nick);
        for mut members in self.channels.iter_mut() {
            members.remove(&nick);
        }
    }

    pub fn rename(&self, old: &str, new: &str) {
        let (old, new) = (key(old), key(new));
        for mut members in self.channels.iter_mut() {
            if let Some(op) = members.remove(&old) {
                members.insert(new.clone(), op);
            }
        }
    }

    pub fn set_operator(&self, channel: &str, nick: &str, operator: bool) {
        if let Some(mut members) = self.channels.get_mut(&key(channel)) {
            if let Some(op) = members.get_mut(&key(nick)) {
                *op = operator;
            }
        }
    }

    /// Apply a channel MODE change such as `+o-v olive maisie`.
    pub fn apply_mode(&self, channel: &str, modes: &str, args: &[String]) {
        let mut args = args.iter();
        let mut adding = true;
        for c in modes.chars() {
            match c {
                '+' => adding = true,
                '-' => adding = false,
                // modes that take a nick argument
                'o' | 'v' | 'h' | 'q' | 'a' => {
                    if let Some(nick) = args.next() {
                        if c == 'o' {
                            self.set_operator(channel, nick, adding);
                        }
                    }
                }
                // argument-taking list and key modes
                'b' | 'e' | 'I' | 'k' => {
                    args.next();
                }
                'l' if adding => {
                    args.next();
                }
                _ => {}
            }
        }
    }

    pub fn is_operator(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(&key(channel))
            .and_then(|members| members.get(&key(nick)).copied())
            .unwrap_or(false)
    }

    pub fn contains(&self, channel: &str, nick: &str) -> bool {
        self.channels
            .get(&key(channel))
            .is_some_and(|members| members.contains_key(&key(nick)))
    }

    /// Channels the roster knows about.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
