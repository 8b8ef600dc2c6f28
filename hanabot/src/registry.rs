//! The set of running games.
//!
//! The registry owns every session. Callers borrow a session for the length
//! of one command and never hold on to it. Games are removed either by an
//! explicit `delete` or by [`SessionRegistry::terminate_if_over`] after a
//! command that may have finished them.

use std::collections::BTreeMap;

use hanabot_engine::{GameEngine, HanabiGame, Markup};
use tracing::{debug, info};

use crate::error::{Missing, Result, RouterError};
use crate::names::NameAllocator;

/// Builds the engine for a new game from its name.
pub type EngineFactory = Box<dyn Fn(&str) -> Box<dyn GameEngine> + Send + Sync>;

/// One running game.
pub struct Session {
    name: String,
    /// Channel the game was created from
    channel: String,
    engine: Box<dyn GameEngine>,
}

impl Session {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn engine(&self) -> &dyn GameEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn GameEngine {
        self.engine.as_mut()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("channel", &self.channel)
            .field("started", &self.engine.has_started())
            .field("players", &self.engine.players())
            .finish()
    }
}

pub struct SessionRegistry {
    sessions: BTreeMap<String, Session>,
    names: NameAllocator,
    factory: EngineFactory,
}

impl SessionRegistry {
    pub fn new(names: NameAllocator, factory: EngineFactory) -> Self {
        Self {
            sessions: BTreeMap::new(),
            names,
            factory,
        }
    }

    /// A registry whose games are [`HanabiGame`]s rendered with `markup`.
    pub fn hanabi(names: NameAllocator, markup: Markup) -> Self {
        Self::new(
            names,
            Box::new(move |name: &str| -> Box<dyn GameEngine> {
                Box::new(HanabiGame::new(name, markup))
            }),
        )
    }

    /// Create a game, named `name` or with the next free allocated name.
    pub fn create(&mut self, name: Option<&str>, channel: &str) -> Result<String> {
        let name = match name {
            Some(n) if self.sessions.contains_key(n) => {
                return Err(RouterError::Conflict(n.to_string()));
            }
            Some(n) => n.to_string(),
            // a user may already have taken the next allocated name
            None => loop {
                let candidate = self.names.next_name();
                if !self.sessions.contains_key(&candidate) {
                    break candidate;
                }
                debug!(name = %candidate, "allocated name already taken, drawing again");
            },
        };

        let session = Session {
            engine: (self.factory)(&name),
            name: name.clone(),
            channel: channel.to_string(),
        };
        self.sessions.insert(name.clone(), session);
        info!(game = %name, channel = %channel, games = self.sessions.len(), "game created");
        Ok(name)
    }

    /// Find the game a command means.
    ///
    /// With a name, that game. Without one, the only game if there is
    /// exactly one, otherwise `Ambiguous` (or `NotFound` when there are none).
    pub fn resolve(&self, name: Option<&str>, requester: &str) -> Result<&Session> {
        let key = self.resolve_key(name, requester)?;
        self.sessions
            .get(&key)
            .ok_or(RouterError::NotFound(Missing::Game(key)))
    }

    pub fn resolve_mut(&mut self, name: Option<&str>, requester: &str) -> Result<&mut Session> {
        let key = self.resolve_key(name, requester)?;
        match self.sessions.get_mut(&key) {
            Some(session) => Ok(session),
            None => Err(RouterError::NotFound(Missing::Game(key))),
        }
    }

    fn resolve_key(&self, name: Option<&str>, requester: &str) -> Result<String> {
        if self.sessions.is_empty() {
            debug!(requester, "resolve with no games running");
            return Err(RouterError::NotFound(Missing::Games));
        }

        match name {
            Some(n) if self.sessions.contains_key(n) => {
                debug!(requester, game = n, "resolved game by name");
                Ok(n.to_string())
            }
            Some(n) => Err(RouterError::NotFound(Missing::Game(n.to_string()))),
            None if self.sessions.len() == 1 => {
                let only = self.sessions.keys().next().cloned().unwrap_or_default();
                debug!(requester, game = %only, "resolved the only game");
                Ok(only)
            }
            None => Err(RouterError::Ambiguous {
                count: self.sessions.len(),
            }),
        }
    }

    /// The game `player` has joined, if any.
    pub fn find_by_player(&self, player: &str) -> Option<&Session> {
        self.sessions.values().find(|s| s.engine.in_game(player))
    }

    /// Remove a game. Fails if it does not exist.
    pub fn terminate(&mut self, name: &str) -> Result<Session> {
        let session = self
            .sessions
            .remove(name)
            .ok_or_else(|| RouterError::NotFound(Missing::Game(name.to_string())))?;
        info!(game = %name, games = self.sessions.len(), "game removed");
        Ok(session)
    }

    /// Remove `name` if its game has ended. Returns whether it was removed.
    pub fn terminate_if_over(&mut self, name: &str) -> bool {
        let over = self
            .sessions
            .get(name)
            .is_some_and(|s| s.engine.game_over());
        if over {
            self.sessions.remove(name);
            info!(game = %name, games = self.sessions.len(), "finished game removed");
        }
        over
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Session> {
        self.sessions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Session> {
        self.sessions.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::hanabi(NameAllocator::ordered(), Markup::Ascii)
    }

    #[test]
    fn create_then_resolve_by_name() {
        let mut reg = registry();
        assert_eq!(reg.create(Some("alpha"), "#hanabi").unwrap(), "alpha");
        let s = reg.resolve(Some("alpha"), "anyone").unwrap();
        assert_eq!(s.name(), "alpha");
        assert_eq!(s.channel(), "#hanabi");
        assert_eq!(
            reg.create(Some("alpha"), "#hanabi").unwrap_err(),
            RouterError::Conflict("alpha".into())
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn allocated_names_come_from_the_pool() {
        let mut reg = registry();
        assert_eq!(reg.create(None, "#hanabi").unwrap(), "buffy");
        assert_eq!(reg.create(None, "#hanabi").unwrap(), "xander");
    }

    #[test]
    fn allocation_skips_names_already_taken() {
        let mut reg = registry();
        reg.create(Some("buffy"), "#hanabi").unwrap();
        assert_eq!(reg.create(None, "#hanabi").unwrap(), "xander");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn resolve_without_name() {
        let mut reg = registry();
        assert_eq!(
            reg.resolve(None, "willow").unwrap_err(),
            RouterError::NotFound(Missing::Games)
        );

        reg.create(Some("buffy"), "#hanabi").unwrap();
        assert_eq!(reg.resolve(None, "willow").unwrap().name(), "buffy");

        reg.create(Some("xander"), "#hanabi").unwrap();
        assert_eq!(
            reg.resolve(None, "willow").unwrap_err(),
            RouterError::Ambiguous { count: 2 }
        );
        assert_eq!(reg.resolve(Some("xander"), "willow").unwrap().name(), "xander");

        reg.terminate("buffy").unwrap();
        assert_eq!(reg.resolve(None, "willow").unwrap().name(), "xander");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let mut reg = registry();
        reg.create(Some("buffy"), "#hanabi").unwrap();
        assert_eq!(
            reg.resolve_mut(Some("spike"), "willow").unwrap_err(),
            RouterError::NotFound(Missing::Game("spike".into()))
        );
    }

    #[test]
    fn terminate_requires_existing_game() {
        let mut reg = registry();
        assert!(matches!(
            reg.terminate("buffy"),
            Err(RouterError::NotFound(Missing::Game(_)))
        ));
    }

    #[test]
    fn find_by_player_scans_rosters() {
        let mut reg = registry();
        reg.create(Some("buffy"), "#hanabi").unwrap();
        reg.create(Some("xander"), "#other").unwrap();
        reg.get_mut("xander")
            .unwrap()
            .engine_mut()
            .add_player("willow")
            .unwrap();

        assert_eq!(reg.find_by_player("willow").unwrap().name(), "xander");
        assert!(reg.find_by_player("tara").is_none());
    }

    #[test]
    fn finished_games_are_removed() {
        let mut reg = registry();
        reg.create(Some("buffy"), "#hanabi").unwrap();
        {
            let engine = reg.get_mut("buffy").unwrap().engine_mut();
            engine.add_player("olive").unwrap();
            engine.add_player("maisie").unwrap();
            engine.start_game("olive").unwrap();
        }
        assert!(!reg.terminate_if_over("buffy"));
        assert!(reg.contains("buffy"));

        reg.get_mut("buffy")
            .unwrap()
            .engine_mut()
            .remove_player("maisie")
            .unwrap();
        assert!(reg.terminate_if_over("buffy"));
        assert!(reg.resolve(Some("buffy"), "olive").is_err());
        assert!(!reg.terminate_if_over("buffy"));
    }

    #[test]
    fn names_may_be_reused_after_termination() {
        let mut reg = registry();
        reg.create(Some("alpha"), "#hanabi").unwrap();
        reg.terminate("alpha").unwrap();
        assert_eq!(reg.create(Some("alpha"), "#hanabi").unwrap(), "alpha");
        assert!(!reg.get("alpha").unwrap().engine().has_started());
    }
}
