//! Turning one command line into one reply.
//!
//! ```text
//! line → tokenize → admin gate → recognise → game gate → validate → handler
//!                                                                      ↓
//!                               reply ← render error ← terminate_if_over
//! ```
//!
//! [`Dispatcher::dispatch`] returns a typed result; [`Dispatcher::handle`]
//! is the boundary that renders any error into chat lines so one bad command
//! never takes the bot down.

use hanabot_channels::OperatorCheck;
use hanabot_common::config::{channel_key, Config};
use hanabot_common::util::truncate_with_ellipsis;
use hanabot_common::{Error, SessionScope};
use hanabot_engine::{Markup, Response};
use tracing::{debug, error, info};

use crate::classify::Invocation;
use crate::commands::{self, CommandSpec, Trailing};
use crate::error::{RenderContext, Result, RouterError};
use crate::names::NameAllocator;
use crate::registry::SessionRegistry;
use crate::validator::{self, Args};

/// Longest command line echoed back in an unknown-command reply.
const MAX_ECHO_CHARS: usize = 60;

/// Something the bot must do besides talking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Join(String),
    Part(String),
    Shutdown { reason: String },
}

/// Result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub response: Response,
    pub actions: Vec<Action>,
    /// Game the command acted on
    pub session: Option<String>,
}

impl Outcome {
    pub fn reply(response: Response) -> Self {
        Self {
            response,
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn touching(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }
}

/// A validated command on its way to a handler.
pub struct Call<'a> {
    pub inv: &'a Invocation,
    pub spec: &'static CommandSpec,
    pub args: Args,
    /// The optional trailing token, see [`Trailing`]
    pub target: Option<&'a str>,
}

impl Call<'_> {
    pub fn sender(&self) -> &str {
        &self.inv.sender
    }

    pub fn verb(&self) -> &'static str {
        self.spec.verb
    }
}

pub struct Dispatcher {
    pub(crate) registry: SessionRegistry,
    pub(crate) scope: SessionScope,
    pub(crate) home_channel: String,
    pub(crate) ctx: RenderContext,
}

impl Dispatcher {
    pub fn new(
        registry: SessionRegistry,
        scope: SessionScope,
        home_channel: impl Into<String>,
        ctx: RenderContext,
    ) -> Self {
        Self {
            registry,
            scope,
            home_channel: home_channel.into(),
            ctx,
        }
    }

    /// Build from the `router` and `irc` sections of a validated config.
    pub fn from_config(config: &Config) -> hanabot_common::Result<Self> {
        let markup: Markup = config
            .router
            .markup
            .parse()
            .map_err(|e: String| Error::invalid("router.markup", e))?;

        let mut names = NameAllocator::new();
        if !config.router.game_names.is_empty() {
            names = names.with_pool(config.router.game_names.iter().cloned());
        }

        Ok(Self::new(
            SessionRegistry::hanabi(names, markup),
            config.router.scope,
            config.irc.home_channel(),
            RenderContext {
                markup,
                sigil: config.router.sigil_char(),
            },
        ))
    }

    pub fn with_home_channel(mut self, channel: impl Into<String>) -> Self {
        self.home_channel = channel.into();
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn scope(&self) -> SessionScope {
        self.scope
    }

    pub fn home_channel(&self) -> &str {
        &self.home_channel
    }

    pub fn render_context(&self) -> RenderContext {
        self.ctx
    }

    pub(crate) fn bold(&self, text: &str) -> String {
        self.ctx.markup.bold(text)
    }

    /// Run one command, rendering any failure into the reply.
    pub fn handle<O: OperatorCheck + ?Sized>(&mut self, inv: &Invocation, ops: &O) -> Outcome {
        match self.dispatch(inv, ops) {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_engine_failure() {
                    error!(
                        sender = %inv.sender,
                        channel = %inv.channel,
                        line = %inv.line,
                        "engine failure, game state may be inconsistent: {err}"
                    );
                } else {
                    debug!(sender = %inv.sender, kind = err.kind(), "command refused: {err}");
                }
                Outcome::reply(err.render(&self.ctx))
            }
        }
    }

    /// Run one command.
    pub fn dispatch<O: OperatorCheck + ?Sized>(
        &mut self,
        inv: &Invocation,
        ops: &O,
    ) -> Result<Outcome> {
        let tokens: Vec<&str> = inv.line.split_whitespace().collect();
        let Some((&verb, rest)) = tokens.split_first() else {
            return Err(RouterError::NoCommand);
        };
        debug!(sender = %inv.sender, channel = %inv.channel, verb, args = rest.len(), "command");

        // Non-operators fall through and get the ordinary unknown-command reply.
        if let Some(spec) = commands::admin(verb) {
            if ops.is_channel_operator(&inv.channel, &inv.sender) {
                info!(sender = %inv.sender, channel = %inv.channel, verb, "admin command");
                let call = Call {
                    inv,
                    spec,
                    args: Args::none(spec.verb),
                    target: None,
                };
                return (spec.handler)(self, &call);
            }
            debug!(sender = %inv.sender, verb, "admin command from non-operator");
        }

        let spec = commands::find(verb).ok_or_else(|| RouterError::UnknownCommand {
            line: truncate_with_ellipsis(&tokens.join(" "), MAX_ECHO_CHARS),
        })?;

        if self.scope == SessionScope::Channel
            && spec.needs_session
            && !self.registry.contains(&channel_key(&inv.channel))
        {
            return Err(RouterError::NoActiveGame {
                channel: inv.channel.clone(),
            });
        }

        let (fixed, target) = self.split_trailing(spec, rest);
        let args = validator::coerce(spec.verb, fixed, spec.args)?;
        let call = Call {
            inv,
            spec,
            args,
            target,
        };

        let outcome = (spec.handler)(self, &call)?;

        if spec.mutating {
            if let Some(name) = &outcome.session {
                self.registry.terminate_if_over(name);
            }
        }
        Ok(outcome)
    }

    /// Peel the optional trailing token off when it is present.
    fn split_trailing<'s, 'a>(
        &self,
        spec: &CommandSpec,
        rest: &'s [&'a str],
    ) -> (&'s [&'a str], Option<&'a str>) {
        let optional = match spec.trailing {
            Trailing::None => false,
            Trailing::GameId => self.scope == SessionScope::Named,
            Trailing::NewTarget | Trailing::Topic => true,
        };
        let n = spec.args.len();
        if optional && rest.len() == n + 1 {
            (&rest[..n], Some(rest[n]))
        } else {
            (rest, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Missing;
    use hanabot_channels::MemoryTransport;
    use hanabot_engine::{Card, Color, EngineError, EngineResult, GameEngine, HanabiGame};

    fn players() -> MemoryTransport {
        MemoryTransport::new("hanabot")
    }

    fn operators() -> MemoryTransport {
        MemoryTransport::new("hanabot").with_operator("#hanabi", "olive")
    }

    fn ctx() -> RenderContext {
        RenderContext {
            markup: Markup::Ascii,
            sigil: '!',
        }
    }

    fn dispatcher(scope: SessionScope) -> Dispatcher {
        Dispatcher::new(
            SessionRegistry::hanabi(NameAllocator::ordered(), Markup::Ascii),
            scope,
            "#hanabi",
            ctx(),
        )
    }

    fn run(d: &mut Dispatcher, sender: &str, line: &str) -> Result<Outcome> {
        d.dispatch(&Invocation::public(sender, "#hanabi", line), &players())
    }

    #[test]
    fn empty_line_is_no_command() {
        let mut d = dispatcher(SessionScope::Named);
        assert_eq!(run(&mut d, "olive", "   ").unwrap_err(), RouterError::NoCommand);
    }

    #[test]
    fn unknown_verb_does_not_touch_registry() {
        let mut d = dispatcher(SessionScope::Named);
        let err = run(&mut d, "olive", "dance wildly").unwrap_err();
        assert_eq!(
            err,
            RouterError::UnknownCommand {
                line: "dance wildly".into()
            }
        );
        assert!(d.registry().is_empty());
    }

    #[test]
    fn verbs_are_case_sensitive() {
        let mut d = dispatcher(SessionScope::Named);
        assert_eq!(run(&mut d, "olive", "NEW").unwrap_err().kind(), "unknown_command");
    }

    #[test]
    fn admin_verbs_fall_through_for_players() {
        let mut d = dispatcher(SessionScope::Named);
        assert_eq!(run(&mut d, "olive", "die").unwrap_err().kind(), "unknown_command");

        let out = d
            .dispatch(&Invocation::public("olive", "#hanabi", "die"), &operators())
            .unwrap();
        assert_eq!(
            out.actions,
            vec![Action::Shutdown {
                reason: "Seppuku Successful".into()
            }]
        );
    }

    #[test]
    fn trailing_game_id_in_named_scope() {
        let mut d = dispatcher(SessionScope::Named);
        run(&mut d, "olive", "new buffy").unwrap();
        run(&mut d, "olive", "new xander").unwrap();

        assert_eq!(
            run(&mut d, "olive", "join").unwrap_err(),
            RouterError::Ambiguous { count: 2 }
        );
        let out = run(&mut d, "olive", "join xander").unwrap();
        assert_eq!(out.session.as_deref(), Some("xander"));
        assert_eq!(out.response.public[0], "olive has joined game XANDER.");
    }

    #[test]
    fn extra_tokens_are_arity_errors() {
        let mut d = dispatcher(SessionScope::Named);
        run(&mut d, "olive", "new buffy").unwrap();
        assert_eq!(
            run(&mut d, "olive", "play A buffy extra").unwrap_err(),
            RouterError::Arity {
                verb: "play",
                expected: 1,
                got: 3
            }
        );
        assert_eq!(run(&mut d, "olive", "rules now").unwrap_err().kind(), "arity");
    }

    #[test]
    fn validation_runs_before_resolution() {
        let mut d = dispatcher(SessionScope::Named);
        assert_eq!(run(&mut d, "olive", "play Q").unwrap_err().kind(), "type");
        assert_eq!(
            run(&mut d, "olive", "play A").unwrap_err(),
            RouterError::NotFound(Missing::Games)
        );
    }

    #[test]
    fn channel_scope_requires_a_game() {
        let mut d = dispatcher(SessionScope::Channel);
        assert_eq!(
            run(&mut d, "olive", "join").unwrap_err(),
            RouterError::NoActiveGame {
                channel: "#hanabi".into()
            }
        );
        // the gate comes before argument checks
        assert_eq!(run(&mut d, "olive", "play").unwrap_err().kind(), "no_active_game");

        run(&mut d, "olive", "new").unwrap();
        assert!(d.registry().contains("#hanabi"));
        run(&mut d, "olive", "join").unwrap();
        // no game ids in channel scope
        assert_eq!(run(&mut d, "olive", "turn #hanabi").unwrap_err().kind(), "arity");
    }

    #[test]
    fn finished_games_are_removed_after_mutation() {
        let mut d = dispatcher(SessionScope::Named);
        run(&mut d, "olive", "new buffy").unwrap();
        run(&mut d, "olive", "join").unwrap();
        run(&mut d, "maisie", "join").unwrap();
        run(&mut d, "olive", "start").unwrap();
        let out = run(&mut d, "maisie", "leave").unwrap();
        assert!(out
            .response
            .public
            .iter()
            .any(|l| l.contains("fewer than two people")));
        assert!(!d.registry().contains("buffy"));
    }

    /// Games dealt from an 11-card deck: two hands of five and one card to draw.
    fn short_deck_dispatcher() -> Dispatcher {
        let registry = SessionRegistry::new(
            NameAllocator::ordered(),
            Box::new(|name: &str| -> Box<dyn GameEngine> {
                let deck = vec![Card::new(Color::Red, 1); 11];
                Box::new(HanabiGame::with_seed(name, Markup::Ascii, 3).with_deck(deck))
            }),
        );
        Dispatcher::new(registry, SessionScope::Named, "#hanabi", ctx())
    }

    /// Start a two-player game of buffy; returns (first, second) in turn order.
    fn start_pair(d: &mut Dispatcher) -> (&'static str, &'static str) {
        run(d, "olive", "new").unwrap();
        run(d, "olive", "join").unwrap();
        run(d, "maisie", "join").unwrap();
        let out = run(d, "olive", "start").unwrap();
        let olive_first = out
            .response
            .public
            .iter()
            .any(|l| l.starts_with("It is now olive's turn"));
        if olive_first {
            ("olive", "maisie")
        } else {
            ("maisie", "olive")
        }
    }

    #[test]
    fn play_that_empties_the_deck_removes_the_game() {
        let mut d = short_deck_dispatcher();
        let (first, _) = start_pair(&mut d);

        let out = run(&mut d, first, "play A").unwrap();
        assert_eq!(out.session.as_deref(), Some("buffy"));
        assert!(out.response.public.iter().any(|l| l.starts_with("Game BUFFY is over.")));
        assert!(!d.registry().contains("buffy"));
        assert_eq!(
            run(&mut d, first, "turn buffy").unwrap_err(),
            RouterError::NotFound(Missing::Games)
        );
    }

    #[test]
    fn discard_that_empties_the_deck_removes_the_game() {
        let mut d = short_deck_dispatcher();
        let (first, second) = start_pair(&mut d);

        run(&mut d, first, &format!("hint {second} 3")).unwrap();
        assert!(d.registry().contains("buffy"));

        let out = run(&mut d, second, "discard B").unwrap();
        assert!(out.response.public.iter().any(|l| l.starts_with("Game BUFFY is over.")));
        assert!(!d.registry().contains("buffy"));
    }

    /// An engine whose every call fails.
    struct Broken;

    impl GameEngine for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn add_player(&mut self, _: &str) -> EngineResult<Response> {
            Err(EngineError::Internal("roster corrupted".into()))
        }
        fn remove_player(&mut self, _: &str) -> EngineResult<Response> {
            Err(EngineError::Internal("roster corrupted".into()))
        }
        fn start_game(&mut self, _: &str) -> EngineResult<Response> {
            Err(EngineError::Internal("roster corrupted".into()))
        }
        fn play_card(&mut self, _: &str, _: hanabot_engine::CardLabel) -> EngineResult<Response> {
            Err(EngineError::Internal("deck corrupted".into()))
        }
        fn discard_card(
            &mut self,
            _: &str,
            _: hanabot_engine::CardLabel,
        ) -> EngineResult<Response> {
            Err(EngineError::Internal("deck corrupted".into()))
        }
        fn hint_player(
            &mut self,
            _: &str,
            _: &str,
            _: hanabot_engine::Hint,
        ) -> EngineResult<Response> {
            Err(EngineError::Internal("deck corrupted".into()))
        }
        fn move_card(
            &mut self,
            _: &str,
            _: hanabot_engine::CardLabel,
            _: usize,
        ) -> EngineResult<Response> {
            Err(EngineError::Internal("hand corrupted".into()))
        }
        fn swap_cards(
            &mut self,
            _: &str,
            _: hanabot_engine::CardLabel,
            _: hanabot_engine::CardLabel,
        ) -> EngineResult<Response> {
            Err(EngineError::Internal("hand corrupted".into()))
        }
        fn sort_cards(&mut self, _: &str) -> EngineResult<Response> {
            Err(EngineError::Internal("hand corrupted".into()))
        }
        fn get_hands(&self, _: &str) -> EngineResult<Response> {
            Err(EngineError::Internal("hand corrupted".into()))
        }
        fn get_table(&self) -> EngineResult<Response> {
            Err(EngineError::Internal("table corrupted".into()))
        }
        fn get_discard_pile(&self) -> EngineResult<Response> {
            Err(EngineError::Internal("table corrupted".into()))
        }
        fn turn(&self) -> EngineResult<Response> {
            Err(EngineError::NoTurnOrder {
                game: "broken".into(),
            })
        }
        fn turns(&self) -> EngineResult<Response> {
            self.turn()
        }
        fn get_status(&self, _: &str) -> EngineResult<Response> {
            self.turn()
        }
        fn show_game_state(&self) -> EngineResult<Response> {
            self.turn()
        }
        fn has_started(&self) -> bool {
            true
        }
        fn game_over(&self) -> bool {
            false
        }
        fn players(&self) -> Vec<String> {
            vec!["olive".into()]
        }
        fn in_game(&self, player: &str) -> bool {
            player == "olive"
        }
    }

    fn broken_dispatcher() -> Dispatcher {
        let registry = SessionRegistry::new(
            NameAllocator::ordered(),
            Box::new(|_: &str| -> Box<dyn GameEngine> { Box::new(Broken) }),
        );
        Dispatcher::new(registry, SessionScope::Named, "#hanabi", ctx())
    }

    #[test]
    fn engine_failures_are_contained() {
        let mut d = broken_dispatcher();
        run(&mut d, "olive", "new").unwrap();

        let err = run(&mut d, "olive", "play A").unwrap_err();
        assert_eq!(
            err,
            RouterError::Engine {
                verb: "play",
                operation: "play_card",
                source: EngineError::Internal("deck corrupted".into()),
            }
        );

        let out = d.handle(&Invocation::public("olive", "#hanabi", "turn"), &players());
        assert_eq!(out.response.public.len(), 3);
        assert_eq!(out.response.public[1], "Error in command turn, engine call turn.");
        // the session survives
        assert!(d.registry().contains("buffy"));
    }

    #[test]
    fn handle_renders_errors_privately() {
        let mut d = dispatcher(SessionScope::Named);
        let out = d.handle(&Invocation::public("olive", "#hanabi", "xyzzy"), &players());
        assert!(out.response.public.is_empty());
        assert_eq!(
            out.response.private,
            vec![
                "My dearest brother Willis, I do not understand this \"xyzzy\" of which you \
                 speak."
            ]
        );
    }

    #[test]
    fn from_config_uses_router_settings() {
        let mut config = Config::default();
        config.router.scope = SessionScope::Channel;
        config.router.sigil = ".".into();
        config.router.markup = "ascii".into();
        config.router.game_names = vec!["zeppo".into()];
        config.irc.channel = "games".into();

        let d = Dispatcher::from_config(&config).unwrap();
        assert_eq!(d.scope(), SessionScope::Channel);
        assert_eq!(d.home_channel(), "#games");
        assert_eq!(d.render_context().sigil, '.');
        assert_eq!(d.with_home_channel("#console").home_channel(), "#console");

        config.router.markup = "neon".into();
        assert!(Dispatcher::from_config(&config).is_err());
    }
}
