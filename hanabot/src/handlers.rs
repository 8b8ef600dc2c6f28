//! One function per verb.
//!
//! Handlers receive validated arguments and return an [`Outcome`]. Anything
//! that goes wrong comes back as a `RouterError` for the dispatcher to render.

use hanabot_common::config::{channel_key, normalize_channel};
use hanabot_common::util::english_list;
use hanabot_common::SessionScope;
use hanabot_engine::{EngineResult, GameEngine, Response};
use tracing::info;

use crate::commands::{self, Group};
use crate::dispatcher::{Action, Call, Dispatcher, Outcome};
use crate::error::{engine_call, Missing, Result, RouterError};
use crate::registry::Session;

const RULES_URL: &str = "http://boardgamegeek.com/filepage/59655/hanabi-english-translation";

/// Reason given to the server on `die`.
pub const SHUTDOWN_REASON: &str = "Seppuku Successful";

/// Key of the game a command refers to, before resolution.
fn game_key(d: &Dispatcher, call: &Call<'_>) -> Option<String> {
    match d.scope {
        SessionScope::Named => call.target.map(str::to_string),
        SessionScope::Channel => Some(channel_key(&call.inv.channel)),
    }
}

fn session_name(d: &Dispatcher, call: &Call<'_>) -> Result<String> {
    Ok(d.registry
        .resolve(game_key(d, call).as_deref(), call.sender())?
        .name()
        .to_string())
}

/// The sender's own game when no id is given in named scope.
fn own_session_name(d: &Dispatcher, call: &Call<'_>) -> Option<String> {
    match (d.scope, call.target) {
        (SessionScope::Named, None) => d
            .registry
            .find_by_player(call.sender())
            .map(|s| s.name().to_string()),
        _ => None,
    }
}

/// Run one engine call against game `name`.
fn with_engine<F>(
    d: &mut Dispatcher,
    call: &Call<'_>,
    name: &str,
    operation: &'static str,
    f: F,
) -> Result<Outcome>
where
    F: FnOnce(&mut dyn GameEngine, &str) -> EngineResult<Response>,
{
    let session = d
        .registry
        .get_mut(name)
        .ok_or_else(|| RouterError::NotFound(Missing::Game(name.to_string())))?;
    let response = engine_call(call.verb(), operation, f(session.engine_mut(), call.sender()))?;
    Ok(Outcome::reply(response).touching(name))
}

/// Resolve the game the command names, then run one engine call on it.
fn on_session<F>(
    d: &mut Dispatcher,
    call: &Call<'_>,
    operation: &'static str,
    f: F,
) -> Result<Outcome>
where
    F: FnOnce(&mut dyn GameEngine, &str) -> EngineResult<Response>,
{
    let name = session_name(d, call)?;
    with_engine(d, call, &name, operation, f)
}

fn summary(d: &Dispatcher, verb: &'static str, session: &Session) -> Result<String> {
    let engine = session.engine();
    let title = format!("Game {} in {}", d.bold(session.name()), session.channel());
    let players = engine.players();

    if engine.has_started() {
        let turn = engine_call(verb, "turn", engine.turn())?.public.join(" ");
        return Ok(format!(
            "{title}: being played by {}. {turn}",
            english_list(&players)
        ));
    }
    Ok(match players.len() {
        0 => format!("{title}: waiting for players, no players have joined yet."),
        1 => format!("{title}: waiting for players, 1 player has joined so far: {}.", players[0]),
        n => format!(
            "{title}: waiting for players, {n} players have joined so far: {}.",
            english_list(&players)
        ),
    })
}

// ---------------------------------------------------------------------------
// Game management
// ---------------------------------------------------------------------------

pub(crate) fn new(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let sender = call.sender();
    let sigil = d.ctx.sigil;

    match d.scope {
        SessionScope::Named => {
            let name = d.registry.create(call.target, &call.inv.channel)?;
            Ok(Outcome::reply(Response::public(format!(
                "New game \"{}\" started by {sender}. Accepting joins now.",
                d.bold(&name)
            ))))
        }
        SessionScope::Channel => {
            if let Some(target) = call.target {
                let channel = normalize_channel(target);
                return Ok(Outcome::reply(Response::public(format!(
                    "Hanabot joined channel {channel}. /join {channel} and {sigil}new to begin \
                     a game there."
                )))
                .with_action(Action::Join(channel)));
            }
            let channel = call.inv.channel.as_str();
            d.registry.create(Some(&channel_key(channel)), channel)?;
            Ok(Outcome::reply(Response::public(format!(
                "New game started by {sender} in {channel}. Accepting joins now."
            ))))
        }
    }
}

pub(crate) fn delete(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let name = session_name(d, call)?;
    d.registry.terminate(&name)?;
    Ok(Outcome::reply(Response::public(format!(
        "Game {} deleted by {}.",
        d.bold(&name),
        call.sender()
    ))))
}

pub(crate) fn join(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let name = session_name(d, call)?;
    if let Some(current) = d.registry.find_by_player(call.sender()) {
        return Err(RouterError::AlreadyInGame {
            player: call.sender().to_string(),
            game: current.name().to_string(),
        });
    }
    with_engine(d, call, &name, "add_player", |e, p| e.add_player(p))
}

pub(crate) fn start(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "start_game", |e, p| e.start_game(p))
}

pub(crate) fn leave(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let name = match (d.scope, call.target) {
        (SessionScope::Named, None) => own_session_name(d, call)
            .ok_or_else(|| RouterError::NotFound(Missing::Player(call.sender().to_string())))?,
        _ => session_name(d, call)?,
    };
    with_engine(d, call, &name, "remove_player", |e, p| e.remove_player(p))
}

pub(crate) fn part(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let channel = call.inv.channel.as_str();
    if call.inv.private || channel.eq_ignore_ascii_case(&d.home_channel) {
        return Ok(Outcome::reply(Response::public(
            "Hanabot refuses to leave home channel. Nice try.",
        )));
    }
    info!(channel, by = call.sender(), "asked to part");
    Ok(Outcome::reply(Response::public("Hanabot leaving channel."))
        .with_action(Action::Part(channel.to_string())))
}

// ---------------------------------------------------------------------------
// Hand management and game actions
// ---------------------------------------------------------------------------

pub(crate) fn move_card(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let card = call.args.card(0)?;
    let index = call.args.index(1)?;
    on_session(d, call, "move_card", |e, p| e.move_card(p, card, index))
}

pub(crate) fn swap(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let a = call.args.card(0)?;
    let b = call.args.card(1)?;
    on_session(d, call, "swap_cards", |e, p| e.swap_cards(p, a, b))
}

pub(crate) fn sort(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "sort_cards", |e, p| e.sort_cards(p))
}

pub(crate) fn play(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let card = call.args.card(0)?;
    on_session(d, call, "play_card", |e, p| e.play_card(p, card))
}

pub(crate) fn discard(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let card = call.args.card(0)?;
    on_session(d, call, "discard_card", |e, p| e.discard_card(p, card))
}

pub(crate) fn hint(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let target = call.args.word(0)?.to_string();
    let hint = call.args.hint(1)?;
    on_session(d, call, "hint_player", |e, p| e.hint_player(p, &target, hint))
}

// ---------------------------------------------------------------------------
// Information
// ---------------------------------------------------------------------------

pub(crate) fn help(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let s = d.ctx.sigil;

    let Some(topic) = call.target else {
        let mut out = Response::new();
        out.push_private(format!(
            "A game is created via {s}new, then 2 to 5 people {s}join the game, and someone \
             calls {s}start to start the game. Once started, players take turns either \
             {s}playing a card, {s}discarding a card, or giving another player a {s}hint. \
             After a valid {s}play or {s}discard the state of the table is shown. The table \
             state can also be seen with the {s}table command. The turn order is shown with \
             {s}turns."
        ));
        out.push_private(format!(
            "Players can use {s}hands to view all hands at the table, including their own. \
             Your own hand is shown with the \"backs\" facing you. When any card is added to \
             your hand, it is assigned a letter A-E, allowing you to track individual cards as \
             they move around. When a card leaves your hand its letter is assigned to the \
             incoming card."
        ));
        out.push_private(format!(
            "You reference your own hand via these letters, e.g. \"{s}play C\" or \
             \"{s}discard A\". You can arrange your hand via {s}swap, {s}sort, and {s}move."
        ));
        out.push_private(format!(
            "Hints are given by the {s}hint command. The hint format is \"{s}hint nick \
             color|number\". Valid numbers are 1-5; valid colors are white, yellow, red, blue, \
             or green. Example: \"{s}hint xyzzy blue\" or \"{s}hint fred 3\""
        ));
        out.push_private(
            "The game continues until the deck is empty, all the cards are correctly \
             displayed on the table, or the three storm tokens have been flipped.",
        );
        if d.scope == SessionScope::Named {
            out.push_private(format!(
                "Several games can run at once. Commands that act on a game take the game id \
                 as an optional last argument, e.g. \"{s}play C buffy\"; it can be left off \
                 while only one game is running."
            ));
        }
        for group in Group::USER {
            out.push_private(format!(
                "{} commands: {}",
                group.as_str(),
                commands::verbs_in(group).join(", ")
            ));
        }
        out.push_private(format!(
            "Doing \"{s}help [command]\" will give details on that command."
        ));
        return Ok(Outcome::reply(out));
    };

    let text = match topic {
        "grue" => "You are likely to be eaten.".to_string(),
        _ => commands::usage(topic, s).unwrap_or_else(|| format!("No help for topic {topic}")),
    };
    Ok(Outcome::reply(Response::private(text)))
}

pub(crate) fn rules(_d: &mut Dispatcher, _call: &Call<'_>) -> Result<Outcome> {
    Ok(Outcome::reply(Response::private(format!(
        "Go here for english rules: {RULES_URL}"
    ))))
}

pub(crate) fn turn(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "turn", |e, _| e.turn())
}

pub(crate) fn turns(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "turns", |e, _| e.turns())
}

pub(crate) fn hands(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "get_hands", |e, p| e.get_hands(p))
}

pub(crate) fn table(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "get_table", |e, _| e.get_table())
}

pub(crate) fn discard_pile(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    on_session(d, call, "get_discard_pile", |e, _| e.get_discard_pile())
}

pub(crate) fn status(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let name = match own_session_name(d, call) {
        Some(name) => name,
        None => session_name(d, call)?,
    };
    with_engine(d, call, &name, "get_status", |e, p| e.get_status(p))
}

pub(crate) fn game(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    let session = match d.scope {
        SessionScope::Named => d.registry.resolve(call.target, call.sender())?,
        SessionScope::Channel => {
            let channel = call.inv.channel.as_str();
            match d.registry.get(&channel_key(channel)) {
                Some(session) => session,
                None => {
                    let s = d.ctx.sigil;
                    return Ok(Outcome::reply(Response::public(format!(
                        "There is no game being played in {channel}. Use {s}new to start one \
                         while in {channel}."
                    ))));
                }
            }
        }
    };
    Ok(Outcome::reply(Response::public(summary(d, call.verb(), session)?)))
}

pub(crate) fn games(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    if d.registry.is_empty() {
        return Ok(Outcome::reply(Response::private("No active games.")));
    }
    let mut out = Response::new();
    for session in d.registry.iter() {
        out.push_private(summary(d, call.verb(), session)?);
    }
    Ok(Outcome::reply(out))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub(crate) fn die(_d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    info!(by = call.sender(), channel = %call.inv.channel, "shutdown requested");
    Ok(Outcome::default().with_action(Action::Shutdown {
        reason: SHUTDOWN_REASON.to_string(),
    }))
}

pub(crate) fn show(d: &mut Dispatcher, call: &Call<'_>) -> Result<Outcome> {
    if d.registry.is_empty() {
        return Ok(Outcome::reply(Response::private("No active games.")));
    }
    let mut out = Response::new();
    for session in d.registry.iter() {
        out.extend(engine_call(
            call.verb(),
            "show_game_state",
            session.engine().show_game_state(),
        )?);
    }
    Ok(Outcome::reply(out))
}
