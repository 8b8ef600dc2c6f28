//! The command table.
//!
//! Every verb the bot answers to, with its argument kinds, whether it needs
//! a running game, and the handler it is bound to. The table is built at
//! compile time and drives recognition, validation, help text and the
//! `hanabot commands` listing.

use crate::dispatcher::{Call, Dispatcher, Outcome};
use crate::error::Result;
use crate::handlers;
use crate::validator::ArgKind;

pub type Handler = fn(&mut Dispatcher, &Call<'_>) -> Result<Outcome>;

/// Help groups, in the order help lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    GameManagement,
    HandManagement,
    GameAction,
    Information,
    Admin,
}

impl Group {
    /// Groups shown to players.
    pub const USER: [Group; 4] = [
        Group::GameManagement,
        Group::HandManagement,
        Group::GameAction,
        Group::Information,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GameManagement => "Game Management",
            Self::HandManagement => "Hand Management",
            Self::GameAction => "Game Action",
            Self::Information => "Information",
            Self::Admin => "Admin",
        }
    }
}

/// An optional last token after the fixed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailing {
    None,
    /// Game id, only in named scope
    GameId,
    /// `new`: game name (named scope) or channel to join (channel scope)
    NewTarget,
    /// `help`: the command to explain
    Topic,
}

pub struct CommandSpec {
    pub verb: &'static str,
    pub group: Group,
    pub args: &'static [ArgKind],
    /// Argument names for listings, same length as `args`
    pub arg_names: &'static [&'static str],
    pub trailing: Trailing,
    /// In channel scope, refuse unless the channel has a game
    pub needs_session: bool,
    /// May end the game; checked with `terminate_if_over` afterwards
    pub mutating: bool,
    /// Usage text, `{sigil}` replaced when shown
    usage: &'static str,
    pub handler: Handler,
}

impl CommandSpec {
    pub fn is_admin(&self) -> bool {
        self.group == Group::Admin
    }

    pub fn usage(&self, sigil: char) -> String {
        self.usage.replace("{sigil}", &sigil.to_string())
    }

    /// `move card index [game]`
    pub fn signature(&self) -> String {
        let mut parts = vec![self.verb.to_string()];
        parts.extend(self.arg_names.iter().map(|a| (*a).to_string()));
        match self.trailing {
            Trailing::None => {}
            Trailing::GameId => parts.push("[game]".into()),
            Trailing::NewTarget => parts.push("[name|channel]".into()),
            Trailing::Topic => parts.push("[command]".into()),
        }
        parts.join(" ")
    }
}

macro_rules! command {
    (
        $verb:literal, $group:ident, [$($kind:ident $name:literal),*], $trailing:ident,
        session: $session:literal, mutating: $mutating:literal, $handler:path, $usage:literal
    ) => {
        CommandSpec {
            verb: $verb,
            group: Group::$group,
            args: &[$(ArgKind::$kind),*],
            arg_names: &[$($name),*],
            trailing: Trailing::$trailing,
            needs_session: $session,
            mutating: $mutating,
            usage: $usage,
            handler: $handler,
        }
    };
}

pub static COMMANDS: &[CommandSpec] = &[
    command!("new", GameManagement, [], NewTarget, session: false, mutating: false, handlers::new,
        "{sigil}new [name|channel] - create a new game. With several games running, the name \
         identifies the game; without one a name is picked for you. In one-game-per-channel \
         mode a channel argument makes hanabot join that channel instead (then use {sigil}new \
         there)."),
    command!("delete", GameManagement, [], GameId, session: true, mutating: false, handlers::delete,
        "{sigil}delete [game] - delete a game."),
    command!("join", GameManagement, [], GameId, session: true, mutating: true, handlers::join,
        "{sigil}join [game] - join a game. If there is no game, use {sigil}new to create one."),
    command!("start", GameManagement, [], GameId, session: true, mutating: true, handlers::start,
        "{sigil}start [game] - start a game. The game must have at least two players."),
    command!("leave", GameManagement, [], GameId, session: true, mutating: true, handlers::leave,
        "{sigil}leave [game] - leave a game. This is bad form."),
    command!("part", GameManagement, [], None, session: false, mutating: false, handlers::part,
        "{sigil}part - tell hanabot to part the channel. Hanabot will not leave its home channel."),
    command!("move", HandManagement, [Card "card", Index "index"], GameId,
        session: true, mutating: true, handlers::move_card,
        "{sigil}move card index - move a card in your hand and slide all other cards \"right\". \
         \"card\" must be one of A, B, C, D, or E. \"index\" is where to put the card, counting \
         from the left, and must be between 1 and your hand size."),
    command!("swap", HandManagement, [Card "card", Card "card"], GameId,
        session: true, mutating: true, handlers::swap,
        "{sigil}swap card card - swap two cards in your hand. Cards must be one of A, B, C, D, \
         or E."),
    command!("sort", HandManagement, [], GameId, session: true, mutating: true, handlers::sort,
        "{sigil}sort - sort your cards back into ABCDE order."),
    command!("play", GameAction, [Card "card"], GameId, session: true, mutating: true,
        handlers::play,
        "{sigil}play card - play the card to the table. \"card\" must be one of A, B, C, D, or E."),
    command!("hint", GameAction, [Word "nick", Hint "color|number"], GameId,
        session: true, mutating: true, handlers::hint,
        "{sigil}hint nick color|number - tell a player which of their cards are a color or a \
         number. Valid colors: red, blue, white, green, yellow (or r, b, w, g, y), case \
         insensitive; valid numbers are 1 to 5. Example: \"{sigil}hint frobozz blue\" or \
         \"{sigil}hint plugh 4\""),
    command!("discard", GameAction, [Card "card"], GameId, session: true, mutating: true,
        handlers::discard,
        "{sigil}discard card - place a card in the discard pile. \"card\" must be one of A, B, \
         C, D, or E."),
    command!("help", Information, [], Topic, session: false, mutating: false, handlers::help,
        "Infinite recursion detected. Universe is rebooting..."),
    command!("rules", Information, [], None, session: false, mutating: false, handlers::rules,
        "{sigil}rules - show the URL of the (english) Hanabi rules."),
    command!("turn", Information, [], GameId, session: true, mutating: false, handlers::turn,
        "{sigil}turn [game] - show whose turn it is."),
    command!("turns", Information, [], GameId, session: true, mutating: false, handlers::turns,
        "{sigil}turns [game] - show the turn order, starting with the current player."),
    command!("hands", Information, [], GameId, session: true, mutating: false, handlers::hands,
        "{sigil}hands [game] - show the hands of all players. Your own hand is shown with the \
         \"backs\" facing you, each card identified by a letter. When a card leaves your hand \
         its letter is reused for the new card."),
    command!("table", Information, [], GameId, session: true, mutating: false, handlers::table,
        "{sigil}table [game] - show the cards on the table and the remaining tokens."),
    command!("discardpile", Information, [], GameId, session: true, mutating: false,
        handlers::discard_pile,
        "{sigil}discardpile [game] - show the current discard pile."),
    command!("status", Information, [], GameId, session: true, mutating: false, handlers::status,
        "{sigil}status [game] - show everything you are allowed to see about your game."),
    command!("st", Information, [], GameId, session: true, mutating: false, handlers::status,
        "{sigil}st [game] - short for {sigil}status."),
    command!("game", Information, [], GameId, session: false, mutating: false, handlers::game,
        "{sigil}game [game] - show the state of a game."),
    command!("games", Information, [], None, session: false, mutating: false, handlers::games,
        "{sigil}games - show the state of every running game."),
    command!("list", Information, [], None, session: false, mutating: false, handlers::games,
        "{sigil}list - same as {sigil}games."),
    command!("die", Admin, [], None, session: false, mutating: false, handlers::die,
        "{sigil}die - shut hanabot down. Channel operators only."),
    command!("show", Admin, [], None, session: false, mutating: false, handlers::show,
        "{sigil}show - dump the full state of every game, cards included. Channel operators only."),
];

/// A player command. Admin verbs are not found here.
pub fn find(verb: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.verb == verb && !c.is_admin())
}

/// An admin command.
pub fn admin(verb: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.verb == verb && c.is_admin())
}

/// Usage text for a player command.
pub fn usage(verb: &str, sigil: char) -> Option<String> {
    find(verb).map(|c| c.usage(sigil))
}

/// Verbs in `group`, in table order.
pub fn verbs_in(group: Group) -> Vec<&'static str> {
    COMMANDS
        .iter()
        .filter(|c| c.group == group)
        .map(|c| c.verb)
        .collect()
}
