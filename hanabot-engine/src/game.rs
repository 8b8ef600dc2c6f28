//! Hanabi.
//!
//! Players cooperate to build one stack per colour, 1 through 5, while
//! never seeing their own cards. `HanabiGame` keeps the whole table state
//! and answers every call with the lines to show.

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::card::{Card, CardLabel, Color, Hint, MAX_NUMBER};
use crate::hand::Hand;
use crate::markup::Markup;
use crate::traits::{EngineError, EngineResult, GameEngine, Response};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;
pub const MAX_NOTES: u8 = 8;
pub const MAX_STORMS: u8 = 3;

/// Perfect score: every colour stacked to 5.
pub const PERFECT_SCORE: usize = Color::ALL.len() * MAX_NUMBER as usize;

/// Cards dealt per player.
pub fn hand_size(players: usize) -> usize {
    if players <= 3 {
        5
    } else {
        4
    }
}

pub struct HanabiGame {
    name: String,
    markup: Markup,
    /// Join order.
    players: Vec<String>,
    hands: HashMap<String, Hand>,
    /// Front is the player whose turn it is.
    turn_order: VecDeque<String>,
    notes: u8,
    storms: u8,
    deck: VecDeque<Card>,
    table: [Vec<Card>; 5],
    discards: Vec<Card>,
    started: bool,
    over: bool,
    rng: StdRng,
}

impl HanabiGame {
    pub fn new(name: impl Into<String>, markup: Markup) -> Self {
        Self::with_rng(name.into(), markup, StdRng::from_entropy())
    }

    /// Same shuffles every time for a given seed.
    pub fn with_seed(name: impl Into<String>, markup: Markup, seed: u64) -> Self {
        Self::with_rng(name.into(), markup, StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: String, markup: Markup, mut rng: StdRng) -> Self {
        let mut deck = Card::full_deck();
        deck.shuffle(&mut rng);
        Self {
            name,
            markup,
            players: Vec::new(),
            hands: HashMap::new(),
            turn_order: VecDeque::new(),
            notes: MAX_NOTES,
            storms: 0,
            deck: deck.into(),
            table: Default::default(),
            discards: Vec::new(),
            started: false,
            over: false,
            rng,
        }
    }

    /// Replace the deck. Cards are dealt and drawn from the front.
    pub fn with_deck(mut self, deck: Vec<Card>) -> Self {
        self.deck = deck.into();
        self
    }

    pub fn current_player(&self) -> Option<&str> {
        self.turn_order.front().map(String::as_str)
    }

    pub fn notes(&self) -> u8 {
        self.notes
    }

    pub fn storms(&self) -> u8 {
        self.storms
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    pub fn score(&self) -> usize {
        self.table.iter().map(Vec::len).sum()
    }

    fn title(&self) -> String {
        self.markup.bold(&self.name)
    }

    fn hand(&self, player: &str) -> EngineResult<&Hand> {
        self.hands.get(player).ok_or_else(|| self.missing(player))
    }

    fn hand_mut(&mut self, player: &str) -> EngineResult<&mut Hand> {
        let game = &self.name;
        self.hands
            .get_mut(player)
            .ok_or_else(|| EngineError::MissingPlayer {
                game: game.clone(),
                player: player.to_string(),
            })
    }

    fn missing(&self, player: &str) -> EngineError {
        EngineError::MissingPlayer {
            game: self.name.clone(),
            player: player.to_string(),
        }
    }

    fn current(&self) -> EngineResult<&str> {
        self.current_player().ok_or_else(|| EngineError::NoTurnOrder {
            game: self.name.clone(),
        })
    }

    /// Membership and a running game. `Some` carries the refusal.
    fn refuse_unless_playing(&self, player: &str) -> Option<Response> {
        if !self.in_game(player) {
            return Some(Response::private(format!("You are not in game {}.", self.title())));
        }
        if !self.started {
            return Some(Response::private(format!(
                "The game {} has not yet started.",
                self.title()
            )));
        }
        None
    }

    /// Membership, a running game, and the caller's turn.
    fn refuse_unless_turn(&self, player: &str) -> EngineResult<Option<Response>> {
        if let Some(refusal) = self.refuse_unless_playing(player) {
            return Ok(Some(refusal));
        }
        let current = self.current()?;
        if current != player {
            return Ok(Some(Response::private(format!(
                "It is not your turn. It is {current}'s turn."
            ))));
        }
        Ok(None)
    }

    fn refuse_missing_card(&self, player: &str, card: CardLabel) -> EngineResult<Option<Response>> {
        if self.hand(player)?.contains(card) {
            Ok(None)
        } else {
            Ok(Some(Response::private(format!(
                "You have no card {card} in your hand."
            ))))
        }
    }

    fn draw(&mut self, player: &str, out: &mut Response) -> EngineResult<()> {
        if let Some(card) = self.deck.pop_front() {
            self.hand_mut(player)?.draw(card);
            out.push_public(format!("{player} drew a new card from the deck."));
        }
        Ok(())
    }

    /// Pass the turn on and announce it, or finish the game.
    fn end_turn(&mut self, out: &mut Response) -> EngineResult<()> {
        if let Some(done) = self.turn_order.pop_front() {
            self.turn_order.push_back(done);
        }
        if self.finished() {
            self.end_game(out);
            return Ok(());
        }
        let next = self.current()?.to_string();
        out.push_public(format!("It is now {next}'s turn in game {}.", self.title()));
        Ok(())
    }

    fn finished(&self) -> bool {
        self.deck.is_empty() || self.storms >= MAX_STORMS || self.score() == PERFECT_SCORE
    }

    fn end_game(&mut self, out: &mut Response) {
        let score = self.score();
        self.over = true;
        self.started = false;
        debug!(game = %self.name, score, "game finished");

        out.push_public("-------------------------");
        out.push_public(format!("Game {} is over. Final score is {score}.", self.title()));
        out.push_public(match score {
            0..=5 => "Oh dear! The crowd booed.".to_string(),
            6..=10 => "Poor! Hardly any applause.".to_string(),
            11..=15 => "OK! The audience has seen better.".to_string(),
            16..=20 => "Good! The audience is pleased!".to_string(),
            21..=24 => "Very good! The audience is enthusiastic!".to_string(),
            _ => format!(
                "{}! It's a perfect game! 25 points!",
                self.markup.rainbow("Congratulations")
            ),
        });
        out.push_public("-------------------------");
    }

    fn tokens(&self) -> String {
        let notes: String = (0..MAX_NOTES)
            .map(|i| if i < self.notes { 'w' } else { 'b' })
            .collect();
        let storms: String = (0..MAX_STORMS)
            .map(|i| if i < self.storms { 'X' } else { 'O' })
            .collect();
        format!(
            "Notes: {notes}, Storms: {storms}, {} cards remaining.",
            self.deck.len()
        )
    }

    fn table_line(&self) -> String {
        let stacks: Vec<String> = self
            .table
            .iter()
            .filter(|stack| !stack.is_empty())
            .map(|stack| self.render_cards(stack))
            .collect();
        if stacks.is_empty() {
            "Table: empty".to_string()
        } else {
            format!("Table: {}", stacks.join(", "))
        }
    }

    fn render_cards<'a>(&self, cards: impl IntoIterator<Item = &'a Card>) -> String {
        cards.into_iter().map(|c| c.render(self.markup)).collect()
    }

    /// One line per player in join order. `viewer` sees their own hand as backs.
    fn hand_lines(&self, viewer: Option<&str>) -> EngineResult<Vec<String>> {
        self.players
            .iter()
            .map(|p| {
                let hand = self.hand(p)?;
                let cards = if viewer == Some(p.as_str()) {
                    hand.backs()
                } else {
                    hand.fronts(self.markup)
                };
                Ok(format!("{}: {cards}", self.markup.bold(p)))
            })
            .collect()
    }

    fn status(&self, viewer: Option<&str>) -> EngineResult<Response> {
        let mut out = Response::private(format!("--- Game Status: {} ---", self.title()));
        if self.started {
            out.push_private(self.hand_lines(viewer)?.join(", "));
        } else if self.players.is_empty() {
            out.push_private("Waiting for players to join.");
        } else {
            out.push_private(format!(
                "Waiting to start. Players: {}",
                self.players.join(", ")
            ));
        }
        out.push_private(self.table_line());
        out.push_private(self.tokens());
        out.push_private(format!(
            "Current player: {}",
            self.current_player().unwrap_or("N/A")
        ));
        if let Some(top) = self.discards.last() {
            out.push_private(format!(
                "Top discard: {}. (size is {})",
                top.render(self.markup),
                self.discards.len()
            ));
        }
        Ok(out)
    }
}

impl GameEngine for HanabiGame {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_player(&mut self, player: &str) -> EngineResult<Response> {
        if self.started {
            return Ok(Response::private(format!(
                "Game {} already started.",
                self.title()
            )));
        }
        if self.in_game(player) {
            return Ok(Response::private(format!(
                "You are already in game {}.",
                self.title()
            )));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Ok(Response::private(format!(
                "Game {} already has {MAX_PLAYERS} players. You can start another with new [name].",
                self.title()
            )));
        }

        self.players.push(player.to_string());
        let mut out = Response::public(format!("{player} has joined game {}.", self.title()));
        if self.players.len() >= MIN_PLAYERS {
            out.push_public(format!(
                "Game {} has enough players and can be started with the start command.",
                self.title()
            ));
        }
        Ok(out)
    }

    fn remove_player(&mut self, player: &str) -> EngineResult<Response> {
        if !self.in_game(player) {
            return Ok(Response::private(format!(
                "You are not in game {}. You cannot be removed from a game you are not in.",
                self.title()
            )));
        }

        let mut out = Response::public(format!("Removing {player} from game {}.", self.title()));
        out.push_private(format!("You've been removed from game {}.", self.title()));
        self.players.retain(|p| p != player);

        if !self.started {
            return Ok(out);
        }

        let hand = self.hands.remove(player).ok_or_else(|| self.missing(player))?;
        out.push_public(format!(
            "Putting {player}'s cards back in the deck and reshuffling."
        ));
        self.deck.extend(hand.into_cards());
        self.deck.make_contiguous().shuffle(&mut self.rng);

        let was_current = self.current()? == player;
        self.turn_order.retain(|p| p != player);

        if self.players.len() < MIN_PLAYERS {
            out.push_public(format!(
                "Stopping game {} as there are fewer than two people left in the game.",
                self.title()
            ));
            self.started = false;
            self.over = true;
        } else if was_current {
            let next = self.current()?.to_string();
            out.push_public(format!("It is now {next}'s turn in game {}.", self.title()));
        }
        Ok(out)
    }

    fn start_game(&mut self, player: &str) -> EngineResult<Response> {
        if !self.in_game(player) {
            return Ok(Response::private(format!("You are not in game {}.", self.title())));
        }
        if self.started {
            return Ok(Response::private(format!(
                "Game {} has already begun.",
                self.title()
            )));
        }
        if self.players.len() < MIN_PLAYERS {
            return Ok(Response::private(
                "There are not enough players in the game, not starting.",
            ));
        }

        let size = hand_size(self.players.len());
        for p in &self.players {
            let cards: Vec<Card> = (0..size).filter_map(|_| self.deck.pop_front()).collect();
            self.hands.insert(p.clone(), Hand::deal(cards));
        }
        let mut order = self.players.clone();
        order.shuffle(&mut self.rng);
        self.turn_order = order.into();
        self.started = true;
        debug!(game = %self.name, players = self.players.len(), "game started");

        let mut out = Response::public(format!(
            "{} game with game id \"{}\" has begun!",
            self.markup.rainbow("Hanabi"),
            self.title()
        ));
        let first = self.current()?.to_string();
        out.push_public(format!("It is now {first}'s turn in game {}.", self.title()));
        Ok(out)
    }

    fn play_card(&mut self, player: &str, card: CardLabel) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_turn(player)? {
            return Ok(refusal);
        }
        if let Some(refusal) = self.refuse_missing_card(player, card)? {
            return Ok(refusal);
        }

        let played = self
            .hand_mut(player)?
            .take(card)
            .ok_or_else(|| EngineError::Internal(format!("card {card} vanished from {player}")))?;
        let shown = played.render(self.markup);
        let stack = &mut self.table[played.color.index()];
        let next = stack.last().map_or(1, |top| top.number + 1);

        let mut out = Response::new();
        if played.number == next {
            stack.push(played);
            out.push_public(format!(
                "{player} successfully added {shown} to the {} group.",
                played.color
            ));
            if played.number == MAX_NUMBER && self.notes < MAX_NOTES {
                self.notes += 1;
                out.push_public(format!(
                    "{} for finishing colour: one note token flipped!",
                    self.markup.bold("Bonus")
                ));
            }
        } else {
            self.storms += 1;
            self.discards.push(played);
            out.push_public(format!(
                "{player} guessed wrong with {shown}! One storm token flipped!"
            ));
        }

        self.draw(player, &mut out)?;
        self.end_turn(&mut out)?;
        Ok(out)
    }

    fn discard_card(&mut self, player: &str, card: CardLabel) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_turn(player)? {
            return Ok(refusal);
        }
        if self.notes >= MAX_NOTES {
            return Ok(Response::private(
                "All note tokens are already up, discarding would gain nothing. \
                 Play or hint instead.",
            ));
        }
        if let Some(refusal) = self.refuse_missing_card(player, card)? {
            return Ok(refusal);
        }

        let discarded = self
            .hand_mut(player)?
            .take(card)
            .ok_or_else(|| EngineError::Internal(format!("card {card} vanished from {player}")))?;
        self.discards.push(discarded);
        self.notes += 1;

        let mut out = Response::public(format!(
            "{player} has discarded a {}.",
            discarded.render(self.markup)
        ));
        self.draw(player, &mut out)?;
        self.end_turn(&mut out)?;
        Ok(out)
    }

    fn hint_player(&mut self, player: &str, target: &str, hint: Hint) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_turn(player)? {
            return Ok(refusal);
        }
        if target == player {
            return Ok(Response::private("You cannot give yourself a hint."));
        }
        if !self.in_game(target) {
            return Ok(Response::private(format!(
                "Player {target} is not in game {}.",
                self.title()
            )));
        }
        if self.notes == 0 {
            return Ok(Response::private(
                "There are no note tokens left, you cannot give a hint.",
            ));
        }

        let labels = self.hand(target)?.matching(hint);
        let shown = hint.render(self.markup);
        let line = match labels.as_slice() {
            [] => format!("{player} hints {target}: none of your cards are {shown}."),
            [one] => format!("{player} hints {target}: card {one} is {shown}."),
            many => format!(
                "{player} hints {target}: cards {} are {shown}.",
                list_labels(many)
            ),
        };
        self.notes -= 1;

        let mut out = Response::public(line);
        self.end_turn(&mut out)?;
        Ok(out)
    }

    fn move_card(&mut self, player: &str, card: CardLabel, index: usize) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_playing(player) {
            return Ok(refusal);
        }
        if let Some(refusal) = self.refuse_missing_card(player, card)? {
            return Ok(refusal);
        }
        let hand = self.hand_mut(player)?;
        let len = hand.len();
        if !hand.move_to(card, index) {
            return Ok(Response::private(format!(
                "Position must be between 1 and {len}."
            )));
        }
        Ok(Response::public(format!(
            "{player} moved card {card} to position {index}."
        )))
    }

    fn swap_cards(&mut self, player: &str, a: CardLabel, b: CardLabel) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_playing(player) {
            return Ok(refusal);
        }
        if let Some(refusal) = self.refuse_missing_card(player, a)? {
            return Ok(refusal);
        }
        if let Some(refusal) = self.refuse_missing_card(player, b)? {
            return Ok(refusal);
        }
        self.hand_mut(player)?.swap(a, b);
        Ok(Response::public(format!("{player} swapped cards {a} and {b}.")))
    }

    fn sort_cards(&mut self, player: &str) -> EngineResult<Response> {
        if let Some(refusal) = self.refuse_unless_playing(player) {
            return Ok(refusal);
        }
        self.hand_mut(player)?.sort();
        Ok(Response::public(format!("{player} sorted their cards.")))
    }

    fn get_hands(&self, player: &str) -> EngineResult<Response> {
        if !self.started {
            return Ok(Response::private(format!(
                "No cards have been dealt in game {} yet.",
                self.title()
            )));
        }
        let mut out = Response::new();
        for line in self.hand_lines(Some(player))? {
            out.push_private(line);
        }
        Ok(out)
    }

    fn get_table(&self) -> EngineResult<Response> {
        let mut out = Response::public(self.table_line());
        out.push_public(self.tokens());
        Ok(out)
    }

    fn get_discard_pile(&self) -> EngineResult<Response> {
        if self.discards.is_empty() {
            return Ok(Response::public("Discard pile: empty"));
        }
        Ok(Response::public(format!(
            "Discard pile: {}",
            self.render_cards(&self.discards)
        )))
    }

    fn turn(&self) -> EngineResult<Response> {
        if !self.started {
            return Ok(Response::public(format!(
                "Game {} has not started, it is nobody's turn.",
                self.title()
            )));
        }
        Ok(Response::public(format!(
            "It is {}'s turn to play.",
            self.current()?
        )))
    }

    fn turns(&self) -> EngineResult<Response> {
        if !self.started {
            return Ok(Response::public(format!(
                "Game {} has not started, there is no turn order yet.",
                self.title()
            )));
        }
        let order: Vec<&str> = self.turn_order.iter().map(String::as_str).collect();
        Ok(Response::public(format!("Turn order: {}", order.join(", "))))
    }

    fn get_status(&self, player: &str) -> EngineResult<Response> {
        self.status(Some(player))
    }

    fn show_game_state(&self) -> EngineResult<Response> {
        let mut out = self.status(None)?;
        out.push_private(format!("Deck: {}", self.render_cards(&self.deck)));
        out.push_private(format!("Discard: {}", self.render_cards(&self.discards)));
        Ok(out)
    }

    fn has_started(&self) -> bool {
        self.started
    }

    fn game_over(&self) -> bool {
        self.over
    }

    fn players(&self) -> Vec<String> {
        self.players.clone()
    }

    fn in_game(&self, player: &str) -> bool {
        self.players.iter().any(|p| p == player)
    }
}

fn list_labels(labels: &[CardLabel]) -> String {
    match labels.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            let head: Vec<String> = rest.iter().map(ToString::to_string).collect();
            format!("{} and {last}", head.join(", "))
        }
        Some((last, _)) => last.to_string(),
        None => String::new(),
    }
}
