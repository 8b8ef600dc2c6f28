//! A player's hand.
//!
//! Every card carries a letter. The letter stays with the card while the
//! player rearranges the hand, and is handed to the replacement when the card
//! leaves.

use crate::card::{Card, CardLabel, Hint};
use crate::markup::Markup;

#[derive(Debug, Clone, Default)]
pub struct Hand {
    slots: Vec<(CardLabel, Card)>,
}

impl Hand {
    /// Deal `cards` into a fresh hand, labelled A, B, C, ... left to right.
    pub fn deal(cards: Vec<Card>) -> Self {
        Self {
            slots: CardLabel::ALL.into_iter().zip(cards).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, label: CardLabel) -> bool {
        self.position(label).is_some()
    }

    fn position(&self, label: CardLabel) -> Option<usize> {
        self.slots.iter().position(|(l, _)| *l == label)
    }

    /// Remove and return the card with `label`.
    pub fn take(&mut self, label: CardLabel) -> Option<Card> {
        let idx = self.position(label)?;
        Some(self.slots.remove(idx).1)
    }

    /// Add a card on the right, labelled with the first free letter.
    pub fn draw(&mut self, card: Card) {
        if let Some(label) = CardLabel::ALL.into_iter().find(|l| !self.contains(*l)) {
            self.slots.push((label, card));
        }
    }

    /// Swap the positions of two cards. False if either is missing.
    pub fn swap(&mut self, a: CardLabel, b: CardLabel) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(i), Some(j)) => {
                self.slots.swap(i, j);
                true
            }
            _ => false,
        }
    }

    /// Move a card to 1-based `index`, the cards after it slide right.
    pub fn move_to(&mut self, label: CardLabel, index: usize) -> bool {
        if index == 0 || index > self.slots.len() {
            return false;
        }
        let Some(from) = self.position(label) else {
            return false;
        };
        let slot = self.slots.remove(from);
        self.slots.insert(index - 1, slot);
        true
    }

    /// Back to A, B, C, ... order.
    pub fn sort(&mut self) {
        self.slots.sort_by_key(|(l, _)| *l);
    }

    /// Letters of the cards a hint points at, left to right.
    pub fn matching(&self, hint: Hint) -> Vec<CardLabel> {
        self.slots
            .iter()
            .filter(|(_, c)| c.matches(hint))
            .map(|(l, _)| *l)
            .collect()
    }

    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.slots.iter().map(|(_, c)| *c)
    }

    /// What the owner sees: just the letters.
    pub fn backs(&self) -> String {
        self.slots.iter().map(|(l, _)| l.as_char()).collect()
    }

    /// What everybody else sees: the cards, each tagged with its letter.
    pub fn fronts(&self, markup: Markup) -> String {
        self.slots
            .iter()
            .map(|(l, c)| format!("{l}:{}", c.render(markup)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Give the cards back, emptying the hand.
    pub fn into_cards(self) -> Vec<Card> {
        self.slots.into_iter().map(|(_, c)| c).collect()
    }
}
