//! Cards, card labels and hints.

use std::fmt;
use std::str::FromStr;

use crate::markup::Markup;

/// Card colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Red,
    White,
    Blue,
    Green,
    Yellow,
}

impl Color {
    pub const ALL: [Color; 5] = [
        Color::Red,
        Color::White,
        Color::Blue,
        Color::Green,
        Color::Yellow,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::White => "white",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
        }
    }

    pub const fn letter(&self) -> char {
        match self {
            Self::Red => 'r',
            Self::White => 'w',
            Self::Blue => 'b',
            Self::Green => 'g',
            Self::Yellow => 'y',
        }
    }

    pub(crate) const fn index(&self) -> usize {
        match self {
            Self::Red => 0,
            Self::White => 1,
            Self::Blue => 2,
            Self::Green => 3,
            Self::Yellow => 4,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = String;

    /// Full names or first letters, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Color::ALL
            .into_iter()
            .find(|c| c.as_str() == lower || (lower.len() == 1 && lower.starts_with(c.letter())))
            .ok_or_else(|| format!("{s} is not a colour"))
    }
}

/// Highest card number.
pub const MAX_NUMBER: u8 = 5;

/// Copies of each number per colour.
pub const DISTRIBUTION: [u8; 10] = [1, 1, 1, 2, 2, 3, 3, 4, 4, 5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub color: Color,
    pub number: u8,
}

impl Card {
    pub const fn new(color: Color, number: u8) -> Self {
        Self { color, number }
    }

    /// Unshuffled full deck.
    pub fn full_deck() -> Vec<Card> {
        Color::ALL
            .iter()
            .flat_map(|c| DISTRIBUTION.iter().map(move |n| Card::new(*c, *n)))
            .collect()
    }

    pub fn render(&self, markup: Markup) -> String {
        markup.color(&self.number.to_string(), self.color)
    }

    pub fn matches(&self, hint: Hint) -> bool {
        match hint {
            Hint::Color(c) => self.color == c,
            Hint::Number(n) => self.number == n,
        }
    }
}

/// Letter a player uses to refer to a card in their own hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardLabel(char);

impl CardLabel {
    /// Labels handed out to a fresh hand, in order.
    pub const ALL: [CardLabel; 5] = [
        CardLabel('A'),
        CardLabel('B'),
        CardLabel('C'),
        CardLabel('D'),
        CardLabel('E'),
    ];

    pub const fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for CardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CardLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                let upper = c.to_ascii_uppercase();
                CardLabel::ALL
                    .into_iter()
                    .find(|l| l.0 == upper)
                    .ok_or_else(|| format!("card must be one of A, B, C, D or E, not {s}"))
            }
            _ => Err(format!("card must be one of A, B, C, D or E, not {s}")),
        }
    }
}

/// A clue: every card of a colour, or every card of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Color(Color),
    Number(u8),
}

impl Hint {
    pub fn render(&self, markup: Markup) -> String {
        match self {
            Self::Color(c) => markup.color(c.as_str(), *c),
            Self::Number(n) => n.to_string(),
        }
    }
}

impl FromStr for Hint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.trim().parse::<u8>() {
            return if (1..=MAX_NUMBER).contains(&n) {
                Ok(Self::Number(n))
            } else {
                Err(format!("numbers must be between 1 and {MAX_NUMBER}, not {n}"))
            };
        }
        s.parse::<Color>().map(Self::Color).map_err(|_| {
            format!("{s} is neither a colour (red, white, blue, green, yellow) nor a number (1-5)")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn full_deck_has_fifty_cards() {
        let deck = Card::full_deck();
        assert_eq!(deck.len(), 50);
        assert_eq!(deck.iter().filter(|c| c.number == 5).count(), 5);
        assert_eq!(deck.iter().filter(|c| c.color == Color::Red).count(), 10);
    }

    #[test_case("red", Color::Red)]
    #[test_case("R", Color::Red)]
    #[test_case("White", Color::White)]
    #[test_case("b", Color::Blue)]
    #[test_case("GREEN", Color::Green)]
    #[test_case("y", Color::Yellow)]
    fn parse_color(input: &str, expected: Color) {
        assert_eq!(input.parse::<Color>().unwrap(), expected);
    }

    #[test]
    fn parse_color_rejects_unknown() {
        assert!("purple".parse::<Color>().is_err());
        assert!("re".parse::<Color>().is_err());
    }

    #[test_case("a", 'A')]
    #[test_case("C", 'C')]
    #[test_case(" e ", 'E')]
    fn parse_label(input: &str, expected: char) {
        assert_eq!(input.parse::<CardLabel>().unwrap().as_char(), expected);
    }

    #[test_case("F")]
    #[test_case("AB")]
    #[test_case("")]
    #[test_case("1")]
    fn parse_label_rejects(input: &str) {
        assert!(input.parse::<CardLabel>().is_err());
    }

    #[test]
    fn parse_hint() {
        assert_eq!("3".parse::<Hint>().unwrap(), Hint::Number(3));
        assert_eq!("blue".parse::<Hint>().unwrap(), Hint::Color(Color::Blue));
        assert!("6".parse::<Hint>().is_err());
        assert!("0".parse::<Hint>().is_err());
        assert!("purple".parse::<Hint>().is_err());
    }

    #[test]
    fn card_matches_hint() {
        let card = Card::new(Color::Green, 4);
        assert!(card.matches(Hint::Color(Color::Green)));
        assert!(card.matches(Hint::Number(4)));
        assert!(!card.matches(Hint::Number(3)));
        assert_eq!(card.render(Markup::Ascii), "g[4]");
    }
}
