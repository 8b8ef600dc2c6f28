//! Text markup for engine output.
//!
//! Bolding and colouring differ per display: mIRC control codes for IRC,
//! ANSI escapes for terminals, and bracket notation for plain ASCII (handy in
//! tests because the output stays readable).

use std::str::FromStr;

use crate::card::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    #[default]
    Irc,
    Xterm,
    Ascii,
}

impl Markup {
    pub fn bold(&self, text: &str) -> String {
        match self {
            Self::Irc => format!("\x02{text}\x02"),
            // bolding needs the current foreground colour, leave it alone
            Self::Xterm => text.to_string(),
            Self::Ascii => text.to_uppercase(),
        }
    }

    pub fn color(&self, text: &str, color: Color) -> String {
        match self {
            Self::Irc => format!("\x03{:02}{text}\x03", irc_color_code(color)),
            Self::Xterm => format!("\x1b[{};1m{text}\x1b[0m", xterm_color_code(color)),
            Self::Ascii => format!("{}[{text}]", color.letter()),
        }
    }

    /// Each character in the next colour, cycling through all five.
    pub fn rainbow(&self, text: &str) -> String {
        text.chars()
            .zip(Color::ALL.iter().cycle())
            .map(|(c, color)| self.color(&c.to_string(), *color))
            .collect()
    }
}

impl FromStr for Markup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "irc" => Ok(Self::Irc),
            "xterm" => Ok(Self::Xterm),
            "ascii" => Ok(Self::Ascii),
            other => Err(format!("unknown markup: {other}")),
        }
    }
}

// mIRC colour codes
const fn irc_color_code(color: Color) -> u8 {
    match color {
        Color::White => 0,
        Color::Blue => 2,
        Color::Green => 3,
        Color::Red => 4,
        Color::Yellow => 8,
    }
}

const fn xterm_color_code(color: Color) -> u8 {
    match color {
        Color::White => 37,
        Color::Blue => 34,
        Color::Green => 32,
        Color::Red => 31,
        Color::Yellow => 33,
    }
}
