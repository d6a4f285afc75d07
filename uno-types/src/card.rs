//! The card model.
//!
//! Cards are immutable once created. A wild card keeps the color
//! [`Color::Wild`] forever; the color chosen when it is played lives in the
//! game state's active color, not on the card.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CardId;

/// Card color. `Wild` marks the eight color-less cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Red
    Red,
    /// Blue
    Blue,
    /// Green
    Green,
    /// Yellow
    Yellow,
    /// No color of its own (wild and wild draw four)
    Wild,
}

/// The four colors a player can match or choose.
pub const PLAYABLE_COLORS: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Yellow];

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Wild => "wild",
        };
        f.write_str(name)
    }
}

/// Card face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// 0
    #[serde(rename = "0")]
    Zero,
    /// 1
    #[serde(rename = "1")]
    One,
    /// 2
    #[serde(rename = "2")]
    Two,
    /// 3
    #[serde(rename = "3")]
    Three,
    /// 4
    #[serde(rename = "4")]
    Four,
    /// 5
    #[serde(rename = "5")]
    Five,
    /// 6
    #[serde(rename = "6")]
    Six,
    /// 7
    #[serde(rename = "7")]
    Seven,
    /// 8
    #[serde(rename = "8")]
    Eight,
    /// 9
    #[serde(rename = "9")]
    Nine,
    /// Next player loses their turn
    #[serde(rename = "skip")]
    Skip,
    /// Play direction flips
    #[serde(rename = "reverse")]
    Reverse,
    /// Next player draws two and loses their turn
    #[serde(rename = "draw2")]
    DrawTwo,
    /// Wild: any color may be chosen
    #[serde(rename = "wild")]
    Wild,
    /// Wild draw four
    #[serde(rename = "wild4")]
    WildDrawFour,
}

impl Value {
    /// Numeral values, in order.
    pub const NUMBERS: [Value; 10] = [
        Value::Zero,
        Value::One,
        Value::Two,
        Value::Three,
        Value::Four,
        Value::Five,
        Value::Six,
        Value::Seven,
        Value::Eight,
        Value::Nine,
    ];

    /// Colored action values.
    pub const ACTIONS: [Value; 3] = [Value::Skip, Value::Reverse, Value::DrawTwo];

    /// Map a digit 0-9 to its numeral value.
    pub fn from_digit(digit: u8) -> Option<Value> {
        Self::NUMBERS.get(usize::from(digit)).copied()
    }

    /// How many cards the next player is forced to draw, if any.
    pub fn forced_draw(&self) -> Option<usize> {
        match self {
            Value::DrawTwo => Some(2),
            Value::WildDrawFour => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Value::Zero => "0",
            Value::One => "1",
            Value::Two => "2",
            Value::Three => "3",
            Value::Four => "4",
            Value::Five => "5",
            Value::Six => "6",
            Value::Seven => "7",
            Value::Eight => "8",
            Value::Nine => "9",
            Value::Skip => "skip",
            Value::Reverse => "reverse",
            Value::DrawTwo => "draw2",
            Value::Wild => "wild",
            Value::WildDrawFour => "wild4",
        };
        f.write_str(name)
    }
}

/// A single physical card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    /// Unique card identifier
    pub id: CardId,
    /// Printed color
    pub color: Color,
    /// Printed value
    pub value: Value,
}

impl Card {
    /// Create a card with a fresh identifier.
    pub fn new(color: Color, value: Value) -> Self {
        Self {
            id: CardId::new(),
            color,
            value,
        }
    }

    /// Whether this card has no color of its own.
    pub fn is_wild(&self) -> bool {
        self.color == Color::Wild
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.value)
    }
}
