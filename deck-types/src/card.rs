use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Suit {
    Hearts = 1,
    Diamonds = 2,
    Clubs = 3,
    Spades = 4,
}

impl Suit {
    /// Suit-major order used when laying out a fresh pack.
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    /// Numeric value as persisted in the `cards.suit` column.
    pub fn value(self) -> i32 {
        self as i32
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(Suit::Hearts),
            2 => Some(Suit::Diamonds),
            3 => Some(Suit::Clubs),
            4 => Some(Suit::Spades),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
            Suit::Spades => 's',
        }
    }
}

/// Card rank from 1 (ace) to 13 (king); 0 is reserved for jokers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rank(u8);

impl Rank {
    pub const JOKER: Rank = Rank(0);
    pub const JACK: Rank = Rank(11);
    pub const QUEEN: Rank = Rank(12);
    pub const KING: Rank = Rank(13);

    pub fn new(value: u8) -> Option<Self> {
        (value <= 13).then_some(Rank(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_joker(self) -> bool {
        self.0 == 0
    }

    /// Ranks 1 through 13, in the order a pack is laid out.
    pub fn standard() -> impl Iterator<Item = Rank> {
        (1..=13).map(Rank)
    }

    pub fn code(self) -> String {
        match self.0 {
            0 => "x".to_string(),
            11 => "j".to_string(),
            12 => "q".to_string(),
            13 => "k".to_string(),
            n => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub fn red_joker() -> Self {
        Self::new(Rank::JOKER, Suit::Hearts)
    }

    pub fn black_joker() -> Self {
        Self::new(Rank::JOKER, Suit::Spades)
    }

    pub fn code(&self) -> String {
        format!("{}{}", self.rank.code(), self.suit.code())
    }

    pub fn image(&self) -> String {
        format!("/static/{}.png", self.code())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// JSON shape of a card. `code` and `image` are derived from rank and suit on
/// every conversion and are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CardView {
    pub rank: String,
    pub suit: String,
    pub code: String,
    pub image: String,
}

impl From<&Card> for CardView {
    fn from(card: &Card) -> Self {
        CardView {
            rank: card.rank.code(),
            suit: card.suit.code().to_string(),
            code: card.code(),
            image: card.image(),
        }
    }
}
