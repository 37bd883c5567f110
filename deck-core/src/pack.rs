use deck_types::{Card, Rank, Suit};

pub const CARDS_PER_PACK: usize = 52;
pub const JOKERS_PER_PACK: usize = 2;

/// A card together with the position it is inserted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSlot {
    pub card: Card,
    pub position: i64,
}

/// Lay out the cards of a new deck.
///
/// Each pack is emitted suit-major (hearts, diamonds, clubs, spades) and
/// rank-minor (1 to 13). With jokers, a red and a black joker follow each
/// pack's 52 cards. Positions start at 0 and increase by one per card.
pub fn pack_layout(pack_count: u32, include_jokers: bool) -> Vec<CardSlot> {
    let mut slots = Vec::with_capacity(deck_size(pack_count, include_jokers));
    let mut position = 0i64;

    let mut push = |card: Card| {
        slots.push(CardSlot { card, position });
        position += 1;
    };

    for _ in 0..pack_count {
        for suit in Suit::ALL {
            for rank in Rank::standard() {
                push(Card::new(rank, suit));
            }
        }
        if include_jokers {
            push(Card::red_joker());
            push(Card::black_joker());
        }
    }

    slots
}

/// Number of cards `pack_layout` produces.
pub fn deck_size(pack_count: u32, include_jokers: bool) -> usize {
    let per_pack = CARDS_PER_PACK + if include_jokers { JOKERS_PER_PACK } else { 0 };
    per_pack * pack_count as usize
}
