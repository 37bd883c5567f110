use deck_types::{Card, Rank, Suit};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardCodeError {
    #[error("Invalid suit in card code '{0}'")]
    InvalidSuit(String),
    #[error("Invalid rank in card code '{0}'")]
    InvalidRank(String),
}

/// Decode a card code such as `1h`, `10S`, `qd` or `xs`.
///
/// The final character selects the suit (`h`, `d`, `c`, `s`), the prefix
/// selects the rank: `1`-`13`, or `j`, `q`, `k` and `x` for jack, queen, king
/// and joker. Matching is case-insensitive. Jokers only come in hearts (red)
/// and spades (black).
pub fn parse_card_code(code: &str) -> Result<Card, CardCodeError> {
    let code = code.trim();
    let Some(suit_char) = code.chars().last() else {
        return Err(CardCodeError::InvalidSuit(code.to_string()));
    };

    let suit = match suit_char.to_ascii_lowercase() {
        'h' => Suit::Hearts,
        'd' => Suit::Diamonds,
        'c' => Suit::Clubs,
        's' => Suit::Spades,
        _ => return Err(CardCodeError::InvalidSuit(code.to_string())),
    };

    let rank_str = code[..code.len() - suit_char.len_utf8()].to_ascii_lowercase();
    let rank = match rank_str.as_str() {
        "j" => Rank::JACK,
        "q" => Rank::QUEEN,
        "k" => Rank::KING,
        "x" => Rank::JOKER,
        digits => digits
            .parse::<u8>()
            .ok()
            .filter(|value| *value >= 1)
            .and_then(Rank::new)
            .ok_or_else(|| CardCodeError::InvalidRank(code.to_string()))?,
    };

    if rank.is_joker() && !matches!(suit, Suit::Hearts | Suit::Spades) {
        return Err(CardCodeError::InvalidSuit(code.to_string()));
    }

    Ok(Card::new(rank, suit))
}

/// Decode a comma separated list of card codes. Fails on the first bad code
/// so callers can reject the whole list before touching any deck.
pub fn parse_card_list(codes: &str) -> Result<Vec<Card>, CardCodeError> {
    codes.split(',').map(parse_card_code).collect()
}
