use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{CardView, DeckId};

/// Reply for deck-level operations (create, add, shuffle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeckResponse {
    pub deck_id: DeckId,
    pub remaining: u64,
}

/// Reply for draw and show operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawResponse {
    pub deck_id: DeckId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<CardView>,
    pub remaining: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Card, Rank, Suit};

    #[test]
    fn test_empty_draw_omits_cards() {
        let response = DrawResponse {
            deck_id: "abc".to_string(),
            cards: Vec::new(),
            remaining: 0,
            error: Some("Deck is empty".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("cards").is_none());
        assert_eq!(json["error"], "Deck is empty");
        assert_eq!(json["remaining"], 0);
    }

    #[test]
    fn test_draw_serializes_card_views() {
        let response = DrawResponse {
            deck_id: "abc".to_string(),
            cards: vec![CardView::from(&Card::new(Rank::KING, Suit::Clubs))],
            remaining: 51,
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["cards"][0]["code"], "kc");
        assert_eq!(json["cards"][0]["image"], "/static/kc.png");
        assert!(json.get("error").is_none());
    }
}
