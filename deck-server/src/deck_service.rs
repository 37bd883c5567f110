use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use deck_core::pack_layout;
use deck_persistence::{StorageError, StorageHandle, StoredCard};
use deck_types::{Card, DeckId, DeckResponse};

type IdGenerator = Arc<dyn Fn() -> DeckId + Send + Sync>;

/// Deck operations for the transport layer. Every call goes through the
/// storage worker, so the service itself holds no mutable state.
#[derive(Clone)]
pub struct DeckService {
    storage: StorageHandle,
    next_id: IdGenerator,
}

impl DeckService {
    pub fn new(storage: StorageHandle) -> Self {
        Self::with_id_generator(storage, Arc::new(|| Uuid::new_v4().to_string()))
    }

    pub fn with_id_generator(storage: StorageHandle, next_id: IdGenerator) -> Self {
        Self { storage, next_id }
    }

    /// Create a deck of `pack_count` packs, optionally with two jokers per
    /// pack, and return its identifier. The deck row and all of its cards
    /// are written in one storage request, so a failure leaves nothing behind.
    pub async fn create_deck(
        &self,
        pack_count: u32,
        include_jokers: bool,
    ) -> Result<DeckId, StorageError> {
        let slots = pack_layout(pack_count, include_jokers);
        let card_count = slots.len();

        loop {
            let candidate = (self.next_id)();
            if self.storage.deck_exists(&candidate).await {
                debug!("Deck id {} already in use", candidate);
                continue;
            }

            match self
                .storage
                .create_deck_with_cards(&candidate, slots.clone())
                .await
            {
                Ok(()) => {
                    info!(
                        "Created deck {} with {} pack(s), {} cards{}",
                        candidate,
                        pack_count,
                        card_count,
                        if include_jokers { " including jokers" } else { "" }
                    );
                    return Ok(candidate);
                }
                Err(StorageError::DuplicateKey(_)) => {
                    warn!("Deck id {} was taken on insert, regenerating", candidate);
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn deck_exists(&self, deck_id: &str) -> bool {
        self.storage.deck_exists(deck_id).await
    }

    /// Put a card on top of the deck. Returns the position it was given.
    pub async fn add_card(&self, deck_id: &str, card: Card) -> Result<i64, StorageError> {
        self.storage.add_card(deck_id, card).await
    }

    pub async fn draw_cards(&self, deck_id: &str, count: u64) -> Result<Vec<Card>, StorageError> {
        let drawn = self.storage.draw_cards(deck_id, count).await?;
        Ok(into_cards(drawn))
    }

    pub async fn shuffle_deck(&self, deck_id: &str) -> Result<(), StorageError> {
        self.storage.shuffle_deck(deck_id).await
    }

    pub async fn remaining_cards(&self, deck_id: &str) -> u64 {
        self.storage.remaining_cards(deck_id).await
    }

    pub async fn drawn_cards(&self, deck_id: &str, count: u64) -> Result<Vec<Card>, StorageError> {
        let drawn = self.storage.drawn_cards(deck_id, count).await?;
        Ok(into_cards(drawn))
    }

    pub async fn coming_cards(&self, deck_id: &str, count: u64) -> Result<Vec<Card>, StorageError> {
        let coming = self.storage.coming_cards(deck_id, count).await?;
        Ok(into_cards(coming))
    }

    pub async fn deck_summary(&self, deck_id: &str) -> DeckResponse {
        DeckResponse {
            deck_id: deck_id.to_string(),
            remaining: self.remaining_cards(deck_id).await,
        }
    }
}

fn into_cards(stored: Vec<StoredCard>) -> Vec<Card> {
    stored.into_iter().map(|stored| stored.card).collect()
}
