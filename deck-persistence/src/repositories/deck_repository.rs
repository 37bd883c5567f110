use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{debug, warn};

use crate::entities::{cards, decks, prelude::*};
use crate::errors::StorageError;
use deck_core::{CardSlot, ShufflePlanner};
use deck_types::{Card, Rank, Suit};

/// SQLite binds LIMIT as a signed 64-bit integer.
fn row_limit(count: u64) -> u64 {
    count.min(i64::MAX as u64)
}

fn deck_model(deck_id: &str) -> decks::ActiveModel {
    decks::ActiveModel {
        id: ActiveValue::Set(deck_id.to_string()),
    }
}

fn card_model(deck_id: &str, card: Card, position: i64) -> cards::ActiveModel {
    cards::ActiveModel {
        id: ActiveValue::NotSet,
        deck_id: ActiveValue::Set(deck_id.to_string()),
        rank: ActiveValue::Set(i32::from(card.rank.value())),
        suit: ActiveValue::Set(card.suit.value()),
        position: ActiveValue::Set(position),
        drawn_at: ActiveValue::Set(None),
    }
}

/// A card as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCard {
    pub card: Card,
    pub position: i64,
    pub drawn_at: Option<DateTime<Utc>>,
}

/// Durable decks and cards.
///
/// The repository does no locking of its own: every method assumes it is the
/// only code touching the tables, which `StorageWorker` guarantees by owning
/// the one instance.
pub struct DeckRepository {
    db: DatabaseConnection,
    planner: ShufflePlanner,
    rng: StdRng,
    last_drawn_at: Option<DateTime<Utc>>,
    draw_clock_loaded: bool,
}

impl DeckRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_planner(db, ShufflePlanner::default(), StdRng::from_entropy())
    }

    pub fn with_planner(db: DatabaseConnection, planner: ShufflePlanner, rng: StdRng) -> Self {
        Self {
            db,
            planner,
            rng,
            last_drawn_at: None,
            draw_clock_loaded: false,
        }
    }

    /// Replace the shuffle planner, keeping the entropy-seeded RNG.
    pub fn with_shuffle_planner(mut self, planner: ShufflePlanner) -> Self {
        self.planner = planner;
        self
    }

    fn model_to_card(model: cards::Model) -> Result<StoredCard, StorageError> {
        let rank = u8::try_from(model.rank).ok().and_then(Rank::new);
        let suit = Suit::from_value(model.suit);

        match (rank, suit) {
            (Some(rank), Some(suit)) => Ok(StoredCard {
                card: Card::new(rank, suit),
                position: model.position,
                drawn_at: model.drawn_at,
            }),
            _ => Err(StorageError::CorruptCard { id: model.id }),
        }
    }

    fn models_to_cards(models: Vec<cards::Model>) -> Result<Vec<StoredCard>, StorageError> {
        models.into_iter().map(Self::model_to_card).collect()
    }

    pub async fn create_deck(&self, deck_id: &str) -> Result<(), StorageError> {
        Decks::insert(deck_model(deck_id))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Insert the deck row and every card of its layout in one transaction.
    /// A failed insert leaves neither the deck nor any of its cards behind.
    pub async fn create_deck_with_cards(
        &self,
        deck_id: &str,
        slots: &[CardSlot],
    ) -> Result<(), StorageError> {
        let txn = self.db.begin().await?;
        Decks::insert(deck_model(deck_id))
            .exec_without_returning(&txn)
            .await?;
        for slot in slots {
            Cards::insert(card_model(deck_id, slot.card, slot.position))
                .exec_without_returning(&txn)
                .await?;
        }
        txn.commit().await?;

        debug!("Created deck {} with {} cards", deck_id, slots.len());
        Ok(())
    }

    /// Storage errors count as "does not exist".
    pub async fn deck_exists(&self, deck_id: &str) -> bool {
        match Decks::find_by_id(deck_id.to_string()).one(&self.db).await {
            Ok(deck) => deck.is_some(),
            Err(err) => {
                warn!("Failed to look up deck {}: {}", deck_id, err);
                false
            }
        }
    }

    pub async fn create_card(
        &self,
        deck_id: &str,
        card: Card,
        position: i64,
    ) -> Result<(), StorageError> {
        Cards::insert(card_model(deck_id, card, position))
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Count of undrawn cards. Storage errors count as an empty deck.
    pub async fn remaining_cards(&self, deck_id: &str) -> u64 {
        let count = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .filter(cards::Column::DrawnAt.is_null())
            .count(&self.db)
            .await;

        match count {
            Ok(count) => count,
            Err(err) => {
                warn!("Failed to count remaining cards of deck {}: {}", deck_id, err);
                0
            }
        }
    }

    /// Highest position among all cards of the deck, drawn or not; 0 when the
    /// deck has no cards.
    pub async fn highest_position(&self, deck_id: &str) -> Result<i64, StorageError> {
        let top = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .order_by_desc(cards::Column::Position)
            .one(&self.db)
            .await?;

        Ok(top.map(|model| model.position).unwrap_or(0))
    }

    /// Insert a card on top of the deck and return the position it was given.
    pub async fn add_card(&self, deck_id: &str, card: Card) -> Result<i64, StorageError> {
        let position = self.highest_position(deck_id).await? + 1;
        self.create_card(deck_id, card, position).await?;
        Ok(position)
    }

    /// Draw up to `count` cards from the top (highest position first). A deck
    /// with fewer undrawn cards yields a short, possibly empty, draw.
    pub async fn draw_cards(
        &mut self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        let drawn_at = self.next_draw_timestamp().await?;

        let txn = self.db.begin().await?;
        let selected = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .filter(cards::Column::DrawnAt.is_null())
            .order_by_desc(cards::Column::Position)
            .order_by_desc(cards::Column::Id)
            .limit(row_limit(count))
            .all(&txn)
            .await?;

        if selected.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = selected.iter().map(|model| model.id).collect();
        Cards::update_many()
            .col_expr(cards::Column::DrawnAt, Expr::value(drawn_at))
            .filter(cards::Column::Id.is_in(ids))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        self.last_drawn_at = Some(drawn_at);
        debug!("Drew {} cards from deck {}", selected.len(), deck_id);

        selected
            .into_iter()
            .map(|model| {
                Self::model_to_card(cards::Model {
                    drawn_at: Some(drawn_at),
                    ..model
                })
            })
            .collect()
    }

    /// Timestamp for the next draw, strictly later than any earlier draw even
    /// if the wall clock stepped backwards.
    async fn next_draw_timestamp(&mut self) -> Result<DateTime<Utc>, StorageError> {
        if !self.draw_clock_loaded {
            let latest = Cards::find()
                .filter(cards::Column::DrawnAt.is_not_null())
                .order_by_desc(cards::Column::DrawnAt)
                .one(&self.db)
                .await?;
            self.last_drawn_at = latest.and_then(|model| model.drawn_at);
            self.draw_clock_loaded = true;
        }

        let now = Utc::now();
        Ok(match self.last_drawn_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        })
    }

    /// Give every undrawn card of the deck a fresh random position. The
    /// planner repairs collisions before anything is written.
    pub async fn shuffle_deck(&mut self, deck_id: &str) -> Result<(), StorageError> {
        let undrawn = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .filter(cards::Column::DrawnAt.is_null())
            .order_by_asc(cards::Column::Id)
            .all(&self.db)
            .await?;

        let plan = self.planner.plan(&mut self.rng, undrawn.len())?;

        let txn = self.db.begin().await?;
        for (model, position) in undrawn.iter().zip(plan.positions) {
            Cards::update_many()
                .col_expr(cards::Column::Position, Expr::value(position))
                .filter(cards::Column::Id.eq(model.id))
                .exec(&txn)
                .await?;
        }
        txn.commit().await?;

        debug!(
            "Shuffled {} cards of deck {} in {} attempt(s){}",
            undrawn.len(),
            deck_id,
            plan.attempts,
            if plan.used_fallback { " using fallback" } else { "" }
        );
        Ok(())
    }

    /// The `count` most recently drawn cards, oldest first. Cards drawn
    /// together are listed in the order they left the deck.
    pub async fn drawn_cards(
        &self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        let mut models = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .filter(cards::Column::DrawnAt.is_not_null())
            .order_by_desc(cards::Column::DrawnAt)
            .order_by_asc(cards::Column::Position)
            .limit(row_limit(count))
            .all(&self.db)
            .await?;
        models.reverse();

        Self::models_to_cards(models)
    }

    /// The `count` cards the next draw would return, in draw order.
    pub async fn coming_cards(
        &self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        let models = Cards::find()
            .filter(cards::Column::DeckId.eq(deck_id))
            .filter(cards::Column::DrawnAt.is_null())
            .order_by_desc(cards::Column::Position)
            .order_by_desc(cards::Column::Id)
            .limit(row_limit(count))
            .all(&self.db)
            .await?;

        Self::models_to_cards(models)
    }
}
