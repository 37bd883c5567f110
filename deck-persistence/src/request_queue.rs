//! Single-writer access to deck storage.
//!
//! `StorageWorker` owns the only `DeckRepository` and executes queued
//! `StorageRequest`s one at a time in arrival order. Callers hold a cheap
//! cloneable `StorageHandle`; each call enqueues a request carrying a private
//! reply channel and waits on it. Because a request runs to completion before
//! the next one is dequeued, multi-step operations such as `add_card` (read the
//! highest position, then insert above it) never interleave. A request that
//! panics is dropped without a reply and the worker moves on to the next one.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::errors::StorageError;
use crate::repositories::{DeckRepository, StoredCard};
use deck_core::CardSlot;
use deck_types::{Card, DeckId};

type Reply<T> = oneshot::Sender<Result<T, StorageError>>;

#[derive(Debug)]
pub enum StorageRequest {
    CreateDeck {
        deck_id: DeckId,
        reply: Reply<()>,
    },
    CreateDeckWithCards {
        deck_id: DeckId,
        slots: Vec<CardSlot>,
        reply: Reply<()>,
    },
    DeckExists {
        deck_id: DeckId,
        reply: oneshot::Sender<bool>,
    },
    CreateCard {
        deck_id: DeckId,
        card: Card,
        position: i64,
        reply: Reply<()>,
    },
    RemainingCards {
        deck_id: DeckId,
        reply: oneshot::Sender<u64>,
    },
    AddCard {
        deck_id: DeckId,
        card: Card,
        reply: Reply<i64>,
    },
    HighestPosition {
        deck_id: DeckId,
        reply: Reply<i64>,
    },
    DrawCards {
        deck_id: DeckId,
        count: u64,
        reply: Reply<Vec<StoredCard>>,
    },
    ShuffleDeck {
        deck_id: DeckId,
        reply: Reply<()>,
    },
    DrawnCards {
        deck_id: DeckId,
        count: u64,
        reply: Reply<Vec<StoredCard>>,
    },
    ComingCards {
        deck_id: DeckId,
        count: u64,
        reply: Reply<Vec<StoredCard>>,
    },
}

impl StorageRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            StorageRequest::CreateDeck { .. } => "create_deck",
            StorageRequest::CreateDeckWithCards { .. } => "create_deck_with_cards",
            StorageRequest::DeckExists { .. } => "deck_exists",
            StorageRequest::CreateCard { .. } => "create_card",
            StorageRequest::RemainingCards { .. } => "remaining_cards",
            StorageRequest::AddCard { .. } => "add_card",
            StorageRequest::HighestPosition { .. } => "highest_position",
            StorageRequest::DrawCards { .. } => "draw_cards",
            StorageRequest::ShuffleDeck { .. } => "shuffle_deck",
            StorageRequest::DrawnCards { .. } => "drawn_cards",
            StorageRequest::ComingCards { .. } => "coming_cards",
        }
    }

    pub fn deck_id(&self) -> &str {
        match self {
            StorageRequest::CreateDeck { deck_id, .. }
            | StorageRequest::CreateDeckWithCards { deck_id, .. }
            | StorageRequest::DeckExists { deck_id, .. }
            | StorageRequest::CreateCard { deck_id, .. }
            | StorageRequest::RemainingCards { deck_id, .. }
            | StorageRequest::AddCard { deck_id, .. }
            | StorageRequest::HighestPosition { deck_id, .. }
            | StorageRequest::DrawCards { deck_id, .. }
            | StorageRequest::ShuffleDeck { deck_id, .. }
            | StorageRequest::DrawnCards { deck_id, .. }
            | StorageRequest::ComingCards { deck_id, .. } => deck_id,
        }
    }
}

pub struct StorageWorker {
    repository: DeckRepository,
    receiver: mpsc::UnboundedReceiver<StorageRequest>,
}

impl StorageWorker {
    pub fn new(repository: DeckRepository) -> (Self, StorageHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Self {
            repository,
            receiver,
        };
        (worker, StorageHandle { sender })
    }

    /// Start the worker on the current tokio runtime.
    pub fn spawn(repository: DeckRepository) -> StorageHandle {
        let (worker, handle) = Self::new(repository);
        tokio::spawn(worker.run());
        handle
    }

    /// Process requests until every handle has been dropped.
    pub async fn run(mut self) {
        info!("Storage worker started");
        while let Some(request) = self.receiver.recv().await {
            let operation = request.operation();
            let deck_id = request.deck_id().to_string();

            if AssertUnwindSafe(self.execute(request))
                .catch_unwind()
                .await
                .is_err()
            {
                error!("Storage request {} for deck {} panicked", operation, deck_id);
            }
        }
        info!("Storage worker stopped: no handles left");
    }

    async fn execute(&mut self, request: StorageRequest) {
        let operation = request.operation();
        debug!("Executing {} for deck {}", operation, request.deck_id());

        let repository = &mut self.repository;
        match request {
            StorageRequest::CreateDeck { deck_id, reply } => {
                respond(reply, repository.create_deck(&deck_id).await, operation);
            }
            StorageRequest::CreateDeckWithCards {
                deck_id,
                slots,
                reply,
            } => {
                let result = repository.create_deck_with_cards(&deck_id, &slots).await;
                respond(reply, result, operation);
            }
            StorageRequest::DeckExists { deck_id, reply } => {
                respond(reply, repository.deck_exists(&deck_id).await, operation);
            }
            StorageRequest::CreateCard {
                deck_id,
                card,
                position,
                reply,
            } => {
                let result = repository.create_card(&deck_id, card, position).await;
                respond(reply, result, operation);
            }
            StorageRequest::RemainingCards { deck_id, reply } => {
                respond(reply, repository.remaining_cards(&deck_id).await, operation);
            }
            StorageRequest::AddCard {
                deck_id,
                card,
                reply,
            } => {
                respond(reply, repository.add_card(&deck_id, card).await, operation);
            }
            StorageRequest::HighestPosition { deck_id, reply } => {
                respond(reply, repository.highest_position(&deck_id).await, operation);
            }
            StorageRequest::DrawCards {
                deck_id,
                count,
                reply,
            } => {
                respond(reply, repository.draw_cards(&deck_id, count).await, operation);
            }
            StorageRequest::ShuffleDeck { deck_id, reply } => {
                respond(reply, repository.shuffle_deck(&deck_id).await, operation);
            }
            StorageRequest::DrawnCards {
                deck_id,
                count,
                reply,
            } => {
                respond(reply, repository.drawn_cards(&deck_id, count).await, operation);
            }
            StorageRequest::ComingCards {
                deck_id,
                count,
                reply,
            } => {
                respond(reply, repository.coming_cards(&deck_id, count).await, operation);
            }
        }
    }
}

/// Deliver a reply. A caller that stopped waiting simply never reads it.
fn respond<T>(reply: oneshot::Sender<T>, value: T, operation: &str) {
    if reply.send(value).is_err() {
        debug!("Caller of {} went away before its reply", operation);
    }
}

/// Cloneable entry point to the storage worker.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    sender: mpsc::UnboundedSender<StorageRequest>,
}

impl StorageHandle {
    /// Enqueue a request without waiting for its reply.
    pub fn submit(&self, request: StorageRequest) -> Result<(), StorageError> {
        self.sender
            .send(request)
            .map_err(|_| StorageError::WorkerUnavailable)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> StorageRequest,
    ) -> Result<T, StorageError> {
        let (reply, response) = oneshot::channel();
        self.submit(build(reply))?;
        response.await.map_err(|_| {
            if self.sender.is_closed() {
                StorageError::WorkerUnavailable
            } else {
                StorageError::RequestAborted
            }
        })
    }

    pub async fn create_deck(&self, deck_id: &str) -> Result<(), StorageError> {
        self.request(|reply| StorageRequest::CreateDeck {
            deck_id: deck_id.to_string(),
            reply,
        })
        .await?
    }

    /// Create a deck together with its cards. Either all of it is stored or
    /// none of it is.
    pub async fn create_deck_with_cards(
        &self,
        deck_id: &str,
        slots: Vec<CardSlot>,
    ) -> Result<(), StorageError> {
        self.request(|reply| StorageRequest::CreateDeckWithCards {
            deck_id: deck_id.to_string(),
            slots,
            reply,
        })
        .await?
    }

    /// `false` when the worker cannot be reached.
    pub async fn deck_exists(&self, deck_id: &str) -> bool {
        self.request(|reply| StorageRequest::DeckExists {
            deck_id: deck_id.to_string(),
            reply,
        })
        .await
        .unwrap_or_else(|err| {
            warn!("deck_exists for {} failed: {}", deck_id, err);
            false
        })
    }

    pub async fn create_card(
        &self,
        deck_id: &str,
        card: Card,
        position: i64,
    ) -> Result<(), StorageError> {
        self.request(|reply| StorageRequest::CreateCard {
            deck_id: deck_id.to_string(),
            card,
            position,
            reply,
        })
        .await?
    }

    /// 0 when the worker cannot be reached.
    pub async fn remaining_cards(&self, deck_id: &str) -> u64 {
        self.request(|reply| StorageRequest::RemainingCards {
            deck_id: deck_id.to_string(),
            reply,
        })
        .await
        .unwrap_or_else(|err| {
            warn!("remaining_cards for {} failed: {}", deck_id, err);
            0
        })
    }

    pub async fn add_card(&self, deck_id: &str, card: Card) -> Result<i64, StorageError> {
        self.request(|reply| StorageRequest::AddCard {
            deck_id: deck_id.to_string(),
            card,
            reply,
        })
        .await?
    }

    pub async fn highest_position(&self, deck_id: &str) -> Result<i64, StorageError> {
        self.request(|reply| StorageRequest::HighestPosition {
            deck_id: deck_id.to_string(),
            reply,
        })
        .await?
    }

    pub async fn draw_cards(
        &self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        self.request(|reply| StorageRequest::DrawCards {
            deck_id: deck_id.to_string(),
            count,
            reply,
        })
        .await?
    }

    pub async fn shuffle_deck(&self, deck_id: &str) -> Result<(), StorageError> {
        self.request(|reply| StorageRequest::ShuffleDeck {
            deck_id: deck_id.to_string(),
            reply,
        })
        .await?
    }

    pub async fn drawn_cards(
        &self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        self.request(|reply| StorageRequest::DrawnCards {
            deck_id: deck_id.to_string(),
            count,
            reply,
        })
        .await?
    }

    pub async fn coming_cards(
        &self,
        deck_id: &str,
        count: u64,
    ) -> Result<Vec<StoredCard>, StorageError> {
        self.request(|reply| StorageRequest::ComingCards {
            deck_id: deck_id.to_string(),
            count,
            reply,
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use deck_core::pack_layout;
    use migration::{Migrator, MigratorTrait};

    async fn setup_worker() -> StorageHandle {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        StorageWorker::spawn(DeckRepository::new(db))
    }

    async fn create_standard_deck(handle: &StorageHandle, deck_id: &str) {
        handle.create_deck(deck_id).await.unwrap();
        for slot in pack_layout(1, false) {
            handle
                .create_card(deck_id, slot.card, slot.position)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_requests_round_trip_through_worker() {
        let handle = setup_worker().await;

        assert!(!handle.deck_exists("deck-1").await);
        create_standard_deck(&handle, "deck-1").await;
        assert!(handle.deck_exists("deck-1").await);
        assert_eq!(handle.remaining_cards("deck-1").await, 52);
        assert_eq!(handle.highest_position("deck-1").await.unwrap(), 51);
    }

    #[tokio::test]
    async fn test_requests_are_served_in_arrival_order() {
        let handle = setup_worker().await;
        create_standard_deck(&handle, "deck-1").await;

        // Queue three draws back to back before awaiting any reply
        let mut responses = Vec::new();
        for _ in 0..3 {
            let (reply, response) = oneshot::channel();
            handle
                .submit(StorageRequest::DrawCards {
                    deck_id: "deck-1".to_string(),
                    count: 1,
                    reply,
                })
                .unwrap();
            responses.push(response);
        }

        let mut positions = Vec::new();
        let mut timestamps = Vec::new();
        for response in responses {
            let cards = response.await.unwrap().unwrap();
            positions.push(cards[0].position);
            timestamps.push(cards[0].drawn_at.unwrap());
        }

        assert_eq!(positions, vec![51, 50, 49]);
        assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[tokio::test]
    async fn test_failed_request_does_not_stop_worker() {
        let handle = setup_worker().await;

        let err = handle
            .create_card("missing", Card::red_joker(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation(_)));

        handle.create_deck("deck-1").await.unwrap();
        let err = handle.create_deck("deck-1").await.unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));

        assert!(handle.deck_exists("deck-1").await);
    }

    #[tokio::test]
    async fn test_huge_counts_keep_worker_alive() {
        let handle = setup_worker().await;
        create_standard_deck(&handle, "deck-1").await;

        let coming = handle.coming_cards("deck-1", u64::MAX).await.unwrap();
        assert_eq!(coming.len(), 52);
        let drawn = handle.draw_cards("deck-1", u64::MAX).await.unwrap();
        assert_eq!(drawn.len(), 52);
        let history = handle.drawn_cards("deck-1", u64::MAX).await.unwrap();
        assert_eq!(history.len(), 52);

        // Later requests, on any deck, are still served
        handle.create_deck("deck-2").await.unwrap();
        assert!(handle.deck_exists("deck-2").await);
        assert_eq!(handle.remaining_cards("deck-1").await, 0);
    }

    #[tokio::test]
    async fn test_create_deck_with_cards_in_one_request() {
        let handle = setup_worker().await;

        handle
            .create_deck_with_cards("deck-1", pack_layout(1, true))
            .await
            .unwrap();
        assert_eq!(handle.remaining_cards("deck-1").await, 54);
        assert_eq!(handle.highest_position("deck-1").await.unwrap(), 53);

        let err = handle
            .create_deck_with_cards("deck-1", pack_layout(1, true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
        assert_eq!(handle.remaining_cards("deck-1").await, 54);
    }

    #[tokio::test]
    async fn test_abandoned_reply_is_discarded() {
        let handle = setup_worker().await;
        create_standard_deck(&handle, "deck-1").await;

        let (reply, response) = oneshot::channel();
        handle
            .submit(StorageRequest::DrawCards {
                deck_id: "deck-1".to_string(),
                count: 2,
                reply,
            })
            .unwrap();
        drop(response);

        // The abandoned draw still happened, and the worker keeps serving
        assert_eq!(handle.remaining_cards("deck-1").await, 50);
    }

    #[tokio::test]
    async fn test_concurrent_add_cards_get_distinct_positions() {
        let handle = setup_worker().await;
        create_standard_deck(&handle, "deck-1").await;

        let mut tasks = Vec::new();
        for _ in 0..25 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.add_card("deck-1", Card::black_joker()).await
            }));
        }

        let mut positions = Vec::new();
        for task in tasks {
            positions.push(task.await.unwrap().unwrap());
        }
        positions.sort();

        assert_eq!(positions, (52..77).collect::<Vec<i64>>());
        assert_eq!(handle.remaining_cards("deck-1").await, 77);
    }

    #[tokio::test]
    async fn test_stopped_worker_is_reported() {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let (worker, handle) = StorageWorker::new(DeckRepository::new(db));
        drop(worker);

        let err = handle.create_deck("deck-1").await.unwrap_err();
        assert!(matches!(err, StorageError::WorkerUnavailable));
        assert!(!handle.deck_exists("deck-1").await);
        assert_eq!(handle.remaining_cards("deck-1").await, 0);
    }
}
