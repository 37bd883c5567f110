pub mod deck_repository;

pub use deck_repository::{DeckRepository, StoredCard};
