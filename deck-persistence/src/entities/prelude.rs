pub use super::cards::Entity as Cards;
pub use super::decks::Entity as Decks;
