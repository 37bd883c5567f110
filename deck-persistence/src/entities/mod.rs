pub mod prelude;

pub mod cards;
pub mod decks;
