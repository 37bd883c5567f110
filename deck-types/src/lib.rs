pub mod card;
pub mod errors;
pub mod messages;

// Re-export all types
pub use card::*;
pub use errors::*;
pub use messages::*;

pub type DeckId = String;
