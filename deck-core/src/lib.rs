pub mod card_code;
pub mod pack;
pub mod shuffle;

// Re-export main components
pub use card_code::*;
pub use pack::*;
pub use shuffle::*;
