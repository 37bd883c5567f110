pub mod connection;
pub mod entities;
pub mod errors;
pub mod repositories;
pub mod request_queue;

pub use errors::StorageError;
pub use repositories::{DeckRepository, StoredCard};
pub use request_queue::{StorageHandle, StorageRequest, StorageWorker};
