// Domain Layer - Pure business logic and entities

pub mod consumer;
pub mod error;
pub mod link;
pub mod queue;
pub mod token;

// Re-exports
pub use consumer::{OpenStats, StateKey, TurboWindow};
pub use error::DomainError;
pub use link::{extract_from_request, normalize, parse_many, LinkInput, QueryParams};
pub use queue::{QueueItem, QueueSettings};
pub use token::{Token, TokenFormat};
