// Application Layer - Use Cases and Business Logic

pub mod consumer_state;
pub mod delivery;
pub mod maintenance;
pub mod poll_scheduler;
pub mod queue_store;
mod shutdown;

// Re-exports
pub use consumer_state::ConsumerState;
pub use delivery::{DeliveryService, DocsInfo, EnqueueOutcome, PollOutcome};
pub use maintenance::MaintenanceScheduler;
pub use poll_scheduler::{PollScheduler, PollSchedulerConfig};
pub use queue_store::QueueStore;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
