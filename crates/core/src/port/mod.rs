// Port Layer - Interfaces for external dependencies

pub mod delivery_client; // consumer -> server
pub mod maintenance;
pub mod sorted_set;
pub mod state_store;
pub mod tab_opener;
pub mod time_provider;

// Re-exports
pub use delivery_client::DeliveryClient;
pub use maintenance::{Maintenance, MaintenanceStats};
pub use sorted_set::SortedSetStore;
pub use state_store::StateStore;
pub use tab_opener::{OpenError, TabOpener};
pub use time_provider::TimeProvider;
