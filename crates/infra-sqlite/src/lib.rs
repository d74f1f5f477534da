// linkrelay Infrastructure - SQLite Adapter
// Implements: SortedSetStore, Maintenance

mod connection;
mod maintenance_impl;
mod migration;
mod sorted_set;

pub use connection::create_pool;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;
pub use sorted_set::SqliteSortedSetStore;

// sqlx::Error cannot implement From for AppError here (orphan rule);
// it is mapped in helper functions instead
