// linkrelay Infrastructure - Consumer System Adapters
// Implements: TabOpener, StateStore

pub mod browser_opener;
pub mod file_state_store;

pub use browser_opener::SystemTabOpener;
pub use file_state_store::FileStateStore;
