// linkrelay Infrastructure - Upstash REST Adapter
// Implements: SortedSetStore over the Redis-over-HTTP command protocol

mod command;
mod config;
mod sorted_set;

pub use command::Command;
pub use config::UpstashConfig;
pub use sorted_set::UpstashSortedSetStore;
