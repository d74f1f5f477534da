// Consumer-side Domain Model
// State persisted by one consumer installation

use serde::{Deserialize, Serialize};

/// Keys of the consumer's persisted state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Token,
    BaseUrl,
    TurboEnd,
    OpenCount,
    LastLink,
}

impl StateKey {
    pub const ALL: [StateKey; 5] = [
        StateKey::Token,
        StateKey::BaseUrl,
        StateKey::TurboEnd,
        StateKey::OpenCount,
        StateKey::LastLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Token => "token",
            StateKey::BaseUrl => "base_url",
            StateKey::TurboEnd => "turbo_end_ms",
            StateKey::OpenCount => "open_count",
            StateKey::LastLink => "last_link",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active turbo polling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurboWindow {
    pub end_time_ms: i64,
}

impl TurboWindow {
    pub fn starting_at(now_ms: i64, duration_ms: i64) -> Self {
        Self {
            end_time_ms: now_ms.saturating_add(duration_ms),
        }
    }

    pub fn is_active(&self, now_ms: i64) -> bool {
        now_ms < self.end_time_ms
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        (self.end_time_ms - now_ms).max(0)
    }
}

/// Delivery counters shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenStats {
    pub count: u64,
    pub last_link: Option<String>,
}
