// Poll scheduler timing defaults
use std::time::Duration;

/// Normal cadence (60s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Delay before the first normal poll after (re)arming (3s)
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(3);

/// Turbo cadence (10s)
pub const DEFAULT_TURBO_INTERVAL: Duration = Duration::from_secs(10);

/// How long one turbo activation lasts (5 minutes)
pub const DEFAULT_TURBO_DURATION: Duration = Duration::from_secs(5 * 60);
