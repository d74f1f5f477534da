// Tab Opener Port
// The "open tab for URL" capability of the consumer host

use async_trait::async_trait;
use thiserror::Error;

/// Failure to open one link; never aborts the rest of a batch
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("Refusing to open {0}: not an http(s) link")]
    Rejected(String),

    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    #[error("Opener exited with status {0}")]
    NonZeroExit(i32),

    #[error("Opener timed out after {0}ms")]
    Timeout(u64),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TabOpener: Send + Sync {
    /// Open `url` in a new background tab
    async fn open(&self, url: &str) -> Result<(), OpenError>;
}
