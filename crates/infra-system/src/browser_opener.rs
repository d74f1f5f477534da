// OS browser launcher
use async_trait::async_trait;
use linkrelay_core::domain::normalize;
use linkrelay_core::port::{OpenError, TabOpener};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Launcher exits almost immediately; anything slower is stuck
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens links with the platform's URL handler
///
/// The URL is always passed as the final argument, never through a shell.
pub struct SystemTabOpener {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SystemTabOpener {
    /// `open` on macOS, the URL protocol handler on Windows, `xdg-open` elsewhere
    pub fn for_current_os() -> Self {
        if cfg!(target_os = "macos") {
            Self::with_command("open", Vec::<String>::new())
        } else if cfg!(windows) {
            Self::with_command("rundll32", ["url.dll,FileProtocolHandler"])
        } else {
            Self::with_command("xdg-open", Vec::<String>::new())
        }
    }

    /// Custom launcher, e.g. a specific browser binary
    pub fn with_command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TabOpener for SystemTabOpener {
    async fn open(&self, url: &str) -> Result<(), OpenError> {
        // Links come from a remote server; only web links reach the launcher
        let url = normalize(url).ok_or_else(|| OpenError::Rejected(url.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OpenError::LaunchFailed(format!("{}: {}", self.program, e)))?;

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(OpenError::LaunchFailed(e.to_string())),
            Err(_) => return Err(OpenError::Timeout(self.timeout.as_millis() as u64)),
        };

        if !status.success() {
            return Err(OpenError::NonZeroExit(status.code().unwrap_or(-1)));
        }
        debug!(program = %self.program, "Link handed to browser");
        Ok(())
    }
}
