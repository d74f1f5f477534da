// Shutdown signal shared by the long-running loops

use tokio::sync::watch;

/// Receiving side, cloned into every loop that must stop
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is signalled or the sender is gone
    pub async fn wait(&mut self) {
        if self.is_shutdown() {
            return;
        }
        let _ = self.rx.changed().await;
    }
}

pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_clones_observe_shutdown() {
        let (tx, token) = shutdown_channel();
        let mut a = token.clone();
        let mut b = token;
        assert!(!a.is_shutdown());

        tx.shutdown();
        a.wait().await;
        b.wait().await;
        assert!(a.is_shutdown() && b.is_shutdown());
    }
}
