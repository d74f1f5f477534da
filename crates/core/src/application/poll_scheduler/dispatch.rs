// Poll dispatch - one poll, every link handed to the tab opener

use crate::application::ConsumerState;
use crate::error::Result;
use crate::port::{DeliveryClient, TabOpener};
use tracing::{debug, info, warn};

/// Poll once and open whatever came back
///
/// Returns how many links were opened. A link that fails to open is logged
/// and skipped; it has already left the server queue and is not retried.
/// Failing to record stats never stops the rest of the batch.
pub async fn poll_once(
    state: &ConsumerState,
    client: &dyn DeliveryClient,
    opener: &dyn TabOpener,
) -> Result<usize> {
    let Some(token) = state.token().await? else {
        debug!("No token stored, skipping poll");
        return Ok(0);
    };
    let base_url = state.base_url().await?;

    let links = client.poll(&base_url, &token).await?;
    if links.is_empty() {
        return Ok(0);
    }

    info!(count = links.len(), "Opening delivered links");

    let mut opened = 0;
    for url in &links {
        match opener.open(url).await {
            Ok(()) => {
                opened += 1;
                if let Err(e) = state.record_opened_link(url).await {
                    warn!(url = %url, error = %e, "Failed to record opened link");
                }
            }
            Err(e) => warn!(url = %url, error = %e, "Failed to open link"),
        }
    }
    Ok(opened)
}
