//! Consumer end-to-end: poll scheduler + SDK client + real server
//!
//! Runs on real time with millisecond cadences; the opener records links
//! instead of launching a browser.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linkrelay_api_http::{HttpServer, HttpServerConfig};
use linkrelay_core::application::{
    shutdown_channel, ConsumerState, DeliveryService, PollScheduler, PollSchedulerConfig,
    QueueStore,
};
use linkrelay_core::domain::{QueueSettings, Token, TokenFormat};
use linkrelay_core::port::sorted_set::memory::InMemorySortedSetStore;
use linkrelay_core::port::state_store::memory::InMemoryStateStore;
use linkrelay_core::port::time_provider::SystemTimeProvider;
use linkrelay_core::port::{OpenError, TabOpener};
use linkrelay_sdk::LinkRelayClient;

const WAIT: Duration = Duration::from_secs(5);

/// Records every link; links containing "broken" fail to open
#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<String>>,
    attempts: Mutex<Vec<String>>,
}

impl RecordingOpener {
    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl TabOpener for RecordingOpener {
    async fn open(&self, url: &str) -> Result<(), OpenError> {
        self.attempts.lock().unwrap().push(url.to_string());
        if url.contains("broken") {
            return Err(OpenError::LaunchFailed("no browser".to_string()));
        }
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

async fn start_server() -> (String, linkrelay_core::application::ShutdownSender) {
    let clock = Arc::new(SystemTimeProvider);
    let sets = Arc::new(InMemorySortedSetStore::new(clock.clone()));
    let queue = Arc::new(QueueStore::new(sets, clock, QueueSettings::default()));
    let delivery = Arc::new(DeliveryService::new(
        queue,
        TokenFormat::default(),
        "https://relay.example",
    ));
    let config = HttpServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let server = HttpServer::bind(&config, delivery).await.unwrap();
    let base_url = format!("http://{}", server.local_addr().unwrap());
    let (tx, rx) = shutdown_channel();
    tokio::spawn(server.run(rx));
    (base_url, tx)
}

fn fast_config() -> PollSchedulerConfig {
    PollSchedulerConfig {
        poll_interval: Duration::from_millis(100),
        initial_delay: Duration::from_millis(10),
        turbo_interval: Duration::from_millis(50),
        turbo_duration: Duration::from_secs(60),
    }
}

async fn wait_for<F, Fut, T>(mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(value) = probe().await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

#[tokio::test]
async fn test_first_run_delivers_links_to_browser() {
    let (base_url, server_shutdown) = start_server().await;

    let state = Arc::new(ConsumerState::new(
        Arc::new(InMemoryStateStore::new()),
        Arc::new(SystemTimeProvider),
        TokenFormat::default(),
        base_url.clone(),
    ));
    let opener = Arc::new(RecordingOpener::default());
    let scheduler = PollScheduler::new(
        state.clone(),
        Arc::new(LinkRelayClient::new().unwrap()),
        opener.clone(),
        Arc::new(SystemTimeProvider),
        fast_config(),
    );
    let (tx, rx) = shutdown_channel();
    let runner = tokio::spawn(async move { scheduler.run(rx).await });

    // First run creates the token and switches turbo on
    let token: Token = wait_for(|| {
        let state = state.clone();
        async move { state.token().await.unwrap() }
    })
    .await;
    assert!(state.is_turbo_active().await.unwrap());

    let producer = LinkRelayClient::new().unwrap();
    producer
        .enqueue(&base_url, token.as_str(), &["example.com", "broken.example", "rust-lang.org"])
        .await
        .unwrap();

    wait_for(|| {
        let opener = opener.clone();
        async move { (opener.attempts() >= 3).then_some(()) }
    })
    .await;

    // The failed link is dropped, not retried; the others open in order
    assert_eq!(
        opener.opened(),
        vec!["https://example.com/", "https://rust-lang.org/"]
    );
    let stats = state.open_stats().await.unwrap();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.last_link.as_deref(), Some("https://rust-lang.org/"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(opener.attempts(), 3);

    tx.shutdown();
    runner.await.unwrap().unwrap();
    server_shutdown.shutdown();
}

#[tokio::test]
async fn test_base_url_override_switches_server() {
    let (first_url, first_shutdown) = start_server().await;
    let (second_url, second_shutdown) = start_server().await;

    let state = Arc::new(ConsumerState::new(
        Arc::new(InMemoryStateStore::new()),
        Arc::new(SystemTimeProvider),
        TokenFormat::default(),
        first_url.clone(),
    ));
    let (token, _) = state.get_or_create_token().await.unwrap();
    state.enable_turbo(60_000).await.unwrap();
    state.set_base_url(&second_url).await.unwrap();

    let opener = Arc::new(RecordingOpener::default());
    let scheduler = PollScheduler::new(
        state.clone(),
        Arc::new(LinkRelayClient::new().unwrap()),
        opener.clone(),
        Arc::new(SystemTimeProvider),
        fast_config(),
    );
    let (tx, rx) = shutdown_channel();
    let runner = tokio::spawn(async move { scheduler.run(rx).await });

    let producer = LinkRelayClient::new().unwrap();
    producer
        .enqueue(&first_url, token.as_str(), &["first.example"])
        .await
        .unwrap();
    producer
        .enqueue(&second_url, token.as_str(), &["second.example"])
        .await
        .unwrap();

    wait_for(|| {
        let opener = opener.clone();
        async move { (!opener.opened().is_empty()).then_some(()) }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(opener.opened(), vec!["https://second.example/"]);

    tx.shutdown();
    runner.await.unwrap().unwrap();
    first_shutdown.shutdown();
    second_shutdown.shutdown();
}
