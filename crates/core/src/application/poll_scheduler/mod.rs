// Poll Scheduler - consumer loop driving the dequeue endpoint

pub mod constants;
pub mod dispatch;
pub mod machine;

use constants::*;
pub use machine::{Action, Event, Mode, TimerKind};

use crate::application::{ConsumerState, ShutdownToken};
use crate::domain::StateKey;
use crate::error::Result;
use crate::port::{DeliveryClient, TabOpener, TimeProvider};
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// Cadence settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSchedulerConfig {
    pub poll_interval: Duration,
    pub initial_delay: Duration,
    pub turbo_interval: Duration,
    pub turbo_duration: Duration,
}

impl Default for PollSchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
            turbo_interval: DEFAULT_TURBO_INTERVAL,
            turbo_duration: DEFAULT_TURBO_DURATION,
        }
    }
}

impl PollSchedulerConfig {
    pub fn turbo_duration_ms(&self) -> i64 {
        self.turbo_duration.as_millis() as i64
    }
}

/// Single-task poll loop
///
/// Timers live here; every decision comes from [`machine::step`].
pub struct PollScheduler {
    state: Arc<ConsumerState>,
    client: Arc<dyn DeliveryClient>,
    opener: Arc<dyn TabOpener>,
    time_provider: Arc<dyn TimeProvider>,
    config: PollSchedulerConfig,
}

struct Timers {
    normal: Option<Interval>,
    turbo: Option<Pin<Box<Sleep>>>,
}

impl PollScheduler {
    pub fn new(
        state: Arc<ConsumerState>,
        client: Arc<dyn DeliveryClient>,
        opener: Arc<dyn TabOpener>,
        time_provider: Arc<dyn TimeProvider>,
        config: PollSchedulerConfig,
    ) -> Self {
        Self {
            state,
            client,
            opener,
            time_provider,
            config,
        }
    }

    /// Run until shutdown
    ///
    /// A token created on this start switches turbo on so a fresh install
    /// picks up its first links quickly.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        let (token, created) = self.state.get_or_create_token().await?;
        if created {
            self.state
                .enable_turbo(self.config.turbo_duration_ms())
                .await?;
        }
        info!(token_hint = %token.hint(), first_run = created, "Poll scheduler started");

        // Subscribed after the first-run write so Start alone handles it
        let mut changes = Some(self.state.subscribe());
        let mut timers = Timers {
            normal: None,
            turbo: None,
        };
        let mut mode = self.handle(Mode::Idle, Event::Start, &mut timers).await?;

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            let event = tokio::select! {
                _ = next_normal(&mut timers.normal) => Event::Tick(TimerKind::Normal),
                _ = next_turbo(&mut timers.turbo) => {
                    timers.turbo = None;
                    Event::Tick(TimerKind::Turbo)
                }
                change = next_change(&mut changes) => match change {
                    Some(StateKey::TurboEnd) => Event::StateChanged,
                    _ => continue,
                },
                _ = shutdown.wait() => break,
            };
            mode = self.handle(mode, event, &mut timers).await?;
        }

        info!("Poll scheduler stopped");
        Ok(())
    }

    async fn handle(&self, mode: Mode, event: Event, timers: &mut Timers) -> Result<Mode> {
        let now = self.time_provider.now_millis();
        let turbo_end = self.state.turbo_window().await?.map(|w| w.end_time_ms);
        let (next, actions) = machine::step(mode, event, now, turbo_end);

        if next != mode {
            info!(from = ?mode, to = ?next, "Poll mode changed");
        }

        for action in actions {
            match action {
                Action::Poll => self.poll().await,
                Action::ArmNormal => {
                    let mut tick = interval_at(
                        Instant::now() + self.config.initial_delay,
                        self.config.poll_interval,
                    );
                    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    timers.normal = Some(tick);
                }
                Action::CancelNormal => timers.normal = None,
                Action::ArmTurbo => {
                    timers.turbo = Some(Box::pin(sleep(self.config.turbo_interval)));
                }
                Action::CancelTurbo => timers.turbo = None,
                Action::ClearTurboWindow => {
                    if let Err(e) = self.state.clear_expired_turbo().await {
                        warn!(error = %e, "Failed to clear expired turbo window");
                    }
                }
            }
        }
        Ok(next)
    }

    /// Failures are logged and retried on the next tick
    async fn poll(&self) {
        match dispatch::poll_once(&self.state, self.client.as_ref(), self.opener.as_ref()).await {
            Ok(opened) => debug!(opened, "Poll finished"),
            Err(e) => warn!(error = %e, transient = e.is_transient(), "Poll failed"),
        }
    }
}

async fn next_normal(timer: &mut Option<Interval>) {
    match timer {
        Some(tick) => {
            tick.tick().await;
        }
        None => pending().await,
    }
}

async fn next_turbo(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

/// Next changed key; a lagged feed is treated as a turbo change to force a resync
async fn next_change(feed: &mut Option<broadcast::Receiver<StateKey>>) -> Option<StateKey> {
    let Some(rx) = feed else {
        return pending().await;
    };
    match rx.recv().await {
        Ok(key) => Some(key),
        Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "State change feed lagged");
            Some(StateKey::TurboEnd)
        }
        Err(RecvError::Closed) => {
            *feed = None;
            None
        }
    }
}
