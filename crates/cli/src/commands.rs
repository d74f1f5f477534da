//! Command implementations

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use colored::Colorize;
use linkrelay_core::application::{
    shutdown_channel, ConsumerState, PollScheduler, PollSchedulerConfig,
};
use linkrelay_core::domain::{Token, TokenFormat};
use linkrelay_core::port::time_provider::SystemTimeProvider;
use linkrelay_core::port::TimeProvider;
use linkrelay_infra_system::file_state_store::DEFAULT_WATCH_INTERVAL;
use linkrelay_infra_system::{FileStateStore, SystemTabOpener};
use linkrelay_sdk::LinkRelayClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::info;

pub struct CliContext {
    pub state_path: PathBuf,
    pub default_base_url: String,
    pub token_format: TokenFormat,
}

impl CliContext {
    async fn open_state(&self) -> Result<(Arc<FileStateStore>, ConsumerState)> {
        let store = Arc::new(
            FileStateStore::open(&self.state_path)
                .await
                .with_context(|| format!("Failed to open {}", self.state_path.display()))?,
        );
        let state = ConsumerState::new(
            store.clone(),
            Arc::new(SystemTimeProvider),
            self.token_format.clone(),
            self.default_base_url.clone(),
        );
        Ok((store, state))
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(field: &'static str, value: impl Into<String>) -> StatusRow {
    StatusRow {
        field,
        value: value.into(),
    }
}

fn format_local_time(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Only absolute http(s) URLs with a host can serve as a server base
pub fn validate_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw.trim()).with_context(|| format!("Not a URL: {}", raw))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Base URL must use http or https, got {}", parsed.scheme());
    }
    if parsed.host_str().is_none() {
        bail!("Base URL has no host: {}", raw);
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        bail!("Base URL must not carry a query or fragment: {}", raw);
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

pub async fn run(
    ctx: &CliContext,
    poll_interval_secs: u64,
    turbo_interval_secs: u64,
    turbo_duration_secs: u64,
) -> Result<()> {
    let (store, state) = ctx.open_state().await?;
    let state = Arc::new(state);
    let watcher = store.spawn_watcher(DEFAULT_WATCH_INTERVAL);

    let config = PollSchedulerConfig {
        poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
        turbo_interval: Duration::from_secs(turbo_interval_secs.max(1)),
        turbo_duration: Duration::from_secs(turbo_duration_secs),
        ..PollSchedulerConfig::default()
    };
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let scheduler = PollScheduler::new(
        state.clone(),
        Arc::new(LinkRelayClient::new()?),
        Arc::new(SystemTabOpener::for_current_os()),
        time_provider,
        config,
    );

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let runner = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    // The scheduler creates the token on first run; give it a moment before printing
    tokio::time::sleep(Duration::from_millis(200)).await;
    if let Some(token) = state.token().await? {
        println!(
            "{} {}",
            "Webhook URL:".bold(),
            state.webhook_url(&token).await?.cyan()
        );
    }
    println!("Polling for links. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown_tx.shutdown();

    runner.await.context("Poll scheduler task panicked")??;
    watcher.abort();
    Ok(())
}

pub async fn token(ctx: &CliContext, regenerate: bool) -> Result<()> {
    let (_, state) = ctx.open_state().await?;

    let token: Token = if regenerate {
        let token = state.regenerate_token().await?;
        println!("{}", "✓ Token regenerated".green().bold());
        println!(
            "  {}",
            "Links still queued for the old token will not be delivered.".yellow()
        );
        token
    } else {
        let (token, created) = state.get_or_create_token().await?;
        if created {
            println!("{}", "✓ New token generated".green().bold());
        }
        token
    };

    println!("  {} {}", "Token:".bold(), token);
    println!("  {} {}", "Webhook URL:".bold(), state.webhook_url(&token).await?);
    Ok(())
}

pub async fn turbo_on(ctx: &CliContext, duration_secs: u64) -> Result<()> {
    let (_, state) = ctx.open_state().await?;
    let window = state
        .enable_turbo((duration_secs as i64).saturating_mul(1000))
        .await?;
    println!(
        "{} until {}",
        "✓ Turbo mode on".green().bold(),
        format_local_time(window.end_time_ms)
    );
    Ok(())
}

pub async fn turbo_off(ctx: &CliContext) -> Result<()> {
    let (_, state) = ctx.open_state().await?;
    state.disable_turbo().await?;
    println!("{}", "✓ Turbo mode off".green().bold());
    Ok(())
}

pub async fn set_base_url(ctx: &CliContext, raw: &str) -> Result<()> {
    let base_url = validate_base_url(raw)?;
    let (_, state) = ctx.open_state().await?;
    state.set_base_url(&base_url).await?;
    println!("{} {}", "✓ Base URL set to".green().bold(), base_url);
    Ok(())
}

pub async fn reset_base_url(ctx: &CliContext) -> Result<()> {
    let (_, state) = ctx.open_state().await?;
    state.reset_base_url().await?;
    println!(
        "{} {}",
        "✓ Base URL reset to".green().bold(),
        state.base_url().await?
    );
    Ok(())
}

pub async fn status(ctx: &CliContext) -> Result<()> {
    let (_, state) = ctx.open_state().await?;
    let now = SystemTimeProvider.now_millis();

    let base_url = state.base_url().await?;
    let base_label = if base_url == ctx.default_base_url.trim_end_matches('/') {
        base_url.clone()
    } else {
        format!("{} (override)", base_url)
    };

    let mut rows = vec![row("State file", ctx.state_path.display().to_string())];
    match state.token().await? {
        Some(token) => {
            rows.push(row("Token", token.as_str()));
            rows.push(row("Webhook URL", state.webhook_url(&token).await?));
        }
        None => rows.push(row("Token", "none (run `linkrelay token`)")),
    }
    rows.push(row("Base URL", base_label));

    let turbo = match state.turbo_window().await? {
        Some(window) if window.is_active(now) => format!(
            "on until {} ({}s left)",
            format_local_time(window.end_time_ms),
            window.remaining_ms(now) / 1000
        ),
        _ => "off".to_string(),
    };
    rows.push(row("Turbo", turbo));

    let stats = state.open_stats().await?;
    rows.push(row("Links opened", stats.count.to_string()));
    rows.push(row("Last link", stats.last_link.unwrap_or_else(|| "-".to_string())));

    println!("{}", "linkrelay status".cyan().bold());
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn send(ctx: &CliContext, links: &[String], token: Option<&str>) -> Result<()> {
    let (_, state) = ctx.open_state().await?;
    let token = match token {
        Some(raw) => ctx
            .token_format
            .parse(raw.trim())
            .with_context(|| format!("Not a valid token: {}", raw))?,
        None => state
            .token()
            .await?
            .context("No token stored; run `linkrelay token` or pass --token")?,
    };

    let client = LinkRelayClient::new()?;
    let base_url = state.base_url().await?;
    match client.enqueue(&base_url, token.as_str(), links).await {
        Ok(response) => {
            println!("{}", format!("✓ {}", response.message).green().bold());
            for link in response.links {
                println!("  • {}", link);
            }
            Ok(())
        }
        Err(linkrelay_sdk::SdkError::Api {
            status,
            message,
            limit,
            examples,
        }) => {
            println!("{} {}", format!("✗ Rejected ({})", status).red().bold(), message);
            if let Some(limit) = limit {
                println!("  Queue limit: {}", limit);
            }
            for example in examples {
                println!("  e.g. {}", example);
            }
            bail!("Server rejected the links")
        }
        Err(e) => Err(e).context("Failed to reach server"),
    }
}
