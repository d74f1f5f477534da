//! linkrelay CLI - consumer side of the relay
//!
//! `linkrelay run` polls the server and opens delivered links; the other
//! commands inspect or change the state file it runs from.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use linkrelay_core::domain::token::{
    DEFAULT_ALPHABET, DEFAULT_MARKER_OFFSET, DEFAULT_TOKEN_LENGTH, DEFAULT_TOKEN_MARKER,
};
use linkrelay_core::domain::TokenFormat;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_STATE_PATH: &str = "~/.linkrelay/state.json";

#[derive(Parser)]
#[command(name = "linkrelay")]
#[command(about = "Open links sent to your webhook in the local browser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL used when no override is stored
    #[arg(long, global = true, env = "LINKRELAY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Consumer state file
    #[arg(long, global = true, env = "LINKRELAY_STATE_PATH", default_value = DEFAULT_STATE_PATH)]
    state_path: String,

    #[command(flatten)]
    token_format: TokenFormatArgs,
}

/// Must match the server's token settings
#[derive(Args)]
struct TokenFormatArgs {
    #[arg(long, global = true, hide = true, env = "LINKRELAY_TOKEN_LENGTH", default_value_t = DEFAULT_TOKEN_LENGTH)]
    token_length: usize,

    #[arg(long, global = true, hide = true, env = "LINKRELAY_TOKEN_MARKER", default_value = DEFAULT_TOKEN_MARKER)]
    token_marker: String,

    #[arg(long, global = true, hide = true, env = "LINKRELAY_TOKEN_MARKER_OFFSET", default_value_t = DEFAULT_MARKER_OFFSET)]
    token_marker_offset: usize,

    #[arg(long, global = true, hide = true, env = "LINKRELAY_TOKEN_ALPHABET", default_value = DEFAULT_ALPHABET)]
    token_alphabet: String,
}

impl TokenFormatArgs {
    fn build(&self) -> Result<TokenFormat> {
        TokenFormat::new(
            self.token_length,
            &self.token_marker,
            self.token_marker_offset,
            &self.token_alphabet,
        )
        .context("Invalid token format")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for links and open them until Ctrl+C
    Run {
        /// Seconds between polls in normal mode
        #[arg(long, env = "LINKRELAY_POLL_INTERVAL_SECS", default_value_t = 60)]
        poll_interval_secs: u64,

        /// Seconds between polls in turbo mode
        #[arg(long, env = "LINKRELAY_TURBO_INTERVAL_SECS", default_value_t = 10)]
        turbo_interval_secs: u64,

        /// How long turbo mode lasts once enabled
        #[arg(long, env = "LINKRELAY_TURBO_DURATION_SECS", default_value_t = 300)]
        turbo_duration_secs: u64,
    },

    /// Show the token and webhook URL
    Token {
        /// Replace the token; links queued under the old one are abandoned
        #[arg(long)]
        regenerate: bool,
    },

    /// Switch fast polling on or off
    Turbo {
        #[command(subcommand)]
        action: TurboAction,
    },

    /// Point the consumer at another server
    BaseUrl {
        #[command(subcommand)]
        action: BaseUrlAction,
    },

    /// Show token, server, turbo state and delivery stats
    Status,

    /// Queue links for a token (defaults to your own)
    Send {
        /// Links to queue
        #[arg(required = true)]
        links: Vec<String>,

        /// Target token
        #[arg(long, env = "LINKRELAY_TOKEN")]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum TurboAction {
    On {
        #[arg(long, env = "LINKRELAY_TURBO_DURATION_SECS", default_value_t = 300)]
        duration_secs: u64,
    },
    Off,
}

#[derive(Subcommand)]
enum BaseUrlAction {
    Set { url: String },
    Reset,
}

fn init_logging() -> Result<()> {
    let log_format =
        std::env::var("LINKRELAY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("linkrelay=info"))
        .context("Failed to create env filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match log_format.as_str() {
        "json" => registry.with(fmt::layer().json()).init(),
        _ => registry.with(fmt::layer().compact()).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = commands::CliContext {
        state_path: PathBuf::from(shellexpand::tilde(&cli.state_path).into_owned()),
        default_base_url: cli.base_url.clone(),
        token_format: cli.token_format.build()?,
    };

    match cli.command {
        Commands::Run {
            poll_interval_secs,
            turbo_interval_secs,
            turbo_duration_secs,
        } => {
            init_logging()?;
            commands::run(&ctx, poll_interval_secs, turbo_interval_secs, turbo_duration_secs)
                .await
        }
        Commands::Token { regenerate } => commands::token(&ctx, regenerate).await,
        Commands::Turbo { action } => match action {
            TurboAction::On { duration_secs } => commands::turbo_on(&ctx, duration_secs).await,
            TurboAction::Off => commands::turbo_off(&ctx).await,
        },
        Commands::BaseUrl { action } => match action {
            BaseUrlAction::Set { url } => commands::set_base_url(&ctx, &url).await,
            BaseUrlAction::Reset => commands::reset_base_url(&ctx).await,
        },
        Commands::Status => commands::status(&ctx).await,
        Commands::Send { links, token } => commands::send(&ctx, &links, token.as_deref()).await,
    }
}
