// Consumer State - typed view over the raw state store

use crate::domain::{OpenStats, StateKey, Token, TokenFormat, TurboWindow};
use crate::error::Result;
use crate::port::{StateStore, TimeProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub struct ConsumerState {
    store: Arc<dyn StateStore>,
    time_provider: Arc<dyn TimeProvider>,
    token_format: TokenFormat,
    default_base_url: String,
}

impl ConsumerState {
    pub fn new(
        store: Arc<dyn StateStore>,
        time_provider: Arc<dyn TimeProvider>,
        token_format: TokenFormat,
        default_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            time_provider,
            token_format,
            default_base_url: trim_base_url(&default_base_url.into()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateKey> {
        self.store.subscribe()
    }

    /// Stored token, if it still validates
    pub async fn token(&self) -> Result<Option<Token>> {
        let value = self.store.get(StateKey::Token).await?;
        let token = value
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| self.token_format.parse(s));
        if value.is_some() && token.is_none() {
            warn!("Stored token is no longer valid");
        }
        Ok(token)
    }

    /// Returns the token and whether it was created by this call
    pub async fn get_or_create_token(&self) -> Result<(Token, bool)> {
        if let Some(token) = self.token().await? {
            return Ok((token, false));
        }
        let token = self.token_format.generate();
        self.store
            .set(StateKey::Token, json!(token.as_str()))
            .await?;
        info!(token_hint = %token.hint(), "Generated new token");
        Ok((token, true))
    }

    /// Replace the token and reset delivery stats
    ///
    /// Links still queued under the old token are orphaned and expire.
    pub async fn regenerate_token(&self) -> Result<Token> {
        let token = self.token_format.generate();
        self.store
            .set(StateKey::Token, json!(token.as_str()))
            .await?;
        self.store.remove(StateKey::OpenCount).await?;
        self.store.remove(StateKey::LastLink).await?;
        info!(token_hint = %token.hint(), "Token regenerated");
        Ok(token)
    }

    /// Override if set, otherwise the configured default; never ends in `/`
    pub async fn base_url(&self) -> Result<String> {
        let stored = self.store.get(StateKey::BaseUrl).await?;
        Ok(stored
            .as_ref()
            .and_then(Value::as_str)
            .map(trim_base_url)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_base_url.clone()))
    }

    pub async fn set_base_url(&self, base_url: &str) -> Result<()> {
        self.store
            .set(StateKey::BaseUrl, json!(trim_base_url(base_url)))
            .await
    }

    pub async fn reset_base_url(&self) -> Result<()> {
        self.store.remove(StateKey::BaseUrl).await
    }

    pub async fn enable_turbo(&self, duration_ms: i64) -> Result<TurboWindow> {
        let window = TurboWindow::starting_at(self.time_provider.now_millis(), duration_ms);
        self.store
            .set(StateKey::TurboEnd, json!(window.end_time_ms))
            .await?;
        info!(end_time_ms = window.end_time_ms, "Turbo mode enabled");
        Ok(window)
    }

    pub async fn disable_turbo(&self) -> Result<()> {
        self.store.remove(StateKey::TurboEnd).await
    }

    /// Remove the stored window once it has ended; an active one is kept
    pub async fn clear_expired_turbo(&self) -> Result<bool> {
        let now = self.time_provider.now_millis();
        match self.turbo_window().await? {
            Some(window) if !window.is_active(now) => {
                self.store.remove(StateKey::TurboEnd).await?;
                info!(end_time_ms = window.end_time_ms, "Turbo window expired");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub async fn turbo_window(&self) -> Result<Option<TurboWindow>> {
        let value = self.store.get(StateKey::TurboEnd).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_i64)
            .map(|end_time_ms| TurboWindow { end_time_ms }))
    }

    pub async fn is_turbo_active(&self) -> Result<bool> {
        let now = self.time_provider.now_millis();
        Ok(self
            .turbo_window()
            .await?
            .is_some_and(|w| w.is_active(now)))
    }

    pub async fn record_opened_link(&self, url: &str) -> Result<()> {
        let stats = self.open_stats().await?;
        self.store
            .set(StateKey::OpenCount, json!(stats.count.saturating_add(1)))
            .await?;
        self.store.set(StateKey::LastLink, json!(url)).await
    }

    pub async fn open_stats(&self) -> Result<OpenStats> {
        let count = self
            .store
            .get(StateKey::OpenCount)
            .await?
            .as_ref()
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let last_link = self
            .store
            .get(StateKey::LastLink)
            .await?
            .and_then(|v| v.as_str().map(str::to_string));
        Ok(OpenStats { count, last_link })
    }

    /// `{base_url}/{token}`, the URL producers send links to
    pub async fn webhook_url(&self, token: &Token) -> Result<String> {
        Ok(format!("{}/{}", self.base_url().await?, token))
    }

    /// `{base_url}/{token}/extension-poll`
    pub async fn poll_url(&self, token: &Token) -> Result<String> {
        Ok(format!("{}/extension-poll", self.webhook_url(token).await?))
    }
}

fn trim_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
