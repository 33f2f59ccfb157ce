//! Monitoring client: connects to the feed, subscribes to every configured
//! ticker, and raises an alert when a ticker moves sharply within a minute.
//!
//! Reconnects are bounded: a fixed delay between attempts and a hard cap on
//! consecutive failures. The attempt counter resets once a connection is
//! established, so a long-lived session does not eat into the budget.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite;

use crate::config::Config;
use crate::monitor::tracker::PriceTracker;
use crate::protocol::{ClientMessage, ServerMessage};

pub struct MonitorClient {
    url: String,
    tickers: Vec<String>,
    tracker: PriceTracker,
    max_attempts: u32,
    retry_delay: Duration,
}

impl MonitorClient {
    pub fn new(
        url: impl Into<String>,
        tickers: Vec<String>,
        threshold_pct: f64,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            tickers,
            tracker: PriceTracker::new(threshold_pct),
            max_attempts,
            retry_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.monitor.server_url.clone(),
            config.feed.tickers.clone(),
            config.monitor.change_threshold_pct,
            config.monitor.max_connect_attempts,
            Duration::from_secs(config.monitor.retry_delay_secs),
        )
    }

    /// Monitor until the server closes the connection cleanly, shutdown is
    /// signaled, or the reconnect budget is exhausted. Exhaustion is an
    /// error, not a silent stop.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            match self.connect_once(&mut shutdown, &mut attempts).await {
                Ok(()) => {
                    tracing::info!("Monitoring session ended");
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Connection attempt failed"
                    );
                    if attempts >= self.max_attempts {
                        bail!(
                            "could not reach price feed after {} attempts: {}",
                            attempts,
                            e
                        );
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(self.retry_delay) => {}
                        _ = shutdown.changed() => return Ok(()),
                    }
                }
            }
        }
    }

    async fn connect_once(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
        attempts: &mut u32,
    ) -> Result<()> {
        tracing::info!(url = %self.url, "Connecting to price feed");
        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .context("WebSocket connect failed")?;
        *attempts = 0;
        tracing::info!("Connected to price feed");

        let (mut write, mut read) = ws_stream.split();
        for ticker in &self.tickers {
            let msg = serde_json::to_string(&ClientMessage::Subscribe {
                ticker: ticker.clone(),
            })?;
            write
                .send(tungstenite::Message::Text(msg))
                .await
                .with_context(|| format!("failed to subscribe to {ticker}"))?;
            tracing::info!(%ticker, "Subscribed");
        }

        loop {
            tokio::select! {
                _ = shutdown.changed() => return Ok(()),
                msg = read.next() => match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        if let Some(alert) = self.handle_message(&text, Utc::now()) {
                            tracing::warn!("{alert}");
                        }
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        tracing::info!("Server closed the connection");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("WebSocket stream error"),
                }
            }
        }
    }

    /// Process one inbound frame; returns an alert line when the update
    /// tripped the significance threshold. Malformed frames are dropped
    /// with a warning.
    pub fn handle_message(&mut self, text: &str, now: DateTime<Utc>) -> Option<String> {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(ServerMessage::PriceUpdate {
                ticker,
                price,
                timestamp,
            }) => {
                self.tracker.add_price(&ticker, price, timestamp);
                tracing::debug!(%ticker, price, "Price update");
                if self.tracker.check_significant_change(&ticker, now) {
                    let (old, new, pct) = self.tracker.recent_change(&ticker, now)?;
                    let direction = if pct > 0.0 { "up" } else { "down" };
                    return Some(format!(
                        "PRICE ALERT: {ticker} {direction} {:.2}% in 1 minute ({old:.2} -> {new:.2})",
                        pct.abs()
                    ));
                }
                None
            }
            Ok(ServerMessage::SubscriptionConfirmed { ticker, price, .. }) => {
                tracing::info!(%ticker, price, "Subscription confirmed");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Malformed message, dropping");
                None
            }
        }
    }
}
