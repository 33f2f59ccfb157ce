//! Periodic rolling-average aggregation over the persisted price stream.
//!
//! Runs independently of the broadcast path; it only needs eventually
//! consistent visibility of recently stored prices. A failed round is
//! logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::AppError;
use crate::price_store::PriceStore;

/// Compute and store one rolling average per ticker that has data in the
/// trailing window. Returns how many averages were written.
pub fn aggregate_once(
    store: &PriceStore,
    tickers: &[String],
    window: Duration,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let since = now - chrono::Duration::seconds(window.as_secs() as i64);
    let mut written = 0;
    for ticker in tickers {
        let prices = store.prices_since(ticker, since)?;
        if prices.is_empty() {
            continue;
        }
        let average = prices.iter().sum::<f64>() / prices.len() as f64;
        store.record_average(ticker, average, window.as_secs(), now)?;
        tracing::info!(%ticker, average, samples = prices.len(), "Stored rolling average");
        written += 1;
    }
    Ok(written)
}

pub async fn run(
    store: Arc<PriceStore>,
    tickers: Vec<String>,
    interval: Duration,
    window: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        window_secs = window.as_secs(),
        "Average aggregation task started"
    );
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(interval) => {}
        }
        let store = Arc::clone(&store);
        let tickers = tickers.clone();
        let result =
            tokio::task::spawn_blocking(move || aggregate_once(&store, &tickers, window, Utc::now()))
                .await;
        match result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Error calculating averages, skipping round"),
            Err(e) => tracing::error!(error = %e, "Aggregation task panicked, skipping round"),
        }
    }
    tracing::info!("Average aggregation task stopped");
}
