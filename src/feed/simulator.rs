//! Bounded random-walk price generator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;

use crate::config::FeedConfig;
use crate::feed::broadcaster::Broadcaster;
use crate::model::tick::Tick;

/// Maximum per-round percentage move, either direction.
const MAX_STEP_PCT: f64 = 0.05;
/// Prices never walk below this floor.
const PRICE_FLOOR: f64 = 1.0;
/// Pause after a failed round before generation resumes.
const ROUND_FAILURE_COOLDOWN: Duration = Duration::from_secs(1);

pub struct PriceFeedSimulator {
    tickers: Vec<String>,
    prices: HashMap<String, f64>,
    min_round_delay: Duration,
    max_round_delay: Duration,
}

impl PriceFeedSimulator {
    /// Seed every ticker with a uniform random price in the configured
    /// initial range.
    pub fn new(config: &FeedConfig) -> Self {
        let mut rng = rand::thread_rng();
        let prices = config
            .tickers
            .iter()
            .map(|t| {
                (
                    t.clone(),
                    rng.gen_range(config.initial_price_min..=config.initial_price_max),
                )
            })
            .collect();
        Self {
            tickers: config.tickers.clone(),
            prices,
            min_round_delay: Duration::from_millis(config.min_round_delay_ms),
            max_round_delay: Duration::from_millis(config.max_round_delay_ms),
        }
    }

    /// One round: every ticker takes a uniform step in [-5%, +5%], clamped
    /// to the floor. All tickers share the round's timestamp cadence.
    pub fn next_round(&mut self) -> Vec<Tick> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let mut ticks = Vec::with_capacity(self.tickers.len());
        for ticker in &self.tickers {
            let last = self.prices[ticker];
            let change_pct = rng.gen_range(-MAX_STEP_PCT..=MAX_STEP_PCT);
            let price = (last * (1.0 + change_pct)).max(PRICE_FLOOR);
            self.prices.insert(ticker.clone(), price);
            ticks.push(Tick::new(ticker.clone(), price, now));
        }
        ticks
    }

    fn round_delay(&self) -> Duration {
        if self.min_round_delay >= self.max_round_delay {
            return self.min_round_delay;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(
            rng.gen_range(self.min_round_delay.as_millis()..=self.max_round_delay.as_millis())
                as u64,
        )
    }

    /// Generate rounds until shutdown. A failed round is logged, followed by
    /// a short cooldown; generation never terminates on a single failure.
    pub async fn run(mut self, broadcaster: Arc<Broadcaster>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(tickers = self.tickers.len(), "Price feed simulator started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.round_delay()) => {}
            }
            if let Err(e) = self.run_round(&broadcaster) {
                tracing::error!(error = %e, "Error generating price round");
                tokio::time::sleep(ROUND_FAILURE_COOLDOWN).await;
            }
        }
        tracing::info!("Price feed simulator stopped");
    }

    fn run_round(&mut self, broadcaster: &Broadcaster) -> Result<(), crate::error::AppError> {
        for tick in self.next_round() {
            broadcaster.broadcast(&tick)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    fn config(tickers: &[&str]) -> FeedConfig {
        FeedConfig {
            tickers: tickers.iter().map(|s| s.to_string()).collect(),
            ..FeedConfig::default()
        }
    }

    #[test]
    fn seeds_within_initial_range() {
        let sim = PriceFeedSimulator::new(&config(&["AAPL", "MSFT"]));
        for price in sim.prices.values() {
            assert!((100.0..=500.0).contains(price));
        }
    }

    #[test]
    fn rounds_stay_within_step_bounds_and_floor() {
        let mut sim = PriceFeedSimulator::new(&config(&["AAPL"]));
        sim.prices.insert("AAPL".to_string(), 1.02);
        for _ in 0..200 {
            let last = sim.prices["AAPL"];
            let ticks = sim.next_round();
            assert_eq!(ticks.len(), 1);
            let price = ticks[0].price;
            assert!(price >= PRICE_FLOOR);
            assert!(price <= last * (1.0 + MAX_STEP_PCT) + 1e-9);
            assert!(price >= (last * (1.0 - MAX_STEP_PCT)).max(PRICE_FLOOR) - 1e-9);
        }
    }
}
