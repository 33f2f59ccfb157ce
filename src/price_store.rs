//! SQLite persistence for the simulated price stream and its rolling
//! averages. Writes on the broadcast path go through [`PriceSink`] and are
//! fire-and-forget: a failed write is logged and never blocks or aborts the
//! fan-out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};

use crate::error::AppError;
use crate::model::tick::{round_to_cents, Tick};
use crate::strategy::historical::HistoricalRow;

/// Best-effort sink for price observations. Implementations must not block
/// the caller.
pub trait PriceSink: Send + Sync {
    fn offer(&self, tick: &Tick);
}

#[derive(Debug, Clone, PartialEq)]
pub struct AverageRow {
    pub ticker: String,
    pub average_price: f64,
    pub window_secs: u64,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PriceStore {
    path: PathBuf,
}

impl PriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, AppError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stock_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                price REAL NOT NULL,
                recorded_at_ms INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_stock_prices_ticker_time
                ON stock_prices(ticker, recorded_at_ms);

            CREATE TABLE IF NOT EXISTS average_prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                average_price REAL NOT NULL,
                window_secs INTEGER NOT NULL,
                computed_at_ms INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(conn)
    }

    pub fn record_price(&self, tick: &Tick) -> Result<(), AppError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO stock_prices (ticker, price, recorded_at_ms) VALUES (?1, ?2, ?3)",
            params![
                tick.ticker,
                round_to_cents(tick.price),
                tick.timestamp.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Prices for one ticker recorded at or after `since`, oldest first.
    pub fn prices_since(
        &self,
        ticker: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<f64>, AppError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT price FROM stock_prices
             WHERE ticker = ?1 AND recorded_at_ms >= ?2
             ORDER BY recorded_at_ms ASC",
        )?;
        let rows = stmt.query_map(params![ticker, since.timestamp_millis()], |row| {
            row.get::<_, f64>(0)
        })?;
        let mut prices = Vec::new();
        for price in rows {
            prices.push(price?);
        }
        Ok(prices)
    }

    pub fn record_average(
        &self,
        ticker: &str,
        average_price: f64,
        window_secs: u64,
        computed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO average_prices (ticker, average_price, window_secs, computed_at_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                ticker,
                round_to_cents(average_price),
                window_secs as i64,
                computed_at.timestamp_millis()
            ],
        )?;
        Ok(())
    }

    /// Latest stored rolling averages for one ticker, newest first.
    pub fn recent_averages(&self, ticker: &str, limit: u32) -> Result<Vec<AverageRow>, AppError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT average_price, window_secs, computed_at_ms FROM average_prices
             WHERE ticker = ?1 ORDER BY computed_at_ms DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![ticker, limit], |row| {
            Ok((
                row.get::<_, f64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (average_price, window_secs, computed_at_ms) = row?;
            let computed_at = Utc
                .timestamp_millis_opt(computed_at_ms)
                .single()
                .ok_or_else(|| {
                    AppError::Data(format!(
                        "invalid timestamp {computed_at_ms} in average_prices"
                    ))
                })?;
            out.push(AverageRow {
                ticker: ticker.to_string(),
                average_price,
                window_secs: window_secs as u64,
                computed_at,
            });
        }
        Ok(out)
    }

    /// Full persisted price history ordered by (ticker, time), shaped for the
    /// backtest runner.
    pub fn load_history(&self) -> Result<Vec<HistoricalRow>, AppError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT ticker, price, recorded_at_ms FROM stock_prices
             ORDER BY ticker ASC, recorded_at_ms ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (ticker, price, recorded_at_ms) = row?;
            let date = Utc
                .timestamp_millis_opt(recorded_at_ms)
                .single()
                .ok_or_else(|| {
                    AppError::Data(format!("invalid timestamp {recorded_at_ms} in stock_prices"))
                })?;
            out.push(HistoricalRow {
                ticker,
                date,
                price,
            });
        }
        Ok(out)
    }
}

/// [`PriceSink`] backed by the sqlite store. The actual write happens on the
/// blocking pool; errors are logged and swallowed.
pub struct StorePriceSink {
    store: Arc<PriceStore>,
}

impl StorePriceSink {
    pub fn new(store: Arc<PriceStore>) -> Self {
        Self { store }
    }
}

impl PriceSink for StorePriceSink {
    fn offer(&self, tick: &Tick) {
        let store = Arc::clone(&self.store);
        let tick = tick.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = store.record_price(&tick) {
                tracing::error!(ticker = %tick.ticker, error = %e, "Failed to store price");
            }
        });
    }
}
