//! Historical price input for the batch strategy run.
//!
//! Rows come either from a JSON file (`[{"ticker": "AAPL", "date":
//! "2024-01-02", "price": 185.6}, ...]`, `price` may be null) or from the
//! live price store. Rows are sorted by (ticker, date), missing prices are
//! forward-filled per ticker, and non-positive prices abort the run.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRow {
    pub ticker: String,
    pub date: DateTime<Utc>,
    pub price: f64,
}

/// One record as it appears in the input file, before fill and validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: Option<f64>,
}

pub fn load_history_json(path: &Path) -> Result<Vec<HistoricalRow>, AppError> {
    let text = std::fs::read_to_string(path)?;
    let raw: Vec<RawRecord> = serde_json::from_str(&text)
        .map_err(|e| AppError::Data(format!("invalid historical data in {}: {e}", path.display())))?;
    normalize_records(raw)
}

/// Sort, forward-fill and validate raw records.
pub fn normalize_records(mut raw: Vec<RawRecord>) -> Result<Vec<HistoricalRow>, AppError> {
    raw.sort_by(|a, b| (a.ticker.as_str(), a.date).cmp(&(b.ticker.as_str(), b.date)));

    let mut filled = 0usize;
    let mut rows = Vec::with_capacity(raw.len());
    let mut last: Option<(String, f64)> = None;
    for record in raw {
        let carried = match &last {
            Some((ticker, price)) if *ticker == record.ticker => Some(*price),
            _ => None,
        };
        let price = match record.price {
            Some(p) => p,
            None => {
                filled += 1;
                carried.ok_or_else(|| {
                    AppError::Data(format!(
                        "missing price for {} on {} with no prior value to fill from",
                        record.ticker, record.date
                    ))
                })?
            }
        };
        if price <= 0.0 {
            return Err(AppError::Data(format!(
                "non-positive price {} for {} on {}",
                price, record.ticker, record.date
            )));
        }
        last = Some((record.ticker.clone(), price));
        rows.push(HistoricalRow {
            ticker: record.ticker,
            date: record
                .date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always a valid time")
                .and_utc(),
            price,
        });
    }
    if filled > 0 {
        tracing::warn!(filled, "Forward-filled missing prices in historical data");
    }
    Ok(rows)
}
