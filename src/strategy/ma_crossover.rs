//! Moving-average crossover signal generation over historical price series.

use crate::error::AppError;
use crate::indicator::sma::Sma;
use crate::model::report::PnlReport;
use crate::model::signal::{SignalKind, TradingSignal};
use crate::strategy::accountant::PositionAccountant;
use crate::strategy::historical::HistoricalRow;

/// Simple moving averages for the whole series, index-aligned with the
/// input. `None` until the window has `period` samples.
pub fn moving_average(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut sma = Sma::new(period);
    prices.iter().map(|&p| sma.push(p)).collect()
}

/// Crossover signals from two index-aligned MA series.
///
/// Index 0 is always Hold. A buy fires when the short MA closes above the
/// long MA after being at or below it the previous index; a sell is the
/// mirror. The tie rule (`<=` / `>=`) means touching the long MA and then
/// breaking through still counts as a cross.
pub fn detect_crossover(short_ma: &[Option<f64>], long_ma: &[Option<f64>]) -> Vec<SignalKind> {
    debug_assert_eq!(short_ma.len(), long_ma.len());
    let mut signals = Vec::with_capacity(short_ma.len());
    if short_ma.is_empty() {
        return signals;
    }
    signals.push(SignalKind::Hold);
    for i in 1..short_ma.len() {
        let signal = match (short_ma[i - 1], long_ma[i - 1], short_ma[i], long_ma[i]) {
            (Some(ps), Some(pl), Some(s), Some(l)) => {
                if ps <= pl && s > l {
                    SignalKind::Buy
                } else if ps >= pl && s < l {
                    SignalKind::Sell
                } else {
                    SignalKind::Hold
                }
            }
            _ => SignalKind::Hold,
        };
        signals.push(signal);
    }
    signals
}

/// Batch crossover strategy: short/long SMA over each ticker's history,
/// realized P&L via [`PositionAccountant`].
#[derive(Debug, Clone)]
pub struct MaCrossoverStrategy {
    short_period: usize,
    long_period: usize,
}

impl MaCrossoverStrategy {
    /// Fails fast when the periods cannot cross meaningfully.
    pub fn new(short_period: usize, long_period: usize) -> Result<Self, AppError> {
        if short_period == 0 {
            return Err(AppError::Config("short period must be > 0".to_string()));
        }
        if short_period >= long_period {
            return Err(AppError::Config(format!(
                "short period ({short_period}) must be less than long period ({long_period})"
            )));
        }
        Ok(Self {
            short_period,
            long_period,
        })
    }

    pub fn short_period(&self) -> usize {
        self.short_period
    }

    pub fn long_period(&self) -> usize {
        self.long_period
    }

    /// BUY/SELL signals for one ticker's rows (already time-ordered).
    pub fn signals_for_ticker(&self, ticker: &str, rows: &[HistoricalRow]) -> Vec<TradingSignal> {
        let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();
        let short_ma = moving_average(&prices, self.short_period);
        let long_ma = moving_average(&prices, self.long_period);
        let kinds = detect_crossover(&short_ma, &long_ma);

        kinds
            .iter()
            .enumerate()
            .filter(|(_, kind)| **kind != SignalKind::Hold)
            .map(|(i, kind)| TradingSignal {
                ticker: ticker.to_string(),
                kind: *kind,
                price: prices[i],
                // A non-Hold signal implies both MAs are defined at i.
                short_ma: short_ma[i].unwrap_or(0.0),
                long_ma: long_ma[i].unwrap_or(0.0),
                timestamp: rows[i].date,
            })
            .collect()
    }

    /// Run the strategy over a (ticker, date)-ordered history and produce one
    /// report per ticker that generated signals. Tickers with fewer rows than
    /// the long period are skipped with a warning.
    pub fn run(&self, rows: &[HistoricalRow]) -> Result<Vec<PnlReport>, AppError> {
        let mut reports = Vec::new();
        let mut start = 0usize;
        while start < rows.len() {
            let ticker = rows[start].ticker.as_str();
            let mut end = start + 1;
            while end < rows.len() && rows[end].ticker == ticker {
                end += 1;
            }
            let series = &rows[start..end];
            if series.len() < self.long_period {
                tracing::warn!(
                    ticker,
                    rows = series.len(),
                    long_period = self.long_period,
                    "Insufficient history, skipping ticker"
                );
            } else {
                let signals = self.signals_for_ticker(ticker, series);
                tracing::info!(ticker, signals = signals.len(), "Generated signals");
                if !signals.is_empty() {
                    reports.push(PositionAccountant::report_for(ticker, signals));
                }
            }
            start = end;
        }
        Ok(reports)
    }
}
