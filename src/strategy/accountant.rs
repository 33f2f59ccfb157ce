//! Single-position P&L accounting over an ordered signal sequence.

use crate::model::report::PnlReport;
use crate::model::signal::{SignalKind, TradingSignal};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Flat,
    Long,
    Short,
}

/// Books realized P&L under a one-unit, single-position-per-ticker model.
/// A signal in the direction already held is a no-op; an opposite signal
/// closes the position, books the trade, and reverses.
#[derive(Debug)]
pub struct PositionAccountant {
    side: Side,
    avg_cost: f64,
    total_pnl: f64,
    winning_trades: u32,
    losing_trades: u32,
}

impl Default for PositionAccountant {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionAccountant {
    pub fn new() -> Self {
        Self {
            side: Side::Flat,
            avg_cost: 0.0,
            total_pnl: 0.0,
            winning_trades: 0,
            losing_trades: 0,
        }
    }

    pub fn apply(&mut self, kind: SignalKind, price: f64) {
        match kind {
            SignalKind::Buy => match self.side {
                Side::Flat => self.open(Side::Long, price),
                Side::Short => {
                    self.book(self.avg_cost - price);
                    self.open(Side::Long, price);
                }
                Side::Long => {}
            },
            SignalKind::Sell => match self.side {
                Side::Flat => self.open(Side::Short, price),
                Side::Long => {
                    self.book(price - self.avg_cost);
                    self.open(Side::Short, price);
                }
                Side::Short => {}
            },
            SignalKind::Hold => {}
        }
    }

    fn open(&mut self, side: Side, price: f64) {
        self.side = side;
        self.avg_cost = price;
    }

    // Zero P&L counts as a loss; the win check is strictly > 0.
    fn book(&mut self, pnl: f64) {
        self.total_pnl += pnl;
        if pnl > 0.0 {
            self.winning_trades += 1;
        } else {
            self.losing_trades += 1;
        }
    }

    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    pub fn winning_trades(&self) -> u32 {
        self.winning_trades
    }

    pub fn losing_trades(&self) -> u32 {
        self.losing_trades
    }

    /// Percentage of closed round-trips that were profitable, 0 when none
    /// closed.
    pub fn win_rate_percent(&self) -> f64 {
        let total = self.winning_trades + self.losing_trades;
        if total == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / total as f64) * 100.0
    }

    /// Run a full signal sequence for one ticker and fold the outcome into a
    /// report.
    pub fn report_for(ticker: &str, signals: Vec<TradingSignal>) -> PnlReport {
        let mut accountant = Self::new();
        for signal in &signals {
            accountant.apply(signal.kind, signal.price);
        }
        PnlReport {
            ticker: ticker.to_string(),
            total_signals: signals.len(),
            total_pnl: accountant.total_pnl,
            winning_trades: accountant.winning_trades,
            losing_trades: accountant.losing_trades,
            win_rate: accountant.win_rate_percent(),
            signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_round_trip_books_profit() {
        let mut acct = PositionAccountant::new();
        acct.apply(SignalKind::Buy, 100.0);
        assert!((acct.total_pnl() - 0.0).abs() < f64::EPSILON);
        acct.apply(SignalKind::Sell, 110.0);
        assert!((acct.total_pnl() - 10.0).abs() < f64::EPSILON);
        assert_eq!(acct.winning_trades(), 1);
        assert_eq!(acct.losing_trades(), 0);
    }

    #[test]
    fn repeated_buys_do_not_add() {
        let mut acct = PositionAccountant::new();
        acct.apply(SignalKind::Buy, 100.0);
        acct.apply(SignalKind::Buy, 90.0);
        acct.apply(SignalKind::Sell, 105.0);
        // Entry stays at the first buy.
        assert!((acct.total_pnl() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_pnl_counts_as_loss() {
        let mut acct = PositionAccountant::new();
        acct.apply(SignalKind::Buy, 100.0);
        acct.apply(SignalKind::Sell, 100.0);
        assert_eq!(acct.winning_trades(), 0);
        assert_eq!(acct.losing_trades(), 1);
        assert!((acct.win_rate_percent() - 0.0).abs() < f64::EPSILON);
    }
}
