//! Client-side sliding window over received prices, with short-term swing
//! detection.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

/// Maximum age of retained points.
const RETENTION: Duration = Duration::hours(1);
/// Sub-window the significance check looks at.
const CHECK_WINDOW: Duration = Duration::seconds(60);

pub fn percentage_change(old_price: f64, new_price: f64) -> f64 {
    if old_price == 0.0 {
        return 0.0;
    }
    ((new_price - old_price) / old_price) * 100.0
}

/// Per-ticker price window trimmed to the trailing hour. The significance
/// check compares the earliest and latest point of the trailing minute, not
/// the extremes, so an intra-window spike that reverts can go unnoticed.
/// Known limitation, kept deliberately.
#[derive(Debug, Default)]
pub struct PriceTracker {
    threshold_pct: f64,
    history: HashMap<String, VecDeque<(f64, DateTime<Utc>)>>,
}

impl PriceTracker {
    pub fn new(threshold_pct: f64) -> Self {
        Self {
            threshold_pct,
            history: HashMap::new(),
        }
    }

    /// Append a point and trim everything older than the retention horizon.
    /// Insertion order is time order.
    pub fn add_price(&mut self, ticker: &str, price: f64, timestamp: DateTime<Utc>) {
        let window = self.history.entry(ticker.to_string()).or_default();
        window.push_back((price, timestamp));
        let cutoff = timestamp - RETENTION;
        while matches!(window.front(), Some((_, t)) if *t < cutoff) {
            window.pop_front();
        }
    }

    /// Endpoints of the trailing minute as of `now`: (oldest, newest, pct
    /// change). `None` with fewer than 2 points in that sub-window.
    pub fn recent_change(&self, ticker: &str, now: DateTime<Utc>) -> Option<(f64, f64, f64)> {
        let window = self.history.get(ticker)?;
        let cutoff = now - CHECK_WINDOW;
        let mut recent = window.iter().filter(|(_, t)| *t >= cutoff);
        let (oldest, _) = *recent.next()?;
        let (newest, _) = *recent.last()?;
        Some((oldest, newest, percentage_change(oldest, newest)))
    }

    /// True when the trailing-minute endpoint change meets the threshold.
    pub fn check_significant_change(&self, ticker: &str, now: DateTime<Utc>) -> bool {
        match self.recent_change(ticker, now) {
            Some((_, _, pct)) => pct.abs() >= self.threshold_pct,
            None => false,
        }
    }

    pub fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn single_point_is_never_significant() {
        let mut tracker = PriceTracker::new(2.0);
        tracker.add_price("AAPL", 100.0, at(0));
        assert!(!tracker.check_significant_change("AAPL", at(1)));
    }

    #[test]
    fn compares_endpoints_not_extremes() {
        let mut tracker = PriceTracker::new(2.0);
        tracker.add_price("AAPL", 100.0, at(0));
        // A 10% spike that fully reverts inside the minute.
        tracker.add_price("AAPL", 110.0, at(20));
        tracker.add_price("AAPL", 100.5, at(40));
        assert!(!tracker.check_significant_change("AAPL", at(41)));
    }

    #[test]
    fn trims_points_older_than_an_hour() {
        let mut tracker = PriceTracker::new(2.0);
        tracker.add_price("AAPL", 50.0, at(0));
        tracker.add_price("AAPL", 100.0, at(3_700));
        let window = tracker.history.get("AAPL").unwrap();
        assert_eq!(window.len(), 1);
    }
}
