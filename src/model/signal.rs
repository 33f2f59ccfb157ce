use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// A BUY or SELL decision emitted by the crossover detector, with the moving
/// averages that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingSignal {
    pub ticker: String,
    pub kind: SignalKind,
    pub price: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    pub timestamp: DateTime<Utc>,
}
