use serde::Serialize;

use super::signal::TradingSignal;

/// Realized outcome of running the crossover strategy over one ticker's
/// history.
#[derive(Debug, Clone, Serialize)]
pub struct PnlReport {
    pub ticker: String,
    pub total_signals: usize,
    pub total_pnl: f64,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub signals: Vec<TradingSignal>,
}

/// Format an amount as dollars with thousands separators, e.g. `$1,234.56`.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, frac)
}
