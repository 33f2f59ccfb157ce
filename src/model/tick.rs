use chrono::{DateTime, Utc};

/// One timestamped price observation for a ticker. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub ticker: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(ticker: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            timestamp,
        }
    }
}

/// Round a price to cents for the wire and persistence boundaries.
pub fn round_to_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert!((round_to_cents(123.456) - 123.46).abs() < f64::EPSILON);
        assert!((round_to_cents(123.454) - 123.45).abs() < f64::EPSILON);
        assert!((round_to_cents(1.0) - 1.0).abs() < f64::EPSILON);
    }
}
