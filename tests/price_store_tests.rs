use chrono::{Duration, TimeZone, Utc};

use market_pulse::model::tick::Tick;
use market_pulse::price_store::PriceStore;

fn temp_store(name: &str) -> PriceStore {
    let path = std::env::temp_dir().join(format!(
        "market_pulse_store_{}_{}.sqlite",
        std::process::id(),
        name
    ));
    std::fs::remove_file(&path).ok();
    PriceStore::new(path)
}

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

#[test]
fn record_and_query_prices_in_time_order() {
    let store = temp_store("prices");
    store
        .record_price(&Tick::new("AAPL", 185.5, at(0)))
        .unwrap();
    store
        .record_price(&Tick::new("AAPL", 186.0, at(60)))
        .unwrap();
    store
        .record_price(&Tick::new("MSFT", 400.0, at(30)))
        .unwrap();

    let prices = store.prices_since("AAPL", at(0)).unwrap();
    assert_eq!(prices, vec![185.5, 186.0]);

    // The since bound excludes older rows.
    let prices = store.prices_since("AAPL", at(30)).unwrap();
    assert_eq!(prices, vec![186.0]);

    std::fs::remove_file(store.path()).ok();
}

#[test]
fn prices_are_rounded_to_cents_on_write() {
    let store = temp_store("rounding");
    store
        .record_price(&Tick::new("AAPL", 187.2549, at(0)))
        .unwrap();
    let prices = store.prices_since("AAPL", at(0)).unwrap();
    assert!((prices[0] - 187.25).abs() < f64::EPSILON);
    std::fs::remove_file(store.path()).ok();
}

#[test]
fn load_history_orders_by_ticker_then_time() {
    let store = temp_store("history");
    store
        .record_price(&Tick::new("MSFT", 400.0, at(0)))
        .unwrap();
    store
        .record_price(&Tick::new("AAPL", 186.0, at(60)))
        .unwrap();
    store
        .record_price(&Tick::new("AAPL", 185.0, at(0)))
        .unwrap();

    let rows = store.load_history().unwrap();
    let order: Vec<(&str, f64)> = rows.iter().map(|r| (r.ticker.as_str(), r.price)).collect();
    assert_eq!(order, vec![("AAPL", 185.0), ("AAPL", 186.0), ("MSFT", 400.0)]);
    std::fs::remove_file(store.path()).ok();
}

#[test]
fn record_average_round_trip() {
    let store = temp_store("averages");
    let computed_at = at(300);
    store
        .record_average("AAPL", 185.756, 300, computed_at)
        .unwrap();

    let rows = store.recent_averages("AAPL", 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].average_price - 185.76).abs() < f64::EPSILON);
    assert_eq!(rows[0].window_secs, 300);
    assert_eq!(rows[0].computed_at, computed_at);
    std::fs::remove_file(store.path()).ok();
}

#[test]
fn empty_store_queries_are_empty() {
    let store = temp_store("empty");
    assert!(store.prices_since("AAPL", at(0)).unwrap().is_empty());
    assert!(store.load_history().unwrap().is_empty());
    assert!(store.recent_averages("AAPL", 5).unwrap().is_empty());
    std::fs::remove_file(store.path()).ok();
}

#[test]
fn since_window_matches_duration_arithmetic() {
    let store = temp_store("window");
    let now = at(1_000);
    store
        .record_price(&Tick::new("AAPL", 100.0, now - Duration::seconds(400)))
        .unwrap();
    store
        .record_price(&Tick::new("AAPL", 101.0, now - Duration::seconds(100)))
        .unwrap();
    let prices = store
        .prices_since("AAPL", now - Duration::seconds(300))
        .unwrap();
    assert_eq!(prices, vec![101.0]);
    std::fs::remove_file(store.path()).ok();
}
