use std::path::PathBuf;

use market_pulse::error::AppError;
use market_pulse::strategy::historical::load_history_json;

fn temp_json(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "market_pulse_hist_{}_{}.json",
        std::process::id(),
        name
    ));
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn loads_sorts_and_fills() {
    let path = temp_json(
        "ok",
        r#"[
            {"ticker": "MSFT", "date": "2024-01-02", "price": 401.0},
            {"ticker": "AAPL", "date": "2024-01-03", "price": null},
            {"ticker": "AAPL", "date": "2024-01-02", "price": 185.5},
            {"ticker": "MSFT", "date": "2024-01-03", "price": 405.25}
        ]"#,
    );
    let rows = load_history_json(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].ticker, "AAPL");
    assert!((rows[0].price - 185.5).abs() < f64::EPSILON);
    // The null AAPL price was forward-filled from the prior day.
    assert!((rows[1].price - 185.5).abs() < f64::EPSILON);
    assert_eq!(rows[2].ticker, "MSFT");
}

#[test]
fn missing_column_is_a_data_error() {
    let path = temp_json("badcol", r#"[{"ticker": "AAPL", "price": 185.5}]"#);
    let err = load_history_json(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, AppError::Data(_)), "got {err:?}");
}

#[test]
fn negative_price_is_a_data_error() {
    let path = temp_json(
        "negative",
        r#"[{"ticker": "AAPL", "date": "2024-01-02", "price": -3.0}]"#,
    );
    let err = load_history_json(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(matches!(err, AppError::Data(_)));
}

#[test]
fn empty_input_is_ok_and_empty() {
    let path = temp_json("empty", "[]");
    let rows = load_history_json(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert!(rows.is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_history_json(&PathBuf::from("/nonexistent/history.json")).unwrap_err();
    assert!(matches!(err, AppError::Io(_)));
}
