use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use market_pulse::monitor::client::MonitorClient;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn price_update(ticker: &str, price: f64, ts: DateTime<Utc>) -> String {
    format!(
        r#"{{"type":"price_update","ticker":"{ticker}","price":{price},"timestamp":"{}"}}"#,
        ts.to_rfc3339()
    )
}

fn client(threshold_pct: f64) -> MonitorClient {
    MonitorClient::new(
        "ws://127.0.0.1:1/ws",
        vec!["AAPL".to_string()],
        threshold_pct,
        5,
        Duration::from_millis(10),
    )
}

#[test]
fn significant_move_produces_alert() {
    let mut client = client(2.0);
    assert!(client
        .handle_message(&price_update("AAPL", 100.0, at(0)), at(0))
        .is_none());
    let alert = client
        .handle_message(&price_update("AAPL", 103.0, at(30)), at(30))
        .expect("3% in 30s should alert");
    assert!(alert.contains("AAPL"), "alert: {alert}");
    assert!(alert.contains("up"), "alert: {alert}");
    assert!(alert.contains("3.00%"), "alert: {alert}");
}

#[test]
fn small_move_is_quiet() {
    let mut client = client(2.0);
    client.handle_message(&price_update("AAPL", 100.0, at(0)), at(0));
    assert!(client
        .handle_message(&price_update("AAPL", 101.0, at(30)), at(30))
        .is_none());
}

#[test]
fn downward_alert_reports_direction() {
    let mut client = client(2.0);
    client.handle_message(&price_update("AAPL", 100.0, at(0)), at(0));
    let alert = client
        .handle_message(&price_update("AAPL", 95.0, at(30)), at(30))
        .unwrap();
    assert!(alert.contains("down"), "alert: {alert}");
}

#[test]
fn malformed_and_confirmation_messages_are_quiet() {
    let mut client = client(2.0);
    assert!(client.handle_message("not json at all", at(0)).is_none());
    assert!(client
        .handle_message(r#"{"type":"unknown_kind","ticker":"AAPL"}"#, at(0))
        .is_none());
    assert!(client
        .handle_message(
            &format!(
                r#"{{"type":"subscription_confirmed","ticker":"AAPL","price":100.0,"timestamp":"{}"}}"#,
                at(0).to_rfc3339()
            ),
            at(0)
        )
        .is_none());
}

/// With nothing listening on the target port, the client burns through its
/// bounded attempt budget and reports the failure instead of retrying
/// forever.
#[tokio::test]
async fn reconnect_budget_exhaustion_is_an_error() {
    let mut client = MonitorClient::new(
        "ws://127.0.0.1:1/ws",
        vec!["AAPL".to_string()],
        2.0,
        3,
        Duration::from_millis(10),
    );
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let err = client.run(shutdown_rx).await.unwrap_err();
    assert!(err.to_string().contains("3 attempts"), "error: {err}");
}

#[tokio::test]
async fn shutdown_stops_retrying_without_error() {
    let mut client = MonitorClient::new(
        "ws://127.0.0.1:1/ws",
        vec!["AAPL".to_string()],
        2.0,
        u32::MAX,
        Duration::from_secs(60),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { client.run(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("client should stop on shutdown")
        .unwrap();
    assert!(result.is_ok());
}
