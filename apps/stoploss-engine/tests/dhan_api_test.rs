//! Dhan Adapter Integration Tests
//!
//! Exercises the REST adapter against a mock server: envelope handling,
//! wire-shape fidelity (including the fund-limit field misspelling), retry
//! behavior, and the LTP backup quote path.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use rust_decimal_macros::dec;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use stoploss_engine::infrastructure::broker::dhan::RetryConfig;
use stoploss_engine::{
    BrokerError, BrokerPort, DhanBrokerAdapter, DhanConfig, QuoteProviderPort, SellOrder, Symbol,
};

fn adapter_for(server: &MockServer) -> DhanBrokerAdapter {
    let config = DhanConfig::new("client-1".to_string(), "token-1".to_string())
        .with_base_url(server.uri())
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
            multiplier: 2.0,
        });
    DhanBrokerAdapter::new(&config).expect("adapter should build")
}

const HOLDINGS_BODY: &str = r#"{
    "status": "success",
    "data": [
        {
            "tradingSymbol": "TCS",
            "securityId": "11536",
            "totalQty": 10,
            "avgCostPrice": 3500.0,
            "lastPrice": 3400.0
        },
        {
            "tradingSymbol": "RELIANCE",
            "securityId": "2885",
            "totalQty": 0,
            "avgCostPrice": 2400.0,
            "lastPrice": 0.0
        }
    ]
}"#;

#[tokio::test]
async fn holdings_are_fetched_with_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings"))
        .and(header("access-token", "token-1"))
        .and(header("client-id", "client-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(HOLDINGS_BODY, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = adapter_for(&server).get_holdings().await.unwrap();

    assert_eq!(snapshot.positions.len(), 2);
    assert_eq!(snapshot.positions[0].symbol.as_str(), "TCS");
    assert_eq!(snapshot.positions[0].quantity, 10);
    assert_eq!(snapshot.positions[0].average_cost, dec!(3500));
    // Zero-quantity holding is carried but not eligible.
    assert_eq!(snapshot.eligible_positions().count(), 1);
}

#[tokio::test]
async fn failure_envelope_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "failure", "remarks": "Invalid token"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = adapter_for(&server).get_holdings().await.unwrap_err();
    assert!(matches!(err, BrokerError::RequestRejected { .. }));
}

#[tokio::test]
async fn malformed_body_is_an_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>gateway</html>", "text/html"))
        .mount(&server)
        .await;

    let err = adapter_for(&server).get_holdings().await.unwrap_err();
    assert!(matches!(err, BrokerError::UnexpectedResponse { .. }));
}

/// Fails with 503 on the first call, then succeeds.
struct FlakyOnce {
    body: &'static str,
    hits: std::sync::atomic::AtomicU32,
}

impl Respond for FlakyOnce {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if n == 0 {
            ResponseTemplate::new(503)
        } else {
            ResponseTemplate::new(200).set_body_raw(self.body, "application/json")
        }
    }
}

#[tokio::test]
async fn transient_503_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings"))
        .respond_with(FlakyOnce {
            body: HOLDINGS_BODY,
            hits: std::sync::atomic::AtomicU32::new(0),
        })
        .expect(2)
        .mount(&server)
        .await;

    let snapshot = adapter_for(&server).get_holdings().await.unwrap();
    assert_eq!(snapshot.positions.len(), 2);
}

#[tokio::test]
async fn unauthorized_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fundlimit"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = adapter_for(&server)
        .get_available_funds()
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::AuthenticationFailed));
}

#[tokio::test]
async fn fund_limit_reads_the_misspelled_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fundlimit"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "success", "data": {"availabelBalance": 98765.43}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let funds = adapter_for(&server).get_available_funds().await.unwrap();
    assert_eq!(funds, dec!(98765.43));
}

#[tokio::test]
async fn market_sell_posts_the_zero_price_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(body_partial_json(serde_json::json!({
            "dhanClientId": "client-1",
            "transactionType": "SELL",
            "exchangeSegment": "NSE_EQ",
            "productType": "CNC",
            "orderType": "MARKET",
            "validity": "DAY",
            "securityId": "11536",
            "quantity": 10,
            "price": 0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "success", "data": {"orderId": "112111182045", "orderStatus": "TRANSIT"}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let ack = adapter_for(&server)
        .place_market_sell(&SellOrder {
            security_id: "11536".to_string(),
            symbol: Symbol::new("TCS"),
            quantity: 10,
        })
        .await
        .unwrap();

    assert_eq!(ack.order_id, "112111182045");
    assert_eq!(ack.status, "TRANSIT");
}

#[tokio::test]
async fn rejected_order_surfaces_remarks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "failure", "remarks": {"error_code": "DH-905", "message": "Market closed"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = adapter_for(&server)
        .place_market_sell(&SellOrder {
            security_id: "11536".to_string(),
            symbol: Symbol::new("TCS"),
            quantity: 10,
        })
        .await
        .unwrap_err();

    match err {
        BrokerError::RequestRejected { remarks } => assert!(remarks.contains("DH-905")),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn ltp_backup_quote_uses_the_holdings_security_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/holdings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(HOLDINGS_BODY, "application/json"),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/marketfeed/ltp"))
        .and(body_partial_json(serde_json::json!({"NSE_EQ": [11536]})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status": "success", "data": {"NSE_EQ": {"11536": {"last_price": 3410.5}}}}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = adapter_for(&server);
    adapter.get_holdings().await.unwrap();

    let price = adapter.last_price(&Symbol::new("TCS")).await.unwrap();
    assert_eq!(price, dec!(3410.5));
}

#[tokio::test]
async fn ltp_for_unknown_symbol_is_unavailable() {
    let server = MockServer::start().await;
    let adapter = adapter_for(&server);

    // No holdings fetch yet, so no symbol-to-ID mapping exists.
    let err = adapter.last_price(&Symbol::new("INFY")).await.unwrap_err();
    assert!(err.to_string().contains("INFY"));
}
