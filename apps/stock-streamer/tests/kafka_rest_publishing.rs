//! Kafka REST Publishing Integration Tests
//!
//! Exercises the publisher's retry policy against a mocked REST Proxy.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_streamer::{
    BackoffConfig, BrokerSinkPort, KafkaRestSink, NormalizedQuote, PublishError, Publisher,
    PublisherConfig, QuoteWireFormat, Symbol,
};

fn quote() -> NormalizedQuote {
    NormalizedQuote::new(
        Symbol::parse("ACME").unwrap(),
        dec!(123.45),
        Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap(),
    )
    .unwrap()
}

fn publisher_for(sink: Arc<KafkaRestSink>, wire_format: QuoteWireFormat) -> Publisher {
    Publisher::new(
        sink,
        PublisherConfig {
            wire_format,
            backoff: BackoffConfig::immediate(),
            attempt_timeout: Duration::from_secs(2),
            ..PublisherConfig::default()
        },
    )
}

fn offsets(partition: i32, offset: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "offsets": [{"partition": partition, "offset": offset, "error_code": null, "error": null}]
    }))
}

#[tokio::test]
async fn retries_unavailable_proxy_until_acknowledged() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/topics/stock_prices"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&proxy)
        .await;
    Mock::given(method("POST"))
        .and(path("/topics/stock_prices"))
        .respond_with(offsets(1, 7))
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    let publisher = publisher_for(sink, QuoteWireFormat::JsonV1);

    let ack = publisher
        .publish(&quote(), 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ack.attempts, 3);
    assert_eq!(ack.partition, 1);
    assert_eq!(ack.offset, 7);
}

#[tokio::test]
async fn exhausted_attempts_report_broker_unavailable() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    let publisher = publisher_for(sink, QuoteWireFormat::JsonV1);

    let err = publisher
        .publish(&quote(), 4, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::BrokerUnavailable { attempts: 4, .. }));
}

#[tokio::test]
async fn rejected_record_is_not_retried() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("topic not found"))
        .expect(1)
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    let publisher = publisher_for(sink, QuoteWireFormat::JsonV1);

    let err = publisher
        .publish(&quote(), 5, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Rejected { attempts: 1, .. }));
}

#[tokio::test]
async fn legacy_text_encoding_sends_bare_price() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(wiremock::matchers::body_json(json!({
            "records": [{"key": "QUNNRQ==", "value": "MTIzLjQ1"}]
        })))
        .respond_with(offsets(0, 0))
        .expect(1)
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    let publisher = publisher_for(sink, QuoteWireFormat::TextV0);

    publisher
        .publish(&quote(), 1, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn closed_sink_stops_publishing() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(offsets(0, 0))
        .expect(0)
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    sink.close().await.unwrap();
    let publisher = publisher_for(sink, QuoteWireFormat::JsonV1);

    let err = publisher
        .publish(&quote(), 5, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::BrokerUnavailable { .. }));
}

#[tokio::test]
async fn cancelled_publish_makes_no_attempt() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(offsets(0, 0))
        .expect(0)
        .mount(&proxy)
        .await;

    let sink = Arc::new(KafkaRestSink::new(proxy.uri()).unwrap());
    let publisher = publisher_for(sink, QuoteWireFormat::JsonV1);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = publisher.publish(&quote(), 5, &cancel).await.unwrap_err();

    assert!(matches!(err, PublishError::Cancelled { attempts: 0 }));
}
