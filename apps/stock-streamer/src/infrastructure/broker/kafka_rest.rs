//! Kafka REST Proxy Sink
//!
//! Produces records through the REST Proxy v2 binary embedded format:
//!
//! ```text
//! POST {rest_url}/topics/{topic}
//! Content-Type: application/vnd.kafka.binary.v2+json
//!
//! {"records":[{"key":"<base64>","value":"<base64>"}]}
//! ```
//!
//! A record counts as acknowledged only when the proxy answers 200 and the
//! first offset entry carries a partition and offset without an error code.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::application::ports::{Acknowledged, BrokerSinkPort, PublishRecord, SinkError};

const CONTENT_TYPE: &str = "application/vnd.kafka.binary.v2+json";
const ACCEPT: &str = "application/vnd.kafka.v2+json";

#[derive(Debug, Deserialize)]
struct ProduceResponse {
    #[serde(default)]
    offsets: Vec<PartitionOffset>,
}

#[derive(Debug, Deserialize)]
struct PartitionOffset {
    partition: Option<i32>,
    offset: Option<i64>,
    error_code: Option<i64>,
    error: Option<String>,
}

/// Broker sink backed by a Kafka REST Proxy.
///
/// One `reqwest::Client` (and its connection pool) is shared by every
/// concurrent send.
#[derive(Debug)]
pub struct KafkaRestSink {
    http_client: reqwest::Client,
    rest_url: String,
    closed: AtomicBool,
}

impl KafkaRestSink {
    /// Create a sink for the proxy at `rest_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(rest_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("stock-streamer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BrokerSinkPort for KafkaRestSink {
    async fn send(&self, record: &PublishRecord) -> Result<Acknowledged, SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }

        let body = json!({
            "records": [{
                "key": BASE64.encode(&record.key),
                "value": BASE64.encode(&record.value),
            }]
        });

        let url = format!("{}/topics/{}", self.rest_url, record.topic);
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .body(body.to_string())
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(classify_status(status, text));
        }

        let parsed: ProduceResponse =
            serde_json::from_str(&text).map_err(|e| SinkError::Unavailable {
                status: Some(status.as_u16()),
                message: format!("unreadable produce response: {e}"),
            })?;

        let entry = parsed
            .offsets
            .into_iter()
            .next()
            .ok_or_else(|| SinkError::Unavailable {
                status: Some(status.as_u16()),
                message: "produce response carried no offsets".to_string(),
            })?;

        match entry {
            PartitionOffset {
                error_code: Some(code),
                error,
                ..
            } => Err(SinkError::Unavailable {
                status: Some(status.as_u16()),
                message: format!(
                    "record error {code}: {}",
                    error.unwrap_or_else(|| "unknown".to_string())
                ),
            }),
            PartitionOffset {
                partition: Some(partition),
                offset: Some(offset),
                ..
            } => Ok(Acknowledged {
                topic: record.topic.clone(),
                partition,
                offset,
                attempts: record.delivery_attempt,
            }),
            _ => Err(SinkError::Unavailable {
                status: Some(status.as_u16()),
                message: "produce response missing partition or offset".to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(rest_url = %self.rest_url, "Kafka REST sink closed");
        }
        Ok(())
    }
}

fn classify_transport_error(error: reqwest::Error) -> SinkError {
    if error.is_timeout() {
        SinkError::Timeout
    } else {
        SinkError::Connection {
            message: error.to_string(),
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> SinkError {
    let retryable = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;

    if retryable {
        SinkError::Unavailable {
            status: Some(status.as_u16()),
            message: body,
        }
    } else {
        SinkError::Rejected {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record() -> PublishRecord {
        PublishRecord {
            topic: "stock_prices".to_string(),
            key: b"ACME".to_vec(),
            value: b"123.45".to_vec(),
            delivery_attempt: 2,
        }
    }

    #[test_case(500, true ; "server error")]
    #[test_case(503, true ; "unavailable")]
    #[test_case(408, true ; "request timeout")]
    #[test_case(429, true ; "too many requests")]
    #[test_case(404, false ; "unknown topic")]
    #[test_case(422, false ; "unprocessable")]
    fn status_classification(status: u16, retryable: bool) {
        let err = classify_status(StatusCode::from_u16(status).unwrap(), String::new());
        assert_eq!(err.is_retryable(), retryable);
    }

    #[tokio::test]
    async fn send_posts_base64_record_and_reads_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/topics/stock_prices"))
            .and(header("content-type", CONTENT_TYPE))
            .and(body_json(json!({
                "records": [{"key": "QUNNRQ==", "value": "MTIzLjQ1"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key_schema_id": null,
                "value_schema_id": null,
                "offsets": [{"partition": 3, "offset": 42, "error_code": null, "error": null}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = KafkaRestSink::new(server.uri()).unwrap();
        let ack = sink.send(&record()).await.unwrap();

        assert_eq!(
            ack,
            Acknowledged {
                topic: "stock_prices".to_string(),
                partition: 3,
                offset: 42,
                attempts: 2,
            }
        );
    }

    #[tokio::test]
    async fn record_error_code_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "offsets": [{"partition": null, "offset": null, "error_code": 50002, "error": "leader not available"}]
            })))
            .mount(&server)
            .await;

        let sink = KafkaRestSink::new(server.uri()).unwrap();
        let err = sink.send(&record()).await.unwrap_err();

        assert!(matches!(err, SinkError::Unavailable { .. }));
        assert!(err.to_string().contains("leader not available"));
    }

    #[tokio::test]
    async fn client_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"error_code": 42202, "message": "bad record"})),
            )
            .mount(&server)
            .await;

        let sink = KafkaRestSink::new(server.uri()).unwrap();
        let err = sink.send(&record()).await.unwrap_err();

        assert!(matches!(err, SinkError::Rejected { status: 422, .. }));
    }

    #[tokio::test]
    async fn closed_sink_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let sink = KafkaRestSink::new(server.uri()).unwrap();
        sink.close().await.unwrap();

        assert!(sink.is_closed());
        assert_eq!(sink.send(&record()).await.unwrap_err(), SinkError::Closed);
    }

    #[tokio::test]
    async fn unreachable_proxy_is_connection_error() {
        let sink = KafkaRestSink::new("http://127.0.0.1:1").unwrap();
        let err = sink.send(&record()).await.unwrap_err();
        assert!(matches!(err, SinkError::Connection { .. }));
    }
}
