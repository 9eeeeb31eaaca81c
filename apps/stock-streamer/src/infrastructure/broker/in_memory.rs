//! In-memory recording sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{Acknowledged, BrokerSinkPort, PublishRecord, SinkError};

/// Sink that keeps every accepted record in memory.
///
/// Each accepted record gets the next offset on partition 0. Failures can be
/// queued with [`RecordingSink::fail_next`] to exercise retry paths.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<PublishRecord>>,
    scripted_failures: Mutex<VecDeque<SinkError>>,
    closed: AtomicBool,
}

impl RecordingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue failures returned by the next sends, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = SinkError>) {
        self.scripted_failures.lock().extend(errors);
    }

    /// Snapshot of accepted records.
    #[must_use]
    pub fn records(&self) -> Vec<PublishRecord> {
        self.records.lock().clone()
    }

    /// Number of accepted records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BrokerSinkPort for RecordingSink {
    async fn send(&self, record: &PublishRecord) -> Result<Acknowledged, SinkError> {
        if self.is_closed() {
            return Err(SinkError::Closed);
        }

        if let Some(error) = self.scripted_failures.lock().pop_front() {
            return Err(error);
        }

        let mut records = self.records.lock();
        let offset = i64::try_from(records.len()).unwrap_or(i64::MAX);
        records.push(record.clone());

        Ok(Acknowledged {
            topic: record.topic.clone(),
            partition: 0,
            offset,
            attempts: record.delivery_attempt,
        })
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str) -> PublishRecord {
        PublishRecord {
            topic: "stock_prices".to_string(),
            key: symbol.as_bytes().to_vec(),
            value: b"1".to_vec(),
            delivery_attempt: 1,
        }
    }

    #[tokio::test]
    async fn records_in_order_with_increasing_offsets() {
        let sink = RecordingSink::new();

        let first = sink.send(&record("ACME")).await.unwrap();
        let second = sink.send(&record("MSFT")).await.unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, 1);
        let keys: Vec<_> = sink.records().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![b"ACME".to_vec(), b"MSFT".to_vec()]);
    }

    #[tokio::test]
    async fn scripted_failures_are_returned_first() {
        let sink = RecordingSink::new();
        sink.fail_next([SinkError::Timeout]);

        assert_eq!(sink.send(&record("ACME")).await.unwrap_err(), SinkError::Timeout);
        assert!(sink.send(&record("ACME")).await.is_ok());
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn close_rejects_later_sends() {
        let sink = RecordingSink::new();
        sink.close().await.unwrap();

        assert_eq!(sink.send(&record("ACME")).await.unwrap_err(), SinkError::Closed);
        assert!(sink.is_empty());
    }
}
