//! # Structured Log Records — Transaction-Scoped Ring Buffer
//!
//! `TxLogger` is the logger bound to a single transaction: every call emits
//! a `tracing` event on the process-wide subscriber (so an operator watching
//! ordinary logs sees transaction activity as it happens) *and* appends a
//! `LogRecord` to an in-memory ring (`LogCollector`) owned by the
//! transaction itself, so the record survives independent of whatever
//! subscriber (if any) is installed and can be replayed to an external sink
//! for diagnostics.
//!
//! Internal levels are `tracing::Level` directly — there is no separate
//! level enum to keep in sync with the subscriber's own notion of severity.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::ids::TransactionId;
use crate::origin::Origin;
use crate::temporal::Timestamp;

/// A coerced attribute value attached to a log record.
///
/// Values are coerced per the diagnostic serialization contract: booleans
/// and numbers keep their native JSON representation; everything else
/// (including values that don't fit `bool`/number/string) is rendered to
/// its string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// A boolean attribute.
    Bool(bool),
    /// An integer or floating-point attribute.
    Number(f64),
    /// A string attribute, or the string form of anything else.
    Str(String),
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Number(v as f64)
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::Number(v as f64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Number(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_string())
    }
}

impl AttrValue {
    /// Coerce an arbitrary `Debug` value to its string form, for anything
    /// that is not a bool, number, or string.
    pub fn other(value: impl std::fmt::Debug) -> Self {
        AttrValue::Str(format!("{value:?}"))
    }
}

/// A single structured-log record captured by a transaction's logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// When the record was emitted.
    pub timestamp: Timestamp,
    /// Severity, bucketed for external observers at serialization time.
    #[serde(with = "level_serde")]
    pub level: Level,
    /// Human-readable message.
    pub message: String,
    /// Key-value attributes attached to the record.
    pub attributes: Vec<(String, AttrValue)>,
}

mod level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, s: S) -> Result<S::Ok, S::Error> {
        level.as_str().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Level, D::Error> {
        let s = String::deserialize(d)?;
        s.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

/// External, four-bucket severity used by the diagnostic serialization
/// contract. `TRACE`/`DEBUG` collapse to `debug`; the rest map one-to-one.
pub fn external_level_bucket(level: Level) -> &'static str {
    match level {
        Level::TRACE | Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// An in-memory ring buffer of `LogRecord`s, capped at a fixed capacity.
/// Oldest records are evicted first once the cap is reached.
#[derive(Debug)]
pub struct LogCollector {
    capacity: usize,
    records: Mutex<VecDeque<LogRecord>>,
}

impl LogCollector {
    /// Create a new collector with the given capacity. A capacity of zero
    /// discards every record immediately.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    fn push(&self, record: LogRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock().expect("log collector mutex poisoned");
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Snapshot all currently retained records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().expect("log collector mutex poisoned").iter().cloned().collect()
    }

    /// Replay every retained record, oldest first, to an external sink.
    pub fn replay(&self, mut sink: impl FnMut(&LogRecord)) {
        for record in self.records.lock().expect("log collector mutex poisoned").iter() {
            sink(record);
        }
    }
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// A replay destination for retained log records, e.g. an external
/// structured-log sink that a surrounding application wires up.
pub trait LogSink {
    /// Accept one replayed record.
    fn accept(&mut self, record: &LogRecord);
}

impl<F: FnMut(&LogRecord)> LogSink for F {
    fn accept(&mut self, record: &LogRecord) {
        self(record)
    }
}

/// A logger bound to one transaction, pre-decorated with the transaction's
/// id and origin metadata. Every call both emits a `tracing` event and
/// appends to the transaction's own `LogCollector`.
#[derive(Debug)]
pub struct TxLogger {
    id: TransactionId,
    origin: Origin,
    collector: std::sync::Arc<LogCollector>,
}

impl TxLogger {
    /// Bind a new logger to a transaction id, origin, and backing collector.
    pub fn new(id: TransactionId, origin: Origin, collector: std::sync::Arc<LogCollector>) -> Self {
        Self { id, origin, collector }
    }

    /// Access the backing collector, e.g. to retrieve or replay records.
    pub fn collector(&self) -> &std::sync::Arc<LogCollector> {
        &self.collector
    }

    /// Emit a record at the given level with the given attributes.
    pub fn log(&self, level: Level, message: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        let message = message.into();
        let request_id = self
            .origin
            .correlation_id
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_default();

        match level {
            Level::TRACE => tracing::trace!(
                transaction_id = %self.id,
                origin = %self.origin.kind,
                source_detail = %self.origin.source_detail,
                request_id = %request_id,
                "{message}"
            ),
            Level::DEBUG => tracing::debug!(
                transaction_id = %self.id,
                origin = %self.origin.kind,
                source_detail = %self.origin.source_detail,
                request_id = %request_id,
                "{message}"
            ),
            Level::INFO => tracing::info!(
                transaction_id = %self.id,
                origin = %self.origin.kind,
                source_detail = %self.origin.source_detail,
                request_id = %request_id,
                "{message}"
            ),
            Level::WARN => tracing::warn!(
                transaction_id = %self.id,
                origin = %self.origin.kind,
                source_detail = %self.origin.source_detail,
                request_id = %request_id,
                "{message}"
            ),
            Level::ERROR => tracing::error!(
                transaction_id = %self.id,
                origin = %self.origin.kind,
                source_detail = %self.origin.source_detail,
                request_id = %request_id,
                "{message}"
            ),
        }

        self.collector.push(LogRecord {
            timestamp: Timestamp::now(),
            level,
            message,
            attributes,
        });
    }

    /// Convenience wrapper for `Level::INFO`.
    pub fn info(&self, message: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        self.log(Level::INFO, message, attributes)
    }

    /// Convenience wrapper for `Level::WARN`.
    pub fn warn(&self, message: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        self.log(Level::WARN, message, attributes)
    }

    /// Convenience wrapper for `Level::ERROR`.
    pub fn error(&self, message: impl Into<String>, attributes: Vec<(String, AttrValue)>) {
        self.log(Level::ERROR, message, attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_evicts_oldest() {
        let c = LogCollector::new(2);
        for i in 0..5 {
            c.push(LogRecord {
                timestamp: Timestamp::now(),
                level: Level::INFO,
                message: format!("msg-{i}"),
                attributes: vec![],
            });
        }
        let records = c.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "msg-3");
        assert_eq!(records[1].message, "msg-4");
    }

    #[test]
    fn test_zero_capacity_discards() {
        let c = LogCollector::new(0);
        c.push(LogRecord {
            timestamp: Timestamp::now(),
            level: Level::INFO,
            message: "dropped".into(),
            attributes: vec![],
        });
        assert!(c.records().is_empty());
    }

    #[test]
    fn test_external_level_bucket_mapping() {
        assert_eq!(external_level_bucket(Level::TRACE), "debug");
        assert_eq!(external_level_bucket(Level::DEBUG), "debug");
        assert_eq!(external_level_bucket(Level::INFO), "info");
        assert_eq!(external_level_bucket(Level::WARN), "warn");
        assert_eq!(external_level_bucket(Level::ERROR), "error");
    }

    #[test]
    fn test_tx_logger_appends_to_collector() {
        let collector = std::sync::Arc::new(LogCollector::new(8));
        let logger = TxLogger::new(
            TransactionId::new(),
            Origin::test("unit_test"),
            collector.clone(),
        );
        logger.info("validating", vec![("state".to_string(), AttrValue::from("validating"))]);
        let records = collector.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "validating");
        assert_eq!(records[0].level, Level::INFO);
    }

    #[test]
    fn test_replay_visits_in_order() {
        let collector = LogCollector::new(8);
        collector.push(LogRecord {
            timestamp: Timestamp::now(),
            level: Level::INFO,
            message: "a".into(),
            attributes: vec![],
        });
        collector.push(LogRecord {
            timestamp: Timestamp::now(),
            level: Level::INFO,
            message: "b".into(),
            attributes: vec![],
        });
        let mut seen = vec![];
        collector.replay(|r| seen.push(r.message.clone()));
        assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    }
}
