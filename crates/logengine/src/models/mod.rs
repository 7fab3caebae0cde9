// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace entities buffered by the agent.
//!
//! Transactions and spans are shared handles: the agent hands the same handle
//! to the caller and to the queue, so a span ended after it was enqueued is
//! serialized with its end timestamp. Records are snapshots taken when a
//! batch is encoded, never at enqueue time.

pub mod error;
pub mod log;
pub mod span;
pub mod transaction;

use serde::Serialize;
use std::fmt;

use crate::errors::EntryError;

pub use error::{ErrorEvent, ErrorRecord};
pub use log::LogEntry;
pub use span::{Span, SpanRecord};
pub use transaction::{Transaction, TransactionRecord};

/// Milliseconds since the unix epoch, with sub-millisecond precision.
#[must_use]
pub fn now_millis() -> f64 {
    std::time::UNIX_EPOCH
        .elapsed()
        .map_or(0.0, |elapsed| elapsed.as_secs_f64() * 1_000.0)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Start/end bookkeeping shared by transactions and spans.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Timing {
    pub(crate) start: Option<f64>,
    pub(crate) end: Option<f64>,
}

impl Timing {
    pub(crate) fn start(&mut self) {
        self.start = Some(now_millis());
        self.end = None;
    }

    /// The first `end()` wins; a second call is rejected and leaves the
    /// recorded end timestamp untouched.
    pub(crate) fn end(&mut self, kind: &'static str, id: &str) -> Result<f64, EntryError> {
        let Some(start) = self.start else {
            return Err(EntryError::NotStarted {
                kind,
                id: id.to_string(),
            });
        };
        if self.end.is_some() {
            return Err(EntryError::AlreadyEnded {
                kind,
                id: id.to_string(),
            });
        }
        let end = now_millis().max(start);
        self.end = Some(end);
        Ok(end - start)
    }

    pub(crate) fn duration(&self) -> Option<f64> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Transaction,
    Span,
    Error,
    Log,
}

impl EntryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Transaction => "transaction",
            EntryKind::Span => "span",
            EntryKind::Error => "error",
            EntryKind::Log => "log",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the queue can hold.
#[derive(Debug, Clone)]
pub enum Entry {
    Transaction(Transaction),
    Span(Span),
    Error(ErrorEvent),
    Log(LogEntry),
}

impl Entry {
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Transaction(_) => EntryKind::Transaction,
            Entry::Span(_) => EntryKind::Span,
            Entry::Error(_) => EntryKind::Error,
            Entry::Log(_) => EntryKind::Log,
        }
    }

    /// Transactions open a new root context and always take the pinned slot.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Entry::Transaction(_))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Entry::Transaction(transaction) => transaction.id(),
            Entry::Span(span) => span.id(),
            Entry::Error(error) => error.id(),
            Entry::Log(log) => &log.id,
        }
    }

    /// Snapshots the entry into its wire representation.
    #[must_use]
    pub fn record(&self) -> Record {
        match self {
            Entry::Transaction(transaction) => Record::Transaction(transaction.record()),
            Entry::Span(span) => Record::Span(span.record()),
            Entry::Error(error) => Record::Error(error.record()),
            Entry::Log(log) => Record::Log(log.clone()),
        }
    }
}

impl From<Transaction> for Entry {
    fn from(transaction: Transaction) -> Self {
        Entry::Transaction(transaction)
    }
}

impl From<Span> for Entry {
    fn from(span: Span) -> Self {
        Entry::Span(span)
    }
}

impl From<ErrorEvent> for Entry {
    fn from(error: ErrorEvent) -> Self {
        Entry::Error(error)
    }
}

impl From<LogEntry> for Entry {
    fn from(log: LogEntry) -> Self {
        Entry::Log(log)
    }
}

/// One element of the JSON array posted on flush.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Transaction(TransactionRecord),
    Span(SpanRecord),
    Error(ErrorRecord),
    Log(LogEntry),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_end_before_start() {
        let mut timing = Timing::default();
        let err = timing.end("span", "abc").unwrap_err();
        assert_eq!(
            err,
            EntryError::NotStarted {
                kind: "span",
                id: "abc".to_string()
            }
        );
        assert!(timing.end.is_none());
    }

    #[test]
    fn test_timing_second_end_is_rejected() {
        let mut timing = Timing::default();
        timing.start();
        let duration = timing.end("transaction", "abc").unwrap();
        assert!(duration >= 0.0);
        let first_end = timing.end;

        assert!(matches!(
            timing.end("transaction", "abc"),
            Err(EntryError::AlreadyEnded { .. })
        ));
        assert_eq!(timing.end, first_end);
        assert_eq!(timing.duration(), Some(duration));
    }

    #[test]
    fn test_restart_clears_end() {
        let mut timing = Timing::default();
        timing.start();
        timing.end("span", "abc").unwrap();
        timing.start();
        assert!(timing.end.is_none());
        assert!(timing.duration().is_none());
    }

    #[test]
    fn test_record_discriminator() {
        let transaction = Transaction::new("checkout");
        let value = serde_json::to_value(Entry::from(transaction.clone()).record()).unwrap();
        assert_eq!(value["type"], "transaction");
        assert_eq!(value["id"], transaction.id());
        assert_eq!(value["name"], "checkout");
    }
}
