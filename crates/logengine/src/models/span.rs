// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::EntryError;
use crate::models::{new_id, Timing};

#[derive(Debug)]
struct SpanState {
    label: Option<String>,
    timing: Timing,
    context: Map<String, Value>,
}

/// A timed sub-operation. The parent transaction is referenced by id only.
#[derive(Debug, Clone)]
pub struct Span {
    id: Arc<str>,
    category: Arc<str>,
    parent_id: Option<Arc<str>>,
    state: Arc<Mutex<SpanState>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub category: String,
    pub label: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
    pub context: Map<String, Value>,
}

impl Span {
    pub fn new(category: impl Into<String>, parent_id: Option<&str>) -> Self {
        let category: String = category.into();
        Self {
            id: new_id().into(),
            category: category.into(),
            parent_id: parent_id.map(Arc::from),
            state: Arc::new(Mutex::new(SpanState {
                label: None,
                timing: Timing::default(),
                context: Map::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SpanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.state().label.clone()
    }

    pub fn set_label(&self, label: impl Into<String>) -> &Self {
        self.state().label = Some(label.into());
        self
    }

    pub fn start(&self) -> &Self {
        self.state().timing.start();
        self
    }

    /// Records the end timestamp and returns the duration in milliseconds.
    pub fn end(&self) -> Result<f64, EntryError> {
        self.state().timing.end("span", &self.id)
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state().timing.end.is_some()
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.state().timing.duration()
    }

    /// Replaces the whole context.
    pub fn set_context(&self, context: Map<String, Value>) -> &Self {
        self.state().context = context;
        self
    }

    pub fn add_context(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.state().context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn context(&self) -> Map<String, Value> {
        self.state().context.clone()
    }

    #[must_use]
    pub fn record(&self) -> SpanRecord {
        let state = self.state();
        SpanRecord {
            id: self.id.to_string(),
            parent_id: self.parent_id.as_deref().map(str::to_string),
            category: self.category.to_string(),
            label: state.label.clone(),
            start: state.timing.start,
            end: state.timing.end,
            duration: state.timing.duration(),
            context: state.context.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_context_last_write_wins() {
        let span = Span::new("db", Some("tx-1"));
        span.add_context("query", "select 1");
        span.set_context(json!({"rows": 3}).as_object().unwrap().clone());

        assert_eq!(span.context(), *json!({"rows": 3}).as_object().unwrap());
    }

    #[test]
    fn test_record_wire_fields() {
        let span = Span::new("http", Some("tx-1"));
        span.set_label("GET /health").start();
        span.add_context("status", 200);
        span.end().unwrap();

        let value = serde_json::to_value(span.record()).unwrap();
        assert_eq!(value["parentId"], "tx-1");
        assert_eq!(value["category"], "http");
        assert_eq!(value["label"], "GET /health");
        assert_eq!(value["context"]["status"], 200);
        assert!(value["duration"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn test_orphan_span_has_no_parent() {
        let span = Span::new("job", None);
        assert!(span.parent_id().is_none());
        assert!(span.record().parent_id.is_none());
    }

    #[test]
    fn test_end_twice() {
        let span = Span::new("cache", None);
        span.start();
        span.end().unwrap();
        assert!(matches!(span.end(), Err(EntryError::AlreadyEnded { kind: "span", .. })));
    }
}
