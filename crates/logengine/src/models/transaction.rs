// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::errors::EntryError;
use crate::models::{new_id, Timing};

#[derive(Debug)]
struct TransactionState {
    name: String,
    timing: Timing,
    spans: Vec<String>,
}

/// Root unit of a trace. Cloning yields another handle to the same
/// transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: Arc<str>,
    state: Arc<Mutex<TransactionState>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub name: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
    pub spans: Vec<String>,
}

impl Transaction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id().into(),
            state: Arc::new(Mutex::new(TransactionState {
                name: name.into(),
                timing: Timing::default(),
                spans: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, TransactionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn start(&self) -> &Self {
        self.state().timing.start();
        self
    }

    /// Records the end timestamp and returns the duration in milliseconds.
    pub fn end(&self) -> Result<f64, EntryError> {
        self.state().timing.end("transaction", &self.id)
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state().timing.end.is_some()
    }

    #[must_use]
    pub fn start_time(&self) -> Option<f64> {
        self.state().timing.start
    }

    #[must_use]
    pub fn end_time(&self) -> Option<f64> {
        self.state().timing.end
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.state().timing.duration()
    }

    /// Ids of the spans started under this transaction, in start order.
    #[must_use]
    pub fn span_ids(&self) -> Vec<String> {
        self.state().spans.clone()
    }

    pub(crate) fn register_span(&self, span_id: &str) {
        self.state().spans.push(span_id.to_string());
    }

    /// Whether both handles point at the same transaction.
    #[must_use]
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    #[must_use]
    pub fn record(&self) -> TransactionRecord {
        let state = self.state();
        TransactionRecord {
            id: self.id.to_string(),
            name: state.name.clone(),
            start: state.timing.start,
            end: state.timing.end,
            duration: state.timing.duration(),
            spans: state.spans.clone(),
        }
    }
}
