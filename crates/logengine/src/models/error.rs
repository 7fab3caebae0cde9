// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::sync::Arc;

use crate::encoder::ExceptionPayload;
use crate::models::{new_id, now_millis};

/// A captured error, immutable once created.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    inner: Arc<ErrorRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub timestamp: f64,
    #[serde(flatten)]
    pub exception: ExceptionPayload,
}

impl ErrorEvent {
    #[must_use]
    pub fn new(exception: ExceptionPayload, parent_id: Option<&str>) -> Self {
        Self {
            inner: Arc::new(ErrorRecord {
                id: new_id(),
                parent_id: parent_id.map(str::to_string),
                timestamp: now_millis(),
                exception,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.inner.parent_id.as_deref()
    }

    #[must_use]
    pub fn exception(&self) -> &ExceptionPayload {
        &self.inner.exception
    }

    #[must_use]
    pub fn record(&self) -> ErrorRecord {
        ErrorRecord::clone(&self.inner)
    }
}
