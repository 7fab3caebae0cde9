// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use serde_json::{Map, Value};

use crate::encoder::ExceptionPayload;

/// A structured log line produced by [`crate::logger::LogEngine`], with its
/// syslog header already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: String,
    pub message: String,
    pub context: Map<String, Value>,
    /// Correlation id shared by every line of one `LogEngine`.
    pub transaction: String,
    pub priority: u8,
    /// RFC3339.
    pub timestamp: String,
    pub hostname: String,
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionPayload>,
}
