// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured logging façade.
//!
//! [`LogEngine`] turns log calls into [`LogEntry`] records carrying a syslog
//! style header (priority, timestamp, hostname, identity) and ships them with
//! its own transport. All lines written by one `LogEngine` share a
//! correlation id, its `transaction`.
//!
//! Levels follow PSR-3 and map to syslog severities:
//!
//! | level     | severity |
//! |-----------|----------|
//! | debug     | 7        |
//! | info      | 6        |
//! | notice    | 5        |
//! | warning   | 4        |
//! | error     | 3        |
//! | critical  | 2        |
//! | alert     | 1        |
//! | emergency | 0        |

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::encoder::{ExceptionEncoder, ExceptionPayload};
use crate::errors::InvalidLevel;
use crate::hostname::get_hostname;
use crate::models::{new_id, LogEntry};
use crate::transport::{create_transport, Transport};

/// Syslog `LOG_USER` facility.
pub const LOG_USER: u8 = 8;

pub const DEFAULT_IDENTITY: &str = "rust";

/// Context key holding an encoded exception.
const EXCEPTION_KEY: &str = "exception";

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
        LogLevel::Alert,
        LogLevel::Emergency,
    ];

    /// Syslog severity, 7 (debug) down to 0 (emergency).
    #[must_use]
    pub fn severity(self) -> u8 {
        match self {
            LogLevel::Debug => 7,
            LogLevel::Info => 6,
            LogLevel::Notice => 5,
            LogLevel::Warning => 4,
            LogLevel::Error => 3,
            LogLevel::Critical => 2,
            LogLevel::Alert => 1,
            LogLevel::Emergency => 0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        }
    }
}

impl FromStr for LogLevel {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InvalidLevel(s.to_string()))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct LogEngine {
    config: Arc<Config>,
    transport: Box<dyn Transport>,
    encoder: ExceptionEncoder,
    facility: u8,
    identity: String,
    level: LogLevel,
    transaction: String,
    hostname: String,
}

impl LogEngine {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let transport = create_transport(Arc::clone(&config));
        Self::with_transport(config, transport)
    }

    #[must_use]
    pub fn with_transport(config: Arc<Config>, transport: Box<dyn Transport>) -> Self {
        LogEngine {
            config,
            transport,
            encoder: ExceptionEncoder,
            facility: LOG_USER,
            identity: DEFAULT_IDENTITY.to_string(),
            level: LogLevel::Debug,
            transaction: new_id(),
            hostname: get_hostname(),
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    #[must_use]
    pub fn with_facility(mut self, facility: u8) -> Self {
        self.facility = facility;
        self
    }

    /// Sets the minimum level from its name. An unknown name is reported and
    /// the current level is kept.
    pub fn set_severity_level(&mut self, level: &str) -> &mut Self {
        match level.parse::<LogLevel>() {
            Ok(level) => self.level = level,
            Err(e) => warn!(
                "LOGENGINE | Invalid severity level: {e}, keeping {}",
                self.level
            ),
        }
        self
    }

    #[must_use]
    pub fn severity_level(&self) -> LogLevel {
        self.level
    }

    /// Correlation id shared by every entry of this logger.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        &self.transaction
    }

    #[must_use]
    pub fn facility(&self) -> u8 {
        self.facility
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Records `message` unless `level` is below the minimum level. An
    /// encoded exception found under the `exception` key of `context` is
    /// moved out of the context and attached to the entry.
    pub fn log(&self, level: LogLevel, message: &str, mut context: Map<String, Value>) {
        if level < self.level {
            return;
        }
        let exception = take_exception(&mut context);
        self.submit(level, message, context, exception);
    }

    pub fn debug(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Debug, message, context);
    }

    pub fn info(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Info, message, context);
    }

    pub fn notice(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Notice, message, context);
    }

    pub fn warning(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Warning, message, context);
    }

    pub fn error(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Error, message, context);
    }

    pub fn critical(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Critical, message, context);
    }

    pub fn alert(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Alert, message, context);
    }

    pub fn emergency(&self, message: &str, context: Map<String, Value>) {
        self.log(LogLevel::Emergency, message, context);
    }

    /// Logs `error` at error level, with the encoded error attached.
    #[track_caller]
    pub fn log_exception<E>(&self, error: &E, context: Map<String, Value>)
    where
        E: Error + ?Sized,
    {
        if LogLevel::Error < self.level {
            return;
        }
        let exception = self.encoder.encode(error, Location::caller());
        self.submit(LogLevel::Error, &error.to_string(), context, Some(exception));
    }

    fn submit(
        &self,
        level: LogLevel,
        message: &str,
        context: Map<String, Value>,
        exception: Option<ExceptionPayload>,
    ) {
        let entry = LogEntry {
            id: new_id(),
            message: format!("{message} {}", Value::Object(context.clone())),
            context,
            transaction: self.transaction.clone(),
            priority: self.facility.saturating_add(level.severity()),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            hostname: self.hostname.clone(),
            identity: self.identity.clone(),
            exception,
        };
        self.transport.add_entry(entry.into());
    }

    /// Ships buffered entries when enabled.
    pub fn flush(&self) {
        self.run_flush(false);
    }

    fn run_flush(&self, wait: bool) {
        if !self.config.is_enabled() {
            debug!(
                "LOGENGINE | Logger disabled, keeping {} entries",
                self.transport.len()
            );
            return;
        }
        if wait {
            self.transport.flush_blocking();
        } else {
            self.transport.flush();
        }
    }
}

impl Drop for LogEngine {
    fn drop(&mut self) {
        self.run_flush(true);
    }
}

fn take_exception(context: &mut Map<String, Value>) -> Option<ExceptionPayload> {
    let value = context.remove(EXCEPTION_KEY)?;
    match serde_json::from_value::<ExceptionPayload>(value.clone()) {
        Ok(exception) => Some(exception),
        Err(_) => {
            // not an encoded exception, keep it as plain context
            context.insert(EXCEPTION_KEY.to_string(), value);
            None
        }
    }
}
