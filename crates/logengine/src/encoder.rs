// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of caught errors into structured payloads.
//!
//! Used by the agent for error entries and by the log façade for
//! `log_exception`. Stack frames come from [`Backtrace::capture`], so they are
//! only populated when `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE` enable capture.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::panic::Location;

pub const PANIC_CLASS: &str = "panic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionPayload {
    pub exception_class: String,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    #[serde(default)]
    pub stack_frames: Vec<StackFrame>,
    /// Messages of the `source()` chain, outermost first.
    #[serde(default)]
    pub causes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionEncoder;

fn class_name<E>(error: &E) -> String
where
    E: Error + ?Sized,
{
    let name = std::any::type_name::<E>();
    if !name.starts_with("dyn ") {
        return name.to_string();
    }
    let debug = format!("{error:?}");
    let leading: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if leading.is_empty() {
        name.to_string()
    } else {
        leading
    }
}

impl ExceptionEncoder {
    /// Encodes `error`, naming it after its static type.
    ///
    /// A trait object (`&dyn Error`, a boxed error) has no useful static
    /// name, so the class falls back to the leading identifier of its `Debug`
    /// output, e.g. `Custom` for an `io::Error` built with `io::Error::other`.
    /// That is usually the variant or struct name, not the full type path,
    /// and errors whose `Debug` output starts with a string literal keep the
    /// `dyn ...` name.
    #[must_use]
    pub fn encode<E>(&self, error: &E, location: &Location<'_>) -> ExceptionPayload
    where
        E: Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        ExceptionPayload {
            exception_class: class_name(error),
            message: error.to_string(),
            file: Some(location.file().to_string()),
            line: Some(location.line()),
            stack_frames: capture_frames(),
            causes,
        }
    }

    /// Encodes a panic payload. Only string payloads carry a message; anything
    /// else is not an error value and yields `None`.
    #[must_use]
    pub fn encode_panic(
        &self,
        payload: &(dyn Any + Send),
        location: &Location<'_>,
    ) -> Option<ExceptionPayload> {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            return None;
        };

        Some(ExceptionPayload {
            exception_class: PANIC_CLASS.to_string(),
            message,
            file: Some(location.file().to_string()),
            line: Some(location.line()),
            stack_frames: capture_frames(),
            causes: Vec::new(),
        })
    }
}

fn capture_frames() -> Vec<StackFrame> {
    let backtrace = Backtrace::capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    parse_backtrace(&backtrace.to_string())
}

/// Parses the `Display` output of a captured backtrace:
///
/// ```text
///    0: app::handler
///              at ./src/handler.rs:12:5
/// ```
pub(crate) fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line) = split_location(location);
                frame.file = Some(file);
                frame.line = line;
            }
            continue;
        }

        let Some((index, function)) = line.split_once(": ") else {
            continue;
        };
        if index.parse::<usize>().is_ok() {
            frames.push(StackFrame {
                function: function.to_string(),
                file: None,
                line: None,
            });
        }
    }

    frames
}

// "path/to/file.rs:12:5" -> ("path/to/file.rs", Some(12))
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    match (parts.next(), line, column) {
        (Some(file), Some(line), Some(_)) => (file.to_string(), line.parse().ok()),
        _ => (location.to_string(), None),
    }
}
