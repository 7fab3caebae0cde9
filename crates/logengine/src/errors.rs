// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Usage and configuration errors surfaced to callers.
//!
//! Delivery failures never show up here: they are logged and dropped by the
//! transports (see [`crate::transport::http::ShippingError`]).

use thiserror::Error;

/// Misuse of the start/end lifecycle of a timed entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("{kind} {id} was ended before it was started")]
    NotStarted { kind: &'static str, id: String },
    #[error("{kind} {id} has already ended")]
    AlreadyEnded { kind: &'static str, id: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Entry(#[from] EntryError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingApiKey(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct InvalidLevel(pub String);
