// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # LogEngine
//!
//! A process-local telemetry agent. It records trace entries (transactions,
//! spans and errors) and structured log lines, keeps them in a bounded
//! in-memory queue and ships them to an ingestion endpoint as one JSON array
//! per flush.
//!
//! - [`agent`]: transaction/span/error recording and the terminal flush
//! - [`logger`]: syslog style logging façade sharing the same transports
//! - [`queue`]: pinned-root + capped FIFO tail buffer
//! - [`transport`]: blocking and fire-and-forget delivery
//!
//! ```rust,ignore
//! use logengine::{Agent, Config};
//!
//! let agent = Agent::new(Config::from_env()?);
//! agent.start_transaction("GET /orders");
//! let span = agent.start_span("db");
//! span.set_label("select orders");
//! span.end()?;
//! // flushed when `agent` is dropped
//! ```
//!
//! Delivery is best effort: nothing is persisted or retried, and a failed
//! flush only shows up in the logs.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod agent;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod hostname;
pub mod logger;
pub mod models;
pub mod queue;
pub mod transport;

pub use agent::Agent;
pub use config::Config;
pub use errors::{AgentError, ConfigError, EntryError};
pub use logger::{LogEngine, LogLevel};
pub use models::{Entry, Span, Transaction};
pub use transport::{Transport, TransportKind};
