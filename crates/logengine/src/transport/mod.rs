// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery strategies.
//!
//! Both strategies own a [`SharedQueue`] and differ only in what `flush`
//! does with the encoded batch:
//!
//! - [`SyncTransport`] takes the batch out of the queue, posts it and waits
//!   for the response. The batch is gone whatever the outcome.
//! - [`AsyncTransport`] clears the queue and hands the batch to a detached
//!   task (or thread, outside a tokio runtime) and returns immediately.
//!
//! Delivery failures are logged and the batch is dropped. Nothing is retried.

pub mod async_transport;
pub mod http;
pub mod sync_transport;

use std::env;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::models::Entry;

pub use async_transport::AsyncTransport;
pub use sync_transport::SyncTransport;

/// Environment variable that overrides the configured transport kind.
pub const TRANSPORT_MODE_ENV: &str = "TRANSPORT_MODE";

/// How a [`Transport`] ships a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Sync,
    Async,
}

impl TransportKind {
    /// `"async"` (any case) selects [`TransportKind::Async`], anything else
    /// the synchronous default.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("async") {
            TransportKind::Async
        } else {
            TransportKind::Sync
        }
    }

    /// Applies the `TRANSPORT_MODE` override, if set.
    #[must_use]
    pub fn resolve(configured: TransportKind) -> Self {
        match env::var(TRANSPORT_MODE_ENV) {
            Ok(mode) if !mode.is_empty() => TransportKind::parse(&mode),
            _ => configured,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Sync => "sync",
            TransportKind::Async => "async",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery strategy: a bounded buffer plus a way of shipping it.
///
/// Implementations are shared between threads through the owning
/// [`Agent`](crate::Agent) or [`LogEngine`](crate::LogEngine), so every method
/// takes `&self` and locks internally.
pub trait Transport: Send + Sync {
    /// Buffers an entry, applying the queue's eviction policy.
    ///
    /// # Arguments
    ///
    /// * `entry` - The entry to buffer. A transaction other than the pinned
    ///   one takes the pinned slot; anything else goes to the tail, evicting
    ///   the oldest tail entry when the tail is full.
    fn add_entry(&self, entry: Entry);

    /// Buffered entries in flush order.
    fn entries(&self) -> Vec<Entry>;

    /// Number of buffered entries, pinned slot included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ships the buffered entries and empties the queue.
    ///
    /// # Error Handling
    ///
    /// Never fails: delivery errors are logged and the batch is dropped.
    /// Flushing an empty queue makes no request.
    fn flush(&self);

    /// Like [`Transport::flush`], but returns only once the endpoint has
    /// answered or the request failed. Used for the terminal flush, where a
    /// detached delivery could be cut short by process exit.
    fn flush_blocking(&self) {
        self.flush();
    }

    /// # Returns
    ///
    /// The strategy this transport implements, as resolved at construction.
    fn kind(&self) -> TransportKind;
}

/// Builds the transport selected by the configuration and `TRANSPORT_MODE`.
#[must_use]
pub fn create_transport(config: Arc<Config>) -> Box<dyn Transport> {
    let kind = TransportKind::resolve(config.transport());
    debug!("TRANSPORT | Using {kind} transport to {}", config.endpoint());
    match kind {
        TransportKind::Sync => Box::new(SyncTransport::new(config)),
        TransportKind::Async => Box::new(AsyncTransport::new(config)),
    }
}
