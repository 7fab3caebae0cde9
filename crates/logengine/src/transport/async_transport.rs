// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::thread;
use tracing::error;

use crate::config::Config;
use crate::models::Entry;
use crate::queue::SharedQueue;
use crate::transport::http;
use crate::transport::{Transport, TransportKind};

const DELIVERY_THREAD_NAME: &str = "logengine-delivery";

/// Hands each batch to a detached delivery unit and returns immediately.
///
/// On a tokio runtime the batch is posted from a spawned task; elsewhere a
/// named OS thread performs a blocking post. No handle is kept, so the
/// outcome is only visible in the logs.
///
/// A detached delivery does not outlive its runtime or process: a task still
/// in flight when the runtime shuts down is cancelled, and a thread dies with
/// the process. The terminal flush therefore goes through
/// [`Transport::flush_blocking`], which waits for the post.
pub struct AsyncTransport {
    config: Arc<Config>,
    queue: SharedQueue,
}

impl AsyncTransport {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let queue = SharedQueue::new(config.max_items());
        AsyncTransport { config, queue }
    }

    fn dispatch(&self, payload: Vec<u8>, count: usize) {
        let config = Arc::clone(&self.config);

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let client = http::get_client(&config);
                http::report(http::send(&client, &config, payload).await, count);
            });
            return;
        }

        let spawned = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_string())
            .spawn(move || {
                let client = http::get_blocking_client(&config);
                http::report(http::send_blocking(&client, &config, payload), count);
            });
        if let Err(e) = spawned {
            error!("TRANSPORT | Failed to spawn delivery thread: {e}, {count} entries dropped");
        }
    }
}

impl Transport for AsyncTransport {
    fn add_entry(&self, entry: Entry) {
        self.queue.add_entry(entry);
    }

    fn entries(&self) -> Vec<Entry> {
        self.queue.entries()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn flush(&self) {
        let entries = self.queue.take();
        if entries.is_empty() {
            return;
        }
        let count = entries.len();

        match http::encode_payload(&entries) {
            Ok(payload) => self.dispatch(payload, count),
            Err(e) => http::report(Err(e), count),
        }
    }

    fn flush_blocking(&self) {
        let entries = self.queue.take();
        if entries.is_empty() {
            return;
        }
        let count = entries.len();

        let result = http::encode_payload(&entries)
            .and_then(|payload| http::deliver_blocking(&self.config, payload));
        http::report(result, count);
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Async
    }
}
