// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::config::Config;
use crate::models::Entry;
use crate::queue::SharedQueue;
use crate::transport::http;
use crate::transport::{Transport, TransportKind};

/// Blocks the caller of [`Transport::flush`] until the endpoint answers.
///
/// The batch is taken out of the queue before the request starts, so other
/// threads can keep adding entries while the caller waits.
pub struct SyncTransport {
    config: Arc<Config>,
    queue: SharedQueue,
}

impl SyncTransport {
    #[must_use]
    pub fn new(config: Arc<Config>) -> Self {
        let queue = SharedQueue::new(config.max_items());
        SyncTransport { config, queue }
    }
}

impl Transport for SyncTransport {
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
        // Entries added while the request is in flight belong to the next batch.
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
        TransportKind::Sync
    }
}
