// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Tracing entry point.
//!
//! An [`Agent`] owns the transport chosen at construction and the slot of the
//! current transaction. Dropping it (or calling [`Agent::shutdown`]) runs the
//! terminal flush exactly once; after that new entries are ignored.

use std::any::Any;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::config::Config;
use crate::encoder::{ExceptionEncoder, ExceptionPayload};
use crate::errors::AgentError;
use crate::models::{Entry, ErrorEvent, Span, Transaction};
use crate::transport::{create_transport, Transport};

/// Records transactions, spans and errors for one process and ships them
/// through its [`Transport`].
///
/// `Agent` is `Send + Sync`; share it through an `Arc` to record from
/// several threads.
pub struct Agent {
    config: Arc<Config>,
    transport: Box<dyn Transport>,
    transaction: Mutex<Option<Transaction>>,
    encoder: ExceptionEncoder,
    terminated: AtomicBool,
}

impl Agent {
    /// Builds an agent with the transport selected by `config` and the
    /// `TRANSPORT_MODE` environment variable.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let transport = create_transport(Arc::clone(&config));
        Self::with_transport(config, transport)
    }

    /// Builds an agent around an existing transport.
    ///
    /// # Arguments
    ///
    /// * `config` - Settings shared with the transport.
    /// * `transport` - Where entries are buffered and shipped. Its queue
    ///   should already be sized from `config`.
    #[must_use]
    pub fn with_transport(config: Arc<Config>, transport: Box<dyn Transport>) -> Self {
        Agent {
            config,
            transport,
            transaction: Mutex::new(None),
            encoder: ExceptionEncoder,
            terminated: AtomicBool::new(false),
        }
    }

    /// The configuration the agent was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The transport entries are submitted to, e.g. to inspect the queue.
    #[must_use]
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Transaction>> {
        self.transaction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, entry: Entry) {
        if self.terminated.load(Ordering::Acquire) {
            debug!(
                "AGENT | Agent is shut down, ignoring {} {}",
                entry.kind(),
                entry.id()
            );
            return;
        }
        self.transport.add_entry(entry);
    }

    /// Starts a transaction and makes it current. Entries already submitted
    /// under the previous transaction are left as they are.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name, e.g. the route being served.
    ///
    /// # Returns
    ///
    /// A handle to the started transaction. It shares state with the queued
    /// entry, so context set on it later is part of the next flush.
    pub fn start_transaction(&self, name: impl Into<String>) -> Transaction {
        let transaction = Transaction::new(name);
        transaction.start();
        *self.slot() = Some(transaction.clone());
        self.submit(transaction.clone().into());
        transaction
    }

    /// The transaction new spans and errors are attached to, if any.
    #[must_use]
    pub fn current_transaction(&self) -> Option<Transaction> {
        self.slot().clone()
    }

    /// Starts a span under the current transaction, if any.
    pub fn start_span(&self, category: impl Into<String>) -> Span {
        let current = self.current_transaction();
        let span = Span::new(category, current.as_ref().map(Transaction::id));
        span.start();
        if let Some(transaction) = &current {
            transaction.register_span(span.id());
        }
        self.submit(span.clone().into());
        span
    }

    /// Same as [`Agent::start_span`], with a label describing the work,
    /// e.g. the statement being run.
    pub fn start_span_with_label(
        &self,
        category: impl Into<String>,
        label: impl Into<String>,
    ) -> Span {
        let span = self.start_span(category);
        span.set_label(label);
        span
    }

    /// Runs `work` inside a span that is ended however `work` finishes. An
    /// `Err` is handed back untouched and a panic is resumed once the span
    /// has been ended.
    pub fn add_span<T, E, F>(
        &self,
        category: impl Into<String>,
        label: impl Into<String>,
        work: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&Span) -> Result<T, E>,
    {
        let span = self.start_span_with_label(category, label);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&span)));

        if let Err(e) = span.end() {
            debug!("AGENT | {e}");
        }

        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Records `error` under the current transaction. The reported location
    /// is the caller's.
    #[track_caller]
    pub fn report_exception<E>(&self, error: &E) -> &Self
    where
        E: Error + ?Sized,
    {
        let exception = self.encoder.encode(error, Location::caller());
        self.submit_error(exception);
        self
    }

    /// Records a panic payload caught with [`std::panic::catch_unwind`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidArgument`] when the payload is neither a
    /// `&str` nor a `String`; nothing is recorded in that case.
    #[track_caller]
    pub fn report_panic(&self, payload: &(dyn Any + Send)) -> Result<&Self, AgentError> {
        let Some(exception) = self.encoder.encode_panic(payload, Location::caller()) else {
            return Err(AgentError::InvalidArgument(
                "panic payload must be a string message".to_string(),
            ));
        };
        self.submit_error(exception);
        Ok(self)
    }

    fn submit_error(&self, exception: ExceptionPayload) {
        let current = self.current_transaction();
        let event = ErrorEvent::new(exception, current.as_ref().map(Transaction::id));
        self.submit(event.into());
    }

    /// Ends the current transaction and, when enabled, ships the queue. A
    /// disabled agent keeps its entries. Does nothing without a current
    /// transaction.
    ///
    /// With the async transport this returns as soon as the batch is handed
    /// off; see [`Agent::shutdown`] for a flush that waits.
    pub fn flush(&self) {
        self.run_flush(false);
    }

    /// Runs the terminal flush. Only the first call (explicit or from `Drop`)
    /// has an effect.
    ///
    /// The terminal flush waits for the endpoint whatever the transport, so
    /// the last batch is delivered before a runtime or process that is about
    /// to exit tears down its background work.
    pub fn shutdown(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("AGENT | Shutting down, running final flush");
        self.run_flush(true);
    }

    fn run_flush(&self, wait: bool) {
        let Some(transaction) = self.current_transaction() else {
            debug!("AGENT | No active transaction, skipping flush");
            return;
        };

        if !transaction.is_ended() {
            if let Err(e) = transaction.end() {
                debug!("AGENT | {e}");
            }
        }

        if !self.config.is_enabled() {
            debug!(
                "AGENT | Agent disabled, keeping {} entries",
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

    /// Whether the terminal flush has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.shutdown();
    }
}
