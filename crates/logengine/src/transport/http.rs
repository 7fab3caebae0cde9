// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP plumbing shared by both transports.
//!
//! One flush is one `POST` of a JSON array of records to the configured
//! endpoint, authenticated with the [`API_KEY_HEADER`] header. Clients are
//! built with the configured timeout and HTTPS proxy; an unusable proxy falls
//! back to a direct connection rather than losing the batch.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::thread;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::Config;
use crate::models::{Entry, Record};

pub const API_KEY_HEADER: &str = "x-logengine-key";

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("Failed to encode payload: {0}")]
    Payload(String),

    #[error("Failed to send entries: {1}")]
    Destination(Option<StatusCode>, String),
}

/// Snapshots `entries` and encodes them as the JSON array body of one flush.
pub fn encode_payload(entries: &[Entry]) -> Result<Vec<u8>, ShippingError> {
    let records: Vec<Record> = entries.iter().map(Entry::record).collect();
    serde_json::to_vec(&records).map_err(|e| ShippingError::Payload(e.to_string()))
}

pub fn build_headers(api_key: &str) -> Result<HeaderMap, ShippingError> {
    let mut headers = HeaderMap::new();
    let api_key = HeaderValue::from_str(api_key)
        .map_err(|e| ShippingError::Payload(format!("API key is not a valid header value: {e}")))?;
    headers.insert(API_KEY_HEADER, api_key);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Client used by async deliveries running on a tokio runtime.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!("TRANSPORT | Unable to parse proxy configuration: {e}, no proxy will be used");
            build_client(config, false).unwrap_or_else(|e| {
                error!("TRANSPORT | Unable to build HTTP client: {e}, using defaults");
                reqwest::Client::new()
            })
        }
    }
}

fn build_client(config: &Config, with_proxy: bool) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(config.timeout());
    if with_proxy {
        if let Some(https_uri) = config.proxy_https() {
            builder = builder.proxy(reqwest::Proxy::https(https_uri)?);
        }
    }
    builder.build()
}

/// Client used by blocking deliveries, off any tokio runtime thread.
#[must_use]
pub fn get_blocking_client(config: &Config) -> reqwest::blocking::Client {
    match build_blocking_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!("TRANSPORT | Unable to parse proxy configuration: {e}, no proxy will be used");
            build_blocking_client(config, false).unwrap_or_else(|e| {
                error!("TRANSPORT | Unable to build HTTP client: {e}, using defaults");
                reqwest::blocking::Client::new()
            })
        }
    }
}

fn build_blocking_client(
    config: &Config,
    with_proxy: bool,
) -> Result<reqwest::blocking::Client, reqwest::Error> {
    let mut builder = reqwest::blocking::Client::builder().timeout(config.timeout());
    if with_proxy {
        if let Some(https_uri) = config.proxy_https() {
            builder = builder.proxy(reqwest::Proxy::https(https_uri)?);
        }
    }
    builder.build()
}

pub async fn send(
    client: &reqwest::Client,
    config: &Config,
    payload: Vec<u8>,
) -> Result<(), ShippingError> {
    let response = client
        .post(config.endpoint())
        .headers(build_headers(config.api_key())?)
        .body(payload)
        .send()
        .await
        .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ShippingError::Destination(Some(status), body))
}

pub fn send_blocking(
    client: &reqwest::blocking::Client,
    config: &Config,
    payload: Vec<u8>,
) -> Result<(), ShippingError> {
    let response = client
        .post(config.endpoint())
        .headers(build_headers(config.api_key())?)
        .body(payload)
        .send()
        .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().unwrap_or_default();
    Err(ShippingError::Destination(Some(status), body))
}

/// Posts `payload` with a blocking client and waits for the outcome.
///
/// On a tokio runtime thread the request runs on a scoped thread instead,
/// since `reqwest::blocking` panics when driven from inside a runtime.
pub fn deliver_blocking(config: &Config, payload: Vec<u8>) -> Result<(), ShippingError> {
    let ship = move || {
        let client = get_blocking_client(config);
        send_blocking(&client, config, payload)
    };

    if tokio::runtime::Handle::try_current().is_err() {
        return ship();
    }
    thread::scope(|scope| {
        scope.spawn(ship).join().unwrap_or_else(|_| {
            Err(ShippingError::Destination(
                None,
                "delivery thread panicked".to_string(),
            ))
        })
    })
}

/// Logs the outcome of a delivery. Failed batches are dropped here.
pub fn report(result: Result<(), ShippingError>, count: usize) {
    match result {
        Ok(()) => debug!("TRANSPORT | Shipped {count} entries"),
        Err(ShippingError::Destination(Some(status), _)) if status == StatusCode::FORBIDDEN => {
            error!(
                "TRANSPORT | Request was denied: Access denied. Please verify that your API key is valid. {count} entries dropped"
            );
        }
        Err(ShippingError::Destination(Some(status), body)) => {
            error!("TRANSPORT | Endpoint answered {status}, {count} entries dropped: {body}");
        }
        Err(e) => error!("TRANSPORT | {e}, {count} entries dropped"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Span, Transaction};
    use tracing_test::traced_test;

    #[test]
    fn test_encode_payload_keeps_entry_order() {
        let transaction = Transaction::new("GET /");
        transaction.start();
        let span = Span::new("db", Some(transaction.id()));
        let entries = vec![Entry::from(transaction.clone()), Entry::from(span.clone())];

        let payload = encode_payload(&entries).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        let records = value.as_array().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "transaction");
        assert_eq!(records[0]["id"], transaction.id());
        assert_eq!(records[1]["type"], "span");
        assert_eq!(records[1]["parentId"], transaction.id());
    }

    #[test]
    fn test_empty_payload_is_an_empty_array() {
        assert_eq!(encode_payload(&[]).unwrap(), b"[]");
    }

    #[test]
    fn test_build_headers() {
        let headers = build_headers("abc123").unwrap();
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "abc123");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_build_headers_rejects_control_characters() {
        assert!(matches!(
            build_headers("bad\nkey"),
            Err(ShippingError::Payload(_))
        ));
    }

    #[test]
    fn test_invalid_proxy_falls_back() {
        let config = Config::new("abc123").with_proxy_https("::not a proxy::");
        let _client = get_blocking_client(&config);
    }

    #[test]
    #[traced_test]
    fn test_report_logs_forbidden() {
        report(
            Err(ShippingError::Destination(
                Some(StatusCode::FORBIDDEN),
                String::new(),
            )),
            3,
        );
        assert!(logs_contain("Please verify that your API key is valid"));
    }

    #[test]
    #[traced_test]
    fn test_report_logs_server_error() {
        report(
            Err(ShippingError::Destination(
                Some(StatusCode::INTERNAL_SERVER_ERROR),
                "oops".to_string(),
            )),
            2,
        );
        assert!(logs_contain("2 entries dropped"));
    }
}
