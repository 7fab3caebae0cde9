// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, io};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logengine::{Agent, Config, LogEngine};

const DEFAULT_REQUESTS: u64 = 5;
const REQUEST_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let log_level = env::var("LOGENGINE_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter)?)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("Logging subsystem enabled");

    let config = Config::from_env()?;
    let requests = env::var("LOGENGINE_DEMO_REQUESTS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_REQUESTS);

    info!(
        "Sending {requests} requests to {} using the {} transport",
        config.endpoint(),
        config.transport()
    );

    let agent = Agent::new(config.clone());
    let mut logger = LogEngine::new(config).with_identity("logengine-demo");
    if let Ok(level) = env::var("LOGENGINE_SEVERITY") {
        logger.set_severity_level(&level);
    }

    tokio::select! {
        () = run_workload(&agent, &logger, requests) => {
            info!("Workload finished");
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Unable to listen for shutdown signal: {e}");
            }
            info!("Interrupted, flushing buffered entries");
        }
    }

    // Both terminal flushes wait for the endpoint before the runtime goes away.
    agent.shutdown();
    drop(logger);
    Ok(())
}

async fn run_workload(agent: &Agent, logger: &LogEngine, requests: u64) {
    let mut ticker = interval(REQUEST_INTERVAL);

    for request in 0..requests {
        ticker.tick().await;

        agent.start_transaction(format!("GET /orders/{request}"));

        let lookup = agent.add_span("db", "select order", |span| {
            span.add_context("order_id", request);
            if request % 3 == 2 {
                return Err(io::Error::new(io::ErrorKind::NotFound, "order not found"));
            }
            Ok(request * 10)
        });

        match lookup {
            Ok(total) => {
                let render = agent.start_span_with_label("view", "render order");
                render.add_context("total", total);
                if let Err(e) = render.end() {
                    error!("{e}");
                }
                logger.info(
                    "order served",
                    serde_json::json!({ "order_id": request, "total": total })
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                );
            }
            Err(e) => {
                agent.report_exception(&e);
                logger.log_exception(&e, serde_json::Map::new());
            }
        }

        agent.flush();
    }
}
