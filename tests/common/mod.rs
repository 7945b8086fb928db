#![allow(dead_code)]

use rask_log_transport::{ConfigOverrides, ConfigResolver, ErrorDetails, LogEntry, LogLevel, TransportConfig};
use std::time::Duration;
use tokio::time::Instant;
use wiremock::{MockServer, Request};

/// Config pointing at `url`, isolated from the process environment. The
/// flush timer is pushed far out so tests control when batches leave.
pub fn config_for(url: &str, overrides: ConfigOverrides) -> TransportConfig {
    ConfigResolver::new()
        .without_env()
        .with_explicit(ConfigOverrides {
            url: Some(url.to_string()),
            flush_interval: Some(60_000),
            retry_delay: Some(10),
            ..Default::default()
        })
        .with_explicit(overrides)
        .resolve()
        .expect("test config should be valid")
}

pub fn entry(n: usize) -> LogEntry {
    LogEntry::new(LogLevel::Info, format!("message {n}")).with_field("seq", n)
}

pub fn failing_entry() -> LogEntry {
    LogEntry::new(LogLevel::Error, "payment declined")
        .with_component("billing")
        .with_request_id("req-42")
        .with_http("POST", "/api/pay", 502, 125.5)
        .with_error(
            ErrorDetails::new("upstream refused")
                .with_name("GatewayError")
                .with_code("E_GATEWAY")
                .with_stack("GatewayError: upstream refused\n    at pay (billing.rs:10)")
                .into(),
        )
        .with_field("traceId", "trace-1")
        .with_field("orderId", "order-9")
        .with_field("password", "hunter2")
}

/// Polls the mock server until it has seen `count` requests or `within`
/// elapses, returning whatever arrived.
pub async fn wait_for_requests(server: &MockServer, count: usize, within: Duration) -> Vec<Request> {
    let deadline = Instant::now() + within;
    loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= count || Instant::now() >= deadline {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
