//! Service counters and the Prometheus text endpoint.

use std::sync::Arc;

use prometheus_client::{encoding::text::encode, metrics::counter::Counter, registry::Registry};
use tokio::{io::AsyncWriteExt, net::TcpListener};
use tracing::{debug, error};

/// Counters of the token service.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    /// Accepted connections
    pub connections: Counter,
    /// Failed accepts and connections that could not be read
    pub connection_errors: Counter,
    /// Requests that did not decode
    pub decode_errors: Counter,
    /// Issue requests
    pub issue_total: Counter,
    /// Failed issue requests
    pub issue_errors: Counter,
    /// Redeem requests
    pub redeem_total: Counter,
    /// Failed redeem requests
    pub redeem_errors: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates the counters and registers them.
    #[must_use]
    pub fn new() -> Self {
        let mut metrics = Self {
            connections: Counter::default(),
            connection_errors: Counter::default(),
            decode_errors: Counter::default(),
            issue_total: Counter::default(),
            issue_errors: Counter::default(),
            redeem_total: Counter::default(),
            redeem_errors: Counter::default(),
            registry: Registry::default(),
        };
        let registry = &mut metrics.registry;
        registry.register(
            "btd_connections",
            "Number of accepted connections",
            metrics.connections.clone(),
        );
        registry.register(
            "btd_connection_errors",
            "Number of failed accepts and unreadable connections",
            metrics.connection_errors.clone(),
        );
        registry.register(
            "btd_decode_errors",
            "Number of requests that failed to decode",
            metrics.decode_errors.clone(),
        );
        registry.register(
            "btd_issue",
            "Number of issue requests",
            metrics.issue_total.clone(),
        );
        registry.register(
            "btd_issue_errors",
            "Number of failed issue requests",
            metrics.issue_errors.clone(),
        );
        registry.register(
            "btd_redeem",
            "Number of redeem requests",
            metrics.redeem_total.clone(),
        );
        registry.register(
            "btd_redeem_errors",
            "Number of failed redeem requests",
            metrics.redeem_errors.clone(),
        );
        metrics
    }

    /// Encodes all counters in the Prometheus text format.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut body = String::new();
        if let Err(e) = encode(&mut body, &self.registry) {
            error!(error = ?e, "failed to encode metrics");
        }
        body
    }
}

/// Formats a minimal HTTP 200 response carrying the current metrics.
fn response(metrics: &Metrics) -> String {
    let body = metrics.encode();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Serves the metrics over HTTP, on all methods and paths, until the
/// listener fails. Anything the client sends is ignored.
pub async fn serve(listener: TcpListener, metrics: Arc<Metrics>) {
    while let Ok((mut stream, peer)) = listener.accept().await {
        debug!(?peer, "serving metrics");
        let response = response(&metrics);
        tokio::spawn(async move {
            if let Err(e) = stream.write_all(response.as_bytes()).await {
                error!(error = ?e, "failed to send metrics response");
            }
            let _ = stream.shutdown().await;
        });
    }
}
