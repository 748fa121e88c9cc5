//! # Token service
//!
//! One request per TCP connection: the client writes a JSON [`Envelope`],
//! the server answers and closes the connection. Requests are read until the
//! peer closes its write half or the read deadline passes, whichever comes
//! first.

pub mod metrics;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::OsRng;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::{Instant, sleep, timeout, timeout_at},
};
use tracing::{debug, error, info, warn};

use crate::{
    common::{
        errors::{IssueError, RedeemError, RequestError, StartupError, TransportError},
        group::Group,
        keys::KeyMaterial,
    },
    config::Config,
    issuance::server::Issuer,
    redemption::{BindingContext, RedeemRequest, server::Verifier},
    wire::{Envelope, ErrorResponse, REDEEM_SUCCESS, Request},
};

use self::metrics::Metrics;

/// Largest request accepted, in bytes.
pub const MAX_REQUEST_SIZE: usize = 20 * 1024;
/// Time allowed for reading a request.
pub const READ_DEADLINE: Duration = Duration::from_millis(100);
/// Upper bound on the time a connection is kept open.
pub const CONNECTION_LIFETIME: Duration = Duration::from_secs(1);

const MIN_BACKOFF: Duration = Duration::from_millis(1);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Decodes a request and dispatches it to the issuer or the verifier.
pub struct Handler<G: Group> {
    issuer: Issuer<G>,
    verifier: Verifier<G>,
    metrics: Arc<Metrics>,
}

impl<G: Group> Debug for Handler<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("issuer", &self.issuer)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl<G: Group> Handler<G> {
    /// Creates a handler over shared key material.
    #[must_use]
    pub fn new(keys: Arc<KeyMaterial<G>>, max_tokens: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            issuer: Issuer::new(Arc::clone(&keys), max_tokens),
            verifier: Verifier::new(keys),
            metrics,
        }
    }

    /// Returns the service counters.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Handles one raw request and returns the response payload.
    ///
    /// # Errors
    /// Returns the decode, issue or redeem error. Use
    /// [`RequestError::reply`] for what to send back to the client.
    pub fn handle(&self, bytes: &[u8]) -> Result<Vec<u8>, RequestError> {
        let envelope = Envelope::from_slice(bytes).inspect_err(|_| {
            self.metrics.decode_errors.inc();
        })?;
        match envelope.request {
            Request::Issue(blinded) => {
                self.metrics.issue_total.inc();
                let batch = self
                    .issuer
                    .issue(&mut OsRng, &blinded)
                    .inspect_err(|e| {
                        self.metrics.issue_errors.inc();
                        if *e == IssueError::ProofVerificationFailed {
                            error!(error = %e, "issued batch failed its own proof check");
                        }
                    })?;
                debug!(tokens = blinded.len(), "issued batch");
                serde_json::to_vec(&batch.to_response()).map_err(RequestError::Encode)
            }
            Request::Redeem(preimage, tag) => {
                self.metrics.redeem_total.inc();
                let request = RedeemRequest {
                    preimage: preimage.0,
                    tag: tag.0,
                };
                let binding = BindingContext::new(envelope.host, envelope.path);
                self.verifier.redeem(&request, &binding).inspect_err(|_| {
                    self.metrics.redeem_errors.inc();
                })?;
                debug!(host = binding.host(), path = binding.path(), "redeemed token");
                Ok(REDEEM_SUCCESS.to_vec())
            }
        }
    }
}

impl RequestError {
    /// Returns the payload to send back before closing the connection, if
    /// any.
    ///
    /// Every redemption failure produces the same text, so the client cannot
    /// tell the causes apart.
    #[must_use]
    pub fn reply(&self) -> Option<Vec<u8>> {
        match self {
            Self::Issue(e) => serde_json::to_vec(&ErrorResponse {
                error: e.to_string(),
            })
            .ok(),
            Self::Redeem(_) => Some(RedeemError::VerifyFailed.to_string().into_bytes()),
            _ => None,
        }
    }
}

/// Reads a request until EOF or `deadline`.
///
/// Hitting the deadline after some data arrived ends the request normally.
///
/// # Errors
/// Returns [`TransportError::Timeout`] if nothing arrived before the
/// deadline and [`TransportError::RequestTooLarge`] once more than `limit`
/// bytes have been received.
pub async fn read_request<S: AsyncRead + Unpin>(
    stream: &mut S,
    deadline: Instant,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = match timeout_at(deadline, stream.read(&mut chunk)).await {
            Ok(read) => read?,
            Err(_) if request.is_empty() => return Err(TransportError::Timeout),
            Err(_) => break,
        };
        if read == 0 {
            break;
        }
        if request.len() + read > limit {
            return Err(TransportError::RequestTooLarge { limit });
        }
        request.extend_from_slice(&chunk[..read]);
    }
    Ok(request)
}

async fn handle_connection<G: Group>(
    mut stream: TcpStream,
    handler: Arc<Handler<G>>,
) -> Result<(), RequestError> {
    let deadline = Instant::now() + READ_DEADLINE;
    let request = read_request(&mut stream, deadline, MAX_REQUEST_SIZE)
        .await
        .inspect_err(|_| {
            handler.metrics.connection_errors.inc();
        })?;

    let worker = Arc::clone(&handler);
    let result = tokio::task::spawn_blocking(move || worker.handle(&request))
        .await
        .map_err(|_| RequestError::Handler)?;

    let (payload, outcome) = match result {
        Ok(payload) => (Some(payload), Ok(())),
        Err(e) => (e.reply(), Err(e)),
    };
    if let Some(payload) = payload {
        stream
            .write_all(&payload)
            .await
            .map_err(TransportError::from)?;
        stream.shutdown().await.map_err(TransportError::from)?;
    }
    outcome
}

/// Accepts connections forever, one task per connection.
pub async fn run<G: Group>(listener: TcpListener, handler: Arc<Handler<G>>) {
    let mut backoff = MIN_BACKOFF;
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                handler.metrics.connection_errors.inc();
                warn!(error = %e, ?backoff, "failed to accept connection");
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };
        backoff = MIN_BACKOFF;
        handler.metrics.connections.inc();
        debug!(?peer, "accepted connection");

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            match timeout(CONNECTION_LIFETIME, handle_connection(stream, handler)).await {
                Ok(Ok(())) => debug!(?peer, "connection closed"),
                Ok(Err(e)) => warn!(?peer, error = %e, "request failed"),
                Err(_) => warn!(?peer, "connection exceeded its lifetime"),
            }
        });
    }
}

/// Binds the token and metrics listeners and serves until the process exits.
///
/// # Errors
/// Returns [`StartupError::Bind`] if a listener cannot be bound.
pub async fn serve<G: Group>(
    config: &Config,
    keys: Arc<KeyMaterial<G>>,
) -> Result<(), StartupError> {
    let metrics = Arc::new(Metrics::new());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;

    if config.metrics_port != 0 {
        let metrics_addr = config.metrics_addr();
        let metrics_listener =
            TcpListener::bind(&metrics_addr)
                .await
                .map_err(|source| StartupError::Bind {
                    addr: metrics_addr.clone(),
                    source,
                })?;
        info!(addr = %metrics_addr, "serving metrics");
        tokio::spawn(metrics::serve(metrics_listener, Arc::clone(&metrics)));
    }

    info!(
        %addr,
        keys = keys.len(),
        max_tokens = config.max_tokens,
        version = env!("CARGO_PKG_VERSION"),
        "btd listening"
    );
    let handler = Arc::new(Handler::new(keys, config.max_tokens, metrics));
    run(listener, handler).await;
    Ok(())
}
