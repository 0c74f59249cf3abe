//! Poll-driven HTTP client state machine.
//!
//! One `get` performs one GET against one host:
//! connect → send request → validate response → stream body.
//! Every wait for network progress is an explicit suspension point that
//! hands control back to the [`Scheduler`], observes cancellation and
//! counts against the attempt's time budget.

mod attempt;
mod reqwest_transport;
mod scheduler;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use attempt::{AttemptStatus, ConnectionAttempt};
pub use reqwest_transport::ReqwestConnector;
pub use scheduler::{FrameScheduler, Scheduler, TickFuture};
pub use transport::{Connector, Method, Request, TlsMode, Transport, TransportStatus};

use acorn_core::error::{AcornError, AcornResult, FetchStage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("acorn/", env!("CARGO_PKG_VERSION"));

/// Body chunks read back to back before yielding to the scheduler
pub const MAX_CHUNKS_PER_TICK: usize = 32;

/// Settings shared by every request of a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub user_agent: String,
    pub tls: TlsMode,
    pub port: u16,
    /// Ticks a state may spend without progress before timing out
    pub max_ticks_per_state: Option<u64>,
    /// Wall-clock limit for a whole request
    pub timeout: Option<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            tls: TlsMode::Secure,
            port: TlsMode::Secure.default_port(),
            max_ticks_per_state: Some(100_000),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl HttpConfig {
    /// Switch TLS mode, moving the port to that mode's default
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self.port = tls.default_port();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks_per_state = max_ticks;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for single GET requests.
///
/// Cloning is cheap; clones share the connector, scheduler and cancellation
/// token but never a connection.
#[derive(Clone)]
pub struct HttpClient {
    connector: Arc<dyn Connector>,
    scheduler: Arc<dyn Scheduler>,
    config: HttpConfig,
    cancel: CancellationToken,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl HttpClient {
    pub fn new(
        connector: Arc<dyn Connector>,
        scheduler: Arc<dyn Scheduler>,
        config: HttpConfig,
    ) -> Self {
        Self {
            connector,
            scheduler,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Client over the reqwest transport, ticking once per `frame`
    pub fn with_reqwest(config: HttpConfig, frame: Duration) -> AcornResult<Self> {
        let connector = ReqwestConnector::new()?;
        Ok(Self::new(
            Arc::new(connector),
            Arc::new(FrameScheduler::with_interval(frame)),
            config,
        ))
    }

    /// Abort in-flight requests when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Client for a URL on another host, with that URL scheme's TLS mode.
    ///
    /// The port goes back to the scheme's default; a port written in the
    /// URL's authority still wins. Unknown schemes keep the current settings.
    pub fn for_scheme(&self, scheme: &str) -> Self {
        match TlsMode::from_scheme(scheme) {
            Some(tls) => Self {
                config: self.config.clone().with_tls(tls),
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// GET `path` from `host`, accepting only the listed status codes.
    ///
    /// Opens and closes one connection. On any failure the partial body is
    /// discarded and only the error is returned.
    pub async fn get(&self, host: &str, path: &str, acceptable: &[u16]) -> AcornResult<Vec<u8>> {
        let deadline = self.config.timeout.map(|timeout| Instant::now() + timeout);
        let mut attempt = ConnectionAttempt::new(deadline);

        match self.run(host, path, acceptable, &mut attempt).await {
            Ok(()) => {
                let body = attempt.into_body();
                debug!(host, path, bytes = body.len(), "GET complete");
                Ok(body)
            },
            Err(err) => {
                let reached = attempt.status();
                attempt.fail();
                warn!(
                    host,
                    path,
                    stage = %err.stage().unwrap_or(FetchStage::Request),
                    reached = ?reached,
                    error = %err,
                    "GET failed"
                );
                Err(err)
            },
        }
    }

    async fn run(
        &self,
        host: &str,
        path: &str,
        acceptable: &[u16],
        attempt: &mut ConnectionAttempt,
    ) -> AcornResult<()> {
        if host.is_empty() {
            return Err(AcornError::connection(host, "no host to connect to"));
        }

        debug!(host, port = self.config.port, tls = ?self.config.tls, "Connecting");
        let mut transport = self
            .connector
            .connect(host, self.config.port, self.config.tls)?;

        // Resolving / connecting
        let status = loop {
            transport.poll();
            let status = transport.status();
            match status {
                TransportStatus::Resolving => {},
                TransportStatus::Connecting => attempt.advance(AttemptStatus::Connecting),
                other => break other,
            }
            self.tick(attempt, FetchStage::Connect, host).await?;
        };
        if status != TransportStatus::Connected {
            return Err(AcornError::connection(host, format!("transport reported {}", status)));
        }
        attempt.advance(AttemptStatus::Connected);

        // Requesting
        let request = Request::get(path, &self.config.user_agent);
        transport.send_request(&request).map_err(|err| match err {
            AcornError::Protocol { .. } => err,
            other => AcornError::protocol(host, path, format!("failed to send request: {}", other)),
        })?;
        attempt.advance(AttemptStatus::Requesting);

        let status = loop {
            transport.poll();
            let status = transport.status();
            if status != TransportStatus::Requesting {
                break status;
            }
            self.tick(attempt, FetchStage::Request, host).await?;
        };

        // Validating. The transport may only find out the peer is unreachable
        // once the request is on its way.
        if matches!(
            status,
            TransportStatus::CantResolve
                | TransportStatus::CantConnect
                | TransportStatus::TlsHandshakeError
        ) {
            return Err(AcornError::connection(
                host,
                format!("transport reported {} after request", status),
            ));
        }
        if !matches!(status, TransportStatus::Body | TransportStatus::Connected) {
            return Err(AcornError::protocol(
                host,
                path,
                format!("unexpected transport status after request: {}", status),
            ));
        }
        let code = transport.response_code();
        attempt.record_response_code(code);
        if !acceptable.contains(&code) {
            return Err(AcornError::UnexpectedStatus {
                host: host.to_string(),
                path: path.to_string(),
                status: code,
            });
        }
        attempt.advance(AttemptStatus::ReceivingBody);

        // Receiving body
        let mut streak = 0;
        while transport.status() == TransportStatus::Body {
            transport.poll();
            let chunk = transport.read_body_chunk();
            if chunk.is_empty() {
                streak = 0;
                self.tick(attempt, FetchStage::Body, host).await?;
            } else {
                attempt.append(&chunk);
                streak += 1;
                if streak >= MAX_CHUNKS_PER_TICK {
                    streak = 0;
                    self.tick(attempt, FetchStage::Body, host).await?;
                }
            }
        }

        match transport.status() {
            TransportStatus::Connected | TransportStatus::Disconnected => {
                attempt.advance(AttemptStatus::BodyComplete);
                Ok(())
            },
            other => Err(AcornError::protocol(
                host,
                path,
                format!("connection lost while receiving body: {}", other),
            )),
        }
    }

    /// Suspend until the next tick, honouring cancellation and time budgets
    async fn tick(
        &self,
        attempt: &mut ConnectionAttempt,
        stage: FetchStage,
        host: &str,
    ) -> AcornResult<()> {
        self.checkpoint(attempt, stage, host)?;
        tokio::select! {
            _ = self.cancel.cancelled() => {},
            _ = self.scheduler.next_tick() => {},
        }
        attempt.tick();
        self.checkpoint(attempt, stage, host)
    }

    fn checkpoint(
        &self,
        attempt: &ConnectionAttempt,
        stage: FetchStage,
        host: &str,
    ) -> AcornResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AcornError::Cancelled {
                host: host.to_string(),
                stage,
            });
        }

        let out_of_ticks = self
            .config
            .max_ticks_per_state
            .map_or(false, |max| attempt.idle_ticks() > max);
        let past_deadline = attempt
            .deadline()
            .map_or(false, |deadline| Instant::now() >= deadline);
        if out_of_ticks || past_deadline {
            return Err(AcornError::Timeout {
                host: host.to_string(),
                stage,
                ticks: attempt.idle_ticks(),
            });
        }

        Ok(())
    }
}
