//! Production transport backed by reqwest.
//!
//! reqwest is future-based, so each transport runs its network work on
//! background tokio tasks and reports progress over a channel. `poll`
//! drains that channel without ever waiting on it.
//!
//! `connect` resolves the authority and opens a TCP connection to it, so an
//! unreachable peer shows up while connecting. reqwest opens its own
//! connection for the request; TLS failures surface there as `CantConnect`.

use super::transport::{Connector, Request, TlsMode, Transport, TransportStatus};
use acorn_core::error::{AcornError, AcornResult};
use reqwest::{Client, ClientBuilder, Url};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress reported by the background tasks
#[derive(Debug)]
enum Event {
    Resolved,
    Connected,
    Headers(u16),
    Chunk(Vec<u8>),
    Finished,
    Failed(TransportStatus, String),
}

/// Opens [`ReqwestTransport`]s.
///
/// Idle connections are never pooled, so dropping a transport closes its
/// connection. Response bodies are
/// never decompressed: a `.tgz` is stored byte for byte.
#[derive(Debug, Clone)]
pub struct ReqwestConnector {
    client: Client,
}

impl ReqwestConnector {
    pub fn new() -> AcornResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(0)
            .connect_timeout(CONNECT_TIMEOUT)
            .no_gzip()
            .build()
            .map_err(|e| AcornError::connection("", format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Connector for ReqwestConnector {
    fn connect(&self, host: &str, port: u16, tls: TlsMode) -> AcornResult<Box<dyn Transport>> {
        let handle = Handle::try_current()
            .map_err(|e| AcornError::connection(host, format!("no async runtime: {}", e)))?;

        let authority = authority(host, port);
        let origin = format!("{}://{}", tls.scheme(), authority);
        let (events, receiver) = mpsc::unbounded_channel();

        trace!(%origin, "Resolving");
        let lookup_target = authority.clone();
        let resolved = events.clone();
        let connect_task = handle.spawn(async move {
            let event = match tokio::net::lookup_host(lookup_target.as_str()).await {
                Ok(addrs) => {
                    let addrs: Vec<_> = addrs.collect();
                    if addrs.is_empty() {
                        Event::Failed(TransportStatus::CantResolve, "no addresses".to_string())
                    } else {
                        if resolved.send(Event::Resolved).is_err() {
                            return;
                        }
                        open_connection(&addrs).await
                    }
                },
                Err(e) => Event::Failed(TransportStatus::CantResolve, e.to_string()),
            };
            let _ = resolved.send(event);
        });

        Ok(Box::new(ReqwestTransport {
            client: self.client.clone(),
            handle,
            origin,
            events,
            receiver,
            status: TransportStatus::Resolving,
            response_code: 0,
            chunks: VecDeque::new(),
            finished: false,
            tasks: vec![connect_task],
        }))
    }
}

/// One request's worth of connection, driven by [`Transport::poll`]
pub struct ReqwestTransport {
    client: Client,
    handle: Handle,
    origin: String,
    events: UnboundedSender<Event>,
    receiver: UnboundedReceiver<Event>,
    status: TransportStatus,
    response_code: u16,
    chunks: VecDeque<Vec<u8>>,
    finished: bool,
    tasks: Vec<JoinHandle<()>>,
}

impl ReqwestTransport {
    fn apply(&mut self, event: Event) {
        match event {
            Event::Resolved => {
                if self.status == TransportStatus::Resolving {
                    self.status = TransportStatus::Connecting;
                }
            },
            Event::Connected => {
                if self.status == TransportStatus::Connecting {
                    self.status = TransportStatus::Connected;
                }
            },
            Event::Headers(code) => {
                self.response_code = code;
                self.status = TransportStatus::Body;
            },
            Event::Chunk(bytes) => self.chunks.push_back(bytes),
            Event::Finished => self.finished = true,
            Event::Failed(status, message) => {
                debug!(origin = %self.origin, %status, %message, "Transport failed");
                self.status = status;
            },
        }
    }

    /// A fully drained body returns the connection to `Connected`
    fn settle(&mut self) {
        if self.status == TransportStatus::Body && self.finished && self.chunks.is_empty() {
            self.status = TransportStatus::Connected;
        }
    }

    fn tasks_done(&self) -> bool {
        self.tasks.iter().all(JoinHandle::is_finished)
    }
}

impl Transport for ReqwestTransport {
    fn poll(&mut self) {
        // Tasks send before they finish, so once all are done the drain below
        // sees everything they will ever report
        let tasks_done = self.tasks_done();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => self.apply(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        // A task that ended without reporting has died
        let waiting = matches!(
            self.status,
            TransportStatus::Resolving | TransportStatus::Connecting | TransportStatus::Requesting
        ) || (self.status == TransportStatus::Body && !self.finished);
        if waiting && tasks_done {
            self.status = TransportStatus::ConnectionError;
        }

        self.settle();
    }

    fn status(&self) -> TransportStatus {
        self.status
    }

    fn response_code(&self) -> u16 {
        self.response_code
    }

    fn send_request(&mut self, request: &Request) -> AcornResult<()> {
        let host = self.origin.as_str();
        if self.status != TransportStatus::Connected {
            return Err(AcornError::protocol(
                host,
                &request.path,
                format!("cannot send a request while {}", self.status),
            ));
        }

        let url = Url::parse(&format!("{}{}", self.origin, request.path))
            .map_err(|e| AcornError::protocol(host, &request.path, format!("invalid request target: {}", e)))?;
        let mut builder = self.client.request(reqwest::Method::GET, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .build()
            .map_err(|e| AcornError::protocol(host, &request.path, e.to_string()))?;

        trace!(method = request.method.as_str(), url = %http_request.url(), "Sending request");
        let client = self.client.clone();
        let events = self.events.clone();
        let task = self.handle.spawn(async move {
            let mut response = match client.execute(http_request).await {
                Ok(response) => response,
                Err(e) => {
                    let status = if e.is_connect() {
                        TransportStatus::CantConnect
                    } else {
                        TransportStatus::ConnectionError
                    };
                    let _ = events.send(Event::Failed(status, e.to_string()));
                    return;
                },
            };

            if events.send(Event::Headers(response.status().as_u16())).is_err() {
                return;
            }
            loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        if events.send(Event::Chunk(bytes.to_vec())).is_err() {
                            return;
                        }
                    },
                    Ok(None) => {
                        let _ = events.send(Event::Finished);
                        return;
                    },
                    Err(e) => {
                        let _ = events.send(Event::Failed(
                            TransportStatus::ConnectionError,
                            e.to_string(),
                        ));
                        return;
                    },
                }
            }
        });

        self.tasks.push(task);
        self.status = TransportStatus::Requesting;
        Ok(())
    }

    fn read_body_chunk(&mut self) -> Vec<u8> {
        let chunk = self.chunks.pop_front().unwrap_or_default();
        self.settle();
        chunk
    }
}

impl Drop for ReqwestTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// First address that accepts a TCP connection
async fn open_connection(addrs: &[std::net::SocketAddr]) -> Event {
    let mut last_error = String::new();
    for addr in addrs {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => return Event::Connected,
            Ok(Err(e)) => last_error = format!("{}: {}", addr, e),
            Err(_) => last_error = format!("{}: connect timed out", addr),
        }
    }
    Event::Failed(TransportStatus::CantConnect, last_error)
}

/// `host[:port]` with userinfo removed and the port filled in
fn authority(host: &str, port: u16) -> String {
    let host = host.rsplit_once('@').map_or(host, |(_, rest)| rest);
    let has_port = match host.strip_prefix('[') {
        Some(bracketed) => bracketed
            .split_once(']')
            .map_or(false, |(_, rest)| rest.starts_with(':')),
        None => host.contains(':'),
    };

    if has_port {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}
