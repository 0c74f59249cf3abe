//! Scripted in-memory transport for exercising the state machine

use super::scheduler::{Scheduler, TickFuture};
use super::transport::{Connector, Request, TlsMode, Transport, TransportStatus};
use acorn_core::error::{AcornError, AcornResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How a host behaves when connected to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostBehavior {
    /// Connects after `connect_polls` polls
    Reachable,
    /// `Connector::connect` itself fails
    ConnectFails,
    /// Connecting ends in this status
    Status(TransportStatus),
    /// Never leaves `Connecting`
    Hang,
}

/// Scripted response for one `(host, path)`
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status the transport reports once the request completes
    pub after_request: TransportStatus,
    pub code: u16,
    /// One entry per `read_body_chunk`; an empty entry means nothing has arrived yet
    pub reads: Vec<Vec<u8>>,
    /// Status once every read is consumed
    pub body_end: TransportStatus,
    /// Polls spent in `Requesting`
    pub request_polls: usize,
    /// `send_request` fails
    pub send_fails: bool,
}

impl MockResponse {
    pub fn ok(body: &[u8]) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(code: u16, body: &[u8]) -> Self {
        Self {
            after_request: TransportStatus::Body,
            code,
            reads: vec![body.to_vec()],
            body_end: TransportStatus::Connected,
            request_polls: 1,
            send_fails: false,
        }
    }

    pub fn chunked(reads: Vec<Vec<u8>>) -> Self {
        Self {
            reads,
            ..Self::ok(b"")
        }
    }
}

#[derive(Default)]
struct Shared {
    hosts: HashMap<String, HostBehavior>,
    routes: HashMap<(String, String), MockResponse>,
    requests: Vec<(String, Request)>,
    connects: Vec<(String, u16, TlsMode)>,
}

/// Connector handing out scripted transports
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<Mutex<Shared>>,
    live: Arc<AtomicUsize>,
    connect_polls: usize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            live: Arc::default(),
            connect_polls: 2,
        }
    }

    pub fn host(self, host: &str, behavior: HostBehavior) -> Self {
        self.shared
            .lock()
            .unwrap()
            .hosts
            .insert(host.to_string(), behavior);
        self
    }

    pub fn route(self, host: &str, path: &str, response: MockResponse) -> Self {
        self.shared
            .lock()
            .unwrap()
            .routes
            .insert((host.to_string(), path.to_string()), response);
        self
    }

    pub fn requests(&self) -> Vec<(String, Request)> {
        self.shared.lock().unwrap().requests.clone()
    }

    pub fn connects(&self) -> Vec<(String, u16, TlsMode)> {
        self.shared.lock().unwrap().connects.clone()
    }

    /// Transports not yet dropped
    pub fn live_transports(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self, host: &str, port: u16, tls: TlsMode) -> AcornResult<Box<dyn Transport>> {
        let mut shared = self.shared.lock().unwrap();
        shared.connects.push((host.to_string(), port, tls));

        let behavior = shared
            .hosts
            .get(host)
            .cloned()
            .unwrap_or(HostBehavior::Reachable);
        if behavior == HostBehavior::ConnectFails {
            return Err(AcornError::connection(host, "connection refused"));
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockTransport {
            host: host.to_string(),
            shared: Arc::clone(&self.shared),
            live: Arc::clone(&self.live),
            behavior,
            status: TransportStatus::Resolving,
            polls_left: self.connect_polls,
            response: None,
            reads: VecDeque::new(),
        }))
    }
}

struct MockTransport {
    host: String,
    shared: Arc<Mutex<Shared>>,
    live: Arc<AtomicUsize>,
    behavior: HostBehavior,
    status: TransportStatus,
    polls_left: usize,
    response: Option<MockResponse>,
    reads: VecDeque<Vec<u8>>,
}

impl Transport for MockTransport {
    fn poll(&mut self) {
        match self.status {
            TransportStatus::Resolving | TransportStatus::Connecting => {
                if self.behavior == HostBehavior::Hang {
                    self.status = TransportStatus::Connecting;
                } else if self.polls_left > 0 {
                    self.polls_left -= 1;
                    self.status = TransportStatus::Connecting;
                } else {
                    self.status = match &self.behavior {
                        HostBehavior::Status(status) => *status,
                        _ => TransportStatus::Connected,
                    };
                }
            },
            TransportStatus::Requesting => {
                if self.polls_left > 0 {
                    self.polls_left -= 1;
                } else if let Some(response) = &self.response {
                    self.status = response.after_request;
                }
            },
            _ => {},
        }
    }

    fn status(&self) -> TransportStatus {
        self.status
    }

    fn response_code(&self) -> u16 {
        self.response.as_ref().map_or(0, |response| response.code)
    }

    fn send_request(&mut self, request: &Request) -> AcornResult<()> {
        let mut shared = self.shared.lock().unwrap();
        shared.requests.push((self.host.clone(), request.clone()));

        let response = shared
            .routes
            .get(&(self.host.clone(), request.path.clone()))
            .cloned()
            .unwrap_or_else(|| MockResponse::with_status(404, b""));
        if response.send_fails {
            return Err(AcornError::connection(&self.host, "broken pipe"));
        }

        self.polls_left = response.request_polls;
        self.reads = response.reads.iter().cloned().collect();
        self.response = Some(response);
        self.status = TransportStatus::Requesting;
        Ok(())
    }

    fn read_body_chunk(&mut self) -> Vec<u8> {
        let chunk = self.reads.pop_front().unwrap_or_default();
        if self.reads.is_empty() {
            if let Some(response) = &self.response {
                self.status = response.body_end;
            }
        }
        chunk
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Yields like the frame scheduler and counts how often it was asked to
#[derive(Default)]
pub struct CountingScheduler {
    ticks: AtomicUsize,
}

impl CountingScheduler {
    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Scheduler for CountingScheduler {
    fn next_tick(&self) -> TickFuture<'_> {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Box::pin(tokio::task::yield_now())
    }
}
