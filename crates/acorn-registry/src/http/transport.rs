//! Non-blocking transport interface the HTTP state machine drives.
//!
//! Nothing here blocks: `poll` advances whatever the connection is doing,
//! and `status`/`read_body_chunk` report what is available right now.

use acorn_core::error::AcornResult;
use std::fmt;

/// Status reported by a transport after the latest `poll`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Disconnected,
    Resolving,
    CantResolve,
    Connecting,
    CantConnect,
    /// Connected and idle; after a request this means the response had no body
    Connected,
    Requesting,
    /// Response headers received, body bytes may be read
    Body,
    ConnectionError,
    TlsHandshakeError,
}

impl TransportStatus {
    /// Still working towards a connection
    pub fn is_connecting(self) -> bool {
        matches!(self, TransportStatus::Resolving | TransportStatus::Connecting)
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportStatus::Disconnected => "disconnected",
            TransportStatus::Resolving => "resolving",
            TransportStatus::CantResolve => "cannot resolve host",
            TransportStatus::Connecting => "connecting",
            TransportStatus::CantConnect => "cannot connect",
            TransportStatus::Connected => "connected",
            TransportStatus::Requesting => "requesting",
            TransportStatus::Body => "body",
            TransportStatus::ConnectionError => "connection error",
            TransportStatus::TlsHandshakeError => "TLS handshake error",
        };
        f.write_str(name)
    }
}

/// Whether the connection is wrapped in TLS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    #[default]
    Secure,
    /// Plain TCP, for local mirrors and test servers
    Plain,
}

impl TlsMode {
    pub fn scheme(self) -> &'static str {
        match self {
            TlsMode::Secure => "https",
            TlsMode::Plain => "http",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            TlsMode::Secure => 443,
            TlsMode::Plain => 80,
        }
    }

    /// Pick the mode matching a URL scheme
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "https" => Some(TlsMode::Secure),
            "http" => Some(TlsMode::Plain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

/// A request as handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Origin-form target: path, query and fragment
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// GET with the fixed header set
    pub fn get(path: &str, user_agent: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            headers: vec![
                ("User-Agent".to_string(), user_agent.to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ],
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One connection to one host
pub trait Transport: Send {
    /// Advance connection, request and response processing without blocking
    fn poll(&mut self);

    fn status(&self) -> TransportStatus;

    /// Status code of the response, valid once headers are in
    fn response_code(&self) -> u16;

    /// Start a request; only valid while `Connected`
    fn send_request(&mut self, request: &Request) -> AcornResult<()>;

    /// Next available body bytes; empty when nothing has arrived yet
    fn read_body_chunk(&mut self) -> Vec<u8>;
}

/// Opens transports
pub trait Connector: Send + Sync {
    /// Begin connecting to `host`; the transport starts out resolving/connecting
    fn connect(&self, host: &str, port: u16, tls: TlsMode) -> AcornResult<Box<dyn Transport>>;
}
