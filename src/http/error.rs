use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Failure of one timed HTTP(S) visit.
///
/// Only [`VisitError::Connect`] is fatal; everything else is reported as a
/// missing sample.
#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("unsupported protocol scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("dns lookup for {host} failed: {source}")]
    Resolve { host: String, source: io::Error },
    #[error("unable to connect to host {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("invalid TLS server name {0:?}")]
    ServerName(String),
    #[error("tls handshake failed: {0}")]
    Tls(#[source] io::Error),
    #[error("unable to create request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("http exchange failed: {0}")]
    Http(#[from] hyper::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl VisitError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, VisitError::Connect { .. })
    }
}
