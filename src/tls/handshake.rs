use crate::endpoint::Endpoint;
use pki_types::ServerName;
use rustls::ClientConfig;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

/// Ceiling applied to the raw handshake dial when no timeout is configured.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Negotiated parameters of a completed handshake.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub tls_version: String,
    pub cipher_suite: String,
    pub peer_certificates: usize,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} certificates)",
            self.tls_version, self.cipher_suite, self.peer_certificates
        )
    }
}

/// Result of one TCP+TLS dial. `elapsed` is filled in whatever the outcome.
#[derive(Debug)]
pub struct HandshakeReport {
    pub elapsed: Duration,
    pub outcome: Result<SessionSummary, anyhow::Error>,
}

impl HandshakeReport {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Dials `endpoint` over TCP and TLS, measuring from the start of the TCP
/// connect to the end of the handshake.
pub async fn measure_handshake(
    endpoint: &Endpoint,
    tls_config: Arc<ClientConfig>,
    limit: Duration,
) -> HandshakeReport {
    let start = Instant::now();
    let outcome = match timeout(limit, dial(endpoint, tls_config)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(anyhow!(
            "TLS handshake with {}:{} timed out after {:?}",
            endpoint.host(),
            endpoint.port_or_default(),
            limit
        )),
    };
    let elapsed = start.elapsed();

    match &outcome {
        Ok(summary) => debug!("handshake completed in {:?}: {}", elapsed, summary),
        Err(e) => debug!("handshake failed after {:?}: {:#}", elapsed, e),
    }
    HandshakeReport { elapsed, outcome }
}

async fn dial(
    endpoint: &Endpoint,
    tls_config: Arc<ClientConfig>,
) -> Result<SessionSummary, anyhow::Error> {
    let host = endpoint.host();
    let port = endpoint.port_or_default();
    let server_name = ServerName::try_from(endpoint.server_name().to_string())
        .map_err(|_| anyhow!("Invalid server name: {}", endpoint.server_name()))?;

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| anyhow!("unable to connect to {}:{}: {}", host, port, e))?;

    let connector = TlsConnector::from(tls_config);
    let tls_stream = connector
        .connect(server_name, stream)
        .await
        .map_err(|e| anyhow!("TLS handshake with {}:{} failed: {}", host, port, e))?;

    let (_, session) = tls_stream.get_ref();
    Ok(SessionSummary {
        tls_version: session
            .protocol_version()
            .map_or_else(|| "unknown".to_string(), |v| format!("{:?}", v)),
        cipher_suite: session
            .negotiated_cipher_suite()
            .map_or_else(|| "unknown".to_string(), |s| format!("{:?}", s.suite())),
        peer_certificates: session.peer_certificates().map_or(0, |c| c.len()),
    })
}
