//! Loopback servers and throwaway certificates shared by the network tests.

use crate::tls::config::{build_client_config, HTTP1_ALPN};
use pki_types::{CertificateDer, PrivatePkcs8KeyDer};
use rustls::crypto::ring::default_provider;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub struct TestPki {
    cert: CertificateDer<'static>,
    key: Vec<u8>,
}

impl TestPki {
    /// Self-signed certificate for `localhost`.
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        Self {
            cert: certified.cert.der().clone(),
            key: certified.key_pair.serialize_der(),
        }
    }

    /// Client config that trusts only this certificate.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        let mut roots = RootCertStore::empty();
        roots.add(self.cert.clone()).unwrap();
        build_client_config(roots, &[HTTP1_ALPN]).unwrap()
    }

    fn server_config(&self) -> Arc<ServerConfig> {
        let config = ServerConfig::builder_with_provider(Arc::new(default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![self.cert.clone()],
                PrivatePkcs8KeyDer::from(self.key.clone()).into(),
            )
            .unwrap();
        Arc::new(config)
    }
}

/// A loopback port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Accepts TCP and answers with plaintext, so any TLS handshake fails.
pub async fn garbage_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                continue;
            };
            tokio::spawn(async move {
                let _ = stream
                    .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n")
                    .await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// The address the dialer will pick for `localhost`: the first system answer.
pub async fn localhost_ip() -> IpAddr {
    tokio::net::lookup_host("localhost:0")
        .await
        .unwrap()
        .next()
        .unwrap()
        .ip()
}

/// TLS server that reads one request head and writes `response` verbatim.
pub async fn tls_server(pki: &TestPki, response: &'static [u8]) -> SocketAddr {
    tls_server_on(pki, IpAddr::V4(Ipv4Addr::LOCALHOST), response).await
}

pub async fn tls_server_on(pki: &TestPki, ip: IpAddr, response: &'static [u8]) -> SocketAddr {
    let acceptor = TlsAcceptor::from(pki.server_config());
    let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls_stream) = acceptor.accept(stream).await else {
                    return;
                };
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match tls_stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = tls_stream.write_all(response).await;
                let _ = tls_stream.shutdown().await;
            });
        }
    });
    addr
}
