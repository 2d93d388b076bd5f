use crate::endpoint::Endpoint;
use crate::http::error::VisitError;
use crate::http::resolver::DnsLoggingResolver;
use crate::timing::ConnectionTrace;
use pki_types::ServerName;
use rustls::ClientConfig;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

pub trait AsyncIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncIo for T {}

pub type BoxedIo = Box<dyn AsyncIo>;

/// Opens the transport for one visit, reporting every phase boundary to a
/// [`ConnectionTrace`].
#[derive(Clone)]
pub struct Dialer {
    resolver: DnsLoggingResolver,
    tls: TlsConnector,
}

impl Dialer {
    pub fn new(tls_config: Arc<ClientConfig>) -> Self {
        Self {
            resolver: DnsLoggingResolver::new(),
            tls: TlsConnector::from(tls_config),
        }
    }

    pub async fn dial<T>(&self, endpoint: &Endpoint, trace: &mut T) -> Result<BoxedIo, VisitError>
    where
        T: ConnectionTrace + ?Sized,
    {
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(VisitError::UnsupportedScheme(endpoint.scheme().to_string()));
        }
        let port = endpoint.port_or_default();

        let addrs = match endpoint.ip_literal() {
            Some(ip) => vec![SocketAddr::new(ip, port)],
            None => {
                let host = endpoint.host();
                trace.dns_start(host);
                let resolved = self.resolver.resolve(host, port).await;
                trace.dns_done(resolved.as_deref());
                self.resolver.log_answer(host, &resolved);
                resolved.map_err(|source| VisitError::Resolve {
                    host: host.to_string(),
                    source,
                })?
            }
        };

        let tcp = connect_first(&addrs, trace).await?;
        if !endpoint.is_secure() {
            return Ok(Box::new(tcp));
        }

        let server_name = ServerName::try_from(endpoint.server_name().to_string())
            .map_err(|_| VisitError::ServerName(endpoint.server_name().to_string()))?;
        trace.tls_handshake_start();
        let handshake = self.tls.connect(server_name, tcp).await;
        trace.tls_handshake_done(handshake.as_ref().err());
        let tls_stream = handshake.map_err(VisitError::Tls)?;
        Ok(Box::new(tls_stream))
    }
}

/// Connects to the first resolved address. A failed attempt ends the visit
/// with [`VisitError::Connect`]; no other address is tried.
async fn connect_first<T>(addrs: &[SocketAddr], trace: &mut T) -> Result<TcpStream, VisitError>
where
    T: ConnectionTrace + ?Sized,
{
    let addr = *addrs.first().ok_or_else(|| VisitError::Resolve {
        host: String::new(),
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses to dial"),
    })?;

    trace.connect_start(addr);
    let connected = TcpStream::connect(addr).await;
    trace.connect_done(addr, connected.as_ref().err());
    let stream = connected.map_err(|source| VisitError::Connect { addr, source })?;
    if let Err(err) = stream.set_nodelay(true) {
        trace!("could not set TCP_NODELAY on {}: {}", addr, err);
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        closed_port, garbage_server, localhost_ip, tls_server, tls_server_on, TestPki,
    };
    use crate::timing::PhaseRecorder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tracing::Level;

    #[derive(Default)]
    struct EventLog(Vec<&'static str>);

    impl ConnectionTrace for EventLog {
        fn dns_start(&mut self, _host: &str) {
            self.0.push("dns_start");
        }
        fn dns_done(&mut self, _result: Result<&[SocketAddr], &io::Error>) {
            self.0.push("dns_done");
        }
        fn connect_start(&mut self, _addr: SocketAddr) {
            self.0.push("connect_start");
        }
        fn connect_done(&mut self, _addr: SocketAddr, error: Option<&io::Error>) {
            self.0.push(if error.is_some() { "connect_failed" } else { "connect_done" });
        }
        fn tls_handshake_start(&mut self) {
            self.0.push("tls_start");
        }
        fn tls_handshake_done(&mut self, error: Option<&io::Error>) {
            self.0.push(if error.is_some() { "tls_failed" } else { "tls_done" });
        }
    }

    #[tokio::test]
    async fn ip_literal_skips_dns_hooks() {
        let pki = TestPki::generate();
        let addr = tls_server(&pki, b"").await;
        let endpoint = Endpoint::parse(&format!("https://127.0.0.1:{}", addr.port()))
            .unwrap()
            .with_server_name(Some("localhost".to_string()));

        let mut log = EventLog::default();
        Dialer::new(pki.client_config())
            .dial(&endpoint, &mut log)
            .await
            .unwrap();

        assert_eq!(log.0, vec!["connect_start", "connect_done", "tls_start", "tls_done"]);
    }

    #[tokio::test]
    async fn hostname_fires_every_hook_in_order() {
        let pki = TestPki::generate();
        let addr = tls_server_on(&pki, localhost_ip().await, b"").await;
        let endpoint = Endpoint::parse(&format!("https://localhost:{}", addr.port())).unwrap();

        let mut log = EventLog::default();
        Dialer::new(pki.client_config())
            .dial(&endpoint, &mut log)
            .await
            .unwrap();

        assert_eq!(
            log.0,
            vec!["dns_start", "dns_done", "connect_start", "connect_done", "tls_start", "tls_done"]
        );
    }

    const WRITE_DELAY: Duration = Duration::from_millis(150);

    struct SlowWriter(Arc<AtomicUsize>);

    impl io::Write for SlowWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(WRITE_DELAY);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn debug_logging_stays_out_of_the_dns_window() {
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = writes.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(move || SlowWriter(counter.clone()))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let endpoint = Endpoint::parse(&format!("http://localhost:{}", closed_port().await)).unwrap();
        let mut recorder = PhaseRecorder::new();
        let _ = Dialer::new(TestPki::generate().client_config())
            .dial(&endpoint, &mut recorder)
            .await;

        assert!(writes.load(Ordering::SeqCst) > 0);
        let dns = recorder.into_sample().dns_lookup.unwrap();
        assert!(dns < WRITE_DELAY, "dns lookup measured {:?}", dns);
    }

    #[tokio::test]
    async fn plain_http_skips_tls_hooks() {
        let addr = garbage_server().await;
        let endpoint = Endpoint::parse(&format!("http://127.0.0.1:{}", addr.port())).unwrap();

        let mut log = EventLog::default();
        Dialer::new(TestPki::generate().client_config())
            .dial(&endpoint, &mut log)
            .await
            .unwrap();

        assert_eq!(log.0, vec!["connect_start", "connect_done"]);
    }

    #[tokio::test]
    async fn refused_connect_stops_before_tls() {
        let port = closed_port().await;
        let endpoint = Endpoint::parse(&format!("127.0.0.1:{}", port)).unwrap();

        let mut log = EventLog::default();
        let err = Dialer::new(TestPki::generate().client_config())
            .dial(&endpoint, &mut log)
            .await
            .err()
            .unwrap();

        assert!(err.is_fatal());
        assert_eq!(log.0, vec!["connect_start", "connect_failed"]);
    }

    #[tokio::test]
    async fn unsupported_scheme_never_dials() {
        let endpoint = Endpoint::parse("ftp://127.0.0.1").unwrap();
        let mut recorder = PhaseRecorder::new();
        let err = Dialer::new(TestPki::generate().client_config())
            .dial(&endpoint, &mut recorder)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, VisitError::UnsupportedScheme(_)));
        assert!(recorder.into_sample().tcp_handshake.is_none());
    }
}
