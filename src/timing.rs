use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Lifecycle hooks fired by the dialer at each phase boundary.
///
/// Implementations are called inline on the dialing task. They must not block
/// or do I/O (logging included): anything they do lands inside the measured phase.
pub trait ConnectionTrace {
    fn dns_start(&mut self, _host: &str) {}
    fn dns_done(&mut self, _result: Result<&[SocketAddr], &io::Error>) {}
    fn connect_start(&mut self, _addr: SocketAddr) {}
    fn connect_done(&mut self, _addr: SocketAddr, _error: Option<&io::Error>) {}
    fn tls_handshake_start(&mut self) {}
    fn tls_handshake_done(&mut self, _error: Option<&io::Error>) {}
}

/// Elapsed time per connection phase. `None` means the phase never completed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimingSample {
    pub dns_lookup: Option<Duration>,
    pub tcp_handshake: Option<Duration>,
    pub tls_handshake: Option<Duration>,
}

impl TimingSample {
    pub fn dns_lookup_ms(&self) -> f64 {
        whole_millis(self.dns_lookup)
    }

    pub fn tcp_handshake_ms(&self) -> f64 {
        whole_millis(self.tcp_handshake)
    }

    pub fn tls_handshake_ms(&self) -> f64 {
        whole_millis(self.tls_handshake)
    }
}

fn whole_millis(phase: Option<Duration>) -> f64 {
    phase.map_or(0.0, |d| d.as_millis() as f64)
}

impl fmt::Display for TimingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time breakdown:")?;

        if let Some(dns) = self.dns_lookup {
            writeln!(f, "  DNS lookup:      {:>8} ms", dns.as_millis())?;
        } else {
            writeln!(f, "  DNS lookup:      N/A")?;
        }

        if let Some(tcp) = self.tcp_handshake {
            writeln!(f, "  TCP connect:     {:>8} ms", tcp.as_millis())?;
        } else {
            writeln!(f, "  TCP connect:     N/A")?;
        }

        if let Some(tls) = self.tls_handshake {
            write!(f, "  TLS handshake:   {:>8} ms", tls.as_millis())
        } else {
            write!(f, "  TLS handshake:   N/A")
        }
    }
}

/// Per-attempt hook sink that turns phase boundaries into a [`TimingSample`].
///
/// Only the first start of each phase is kept; repeated start events (several
/// connect attempts, say) are measured from the earliest one.
#[derive(Debug, Default)]
pub struct PhaseRecorder {
    dns_start: Option<Instant>,
    tcp_connect_start: Option<Instant>,
    tls_start: Option<Instant>,
    sample: TimingSample,
}

impl PhaseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_sample(self) -> TimingSample {
        self.sample
    }
}

fn mark_start(slot: &mut Option<Instant>) {
    if slot.is_none() {
        *slot = Some(Instant::now());
    }
}

fn since(start: Option<Instant>) -> Option<Duration> {
    start.map(|s| s.elapsed())
}

impl ConnectionTrace for PhaseRecorder {
    fn dns_start(&mut self, _host: &str) {
        mark_start(&mut self.dns_start);
    }

    fn dns_done(&mut self, _result: Result<&[SocketAddr], &io::Error>) {
        if let Some(elapsed) = since(self.dns_start) {
            self.sample.dns_lookup = Some(elapsed);
        }
    }

    fn connect_start(&mut self, _addr: SocketAddr) {
        mark_start(&mut self.tcp_connect_start);
    }

    fn connect_done(&mut self, _addr: SocketAddr, _error: Option<&io::Error>) {
        if let Some(elapsed) = since(self.tcp_connect_start) {
            self.sample.tcp_handshake = Some(elapsed);
        }
    }

    fn tls_handshake_start(&mut self) {
        mark_start(&mut self.tls_start);
    }

    fn tls_handshake_done(&mut self, _error: Option<&io::Error>) {
        if let Some(elapsed) = since(self.tls_start) {
            self.sample.tls_handshake = Some(elapsed);
        }
    }
}
