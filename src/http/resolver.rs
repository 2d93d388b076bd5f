use std::io;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;

/// System resolver run on the blocking pool. Lookups themselves stay silent;
/// [`DnsLoggingResolver::log_answer`] reports them once the caller is done timing.
#[derive(Clone, Debug, Default)]
pub struct DnsLoggingResolver;

impl DnsLoggingResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        let owned_host = host.to_string();

        let addrs_iter = tokio::task::spawn_blocking(move || (owned_host, port).to_socket_addrs())
            .await
            .map_err(io::Error::other)??;
        let addresses: Vec<_> = addrs_iter.collect();

        if addresses.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No IP addresses found for host {}", host),
            ));
        }

        Ok(addresses)
    }

    pub fn log_answer(&self, host: &str, answer: &io::Result<Vec<SocketAddr>>) {
        let addresses = match answer {
            Ok(addresses) => addresses,
            Err(err) => {
                debug!("DNS lookup for {} failed: {}", host, err);
                return;
            }
        };
        debug!("Resolved DNS for: {}", host);
        for (i, addr) in addresses.iter().enumerate() {
            if i == 0 {
                debug!("Resolved IP: {}", addr.ip());
            } else {
                debug!("Resolved IP (alternative): {}", addr.ip());
            }
        }
    }
}
