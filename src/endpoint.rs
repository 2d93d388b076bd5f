use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use url::{Host, Url};

const DEFAULT_SCHEME: &str = "https";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not parse url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("url {0:?} has no host")]
    MissingHost(String),
}

/// A normalized connection target.
///
/// Built once per invocation and never mutated afterwards. Two inputs that only
/// differ by an omitted `https://` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    server_name: Option<String>,
}

impl Endpoint {
    /// Normalizes a raw target string.
    ///
    /// Strings without `://` and without a leading `//` are treated as a bare
    /// authority (`example.com:8443/path`). Anything without a scheme ends up
    /// as `https`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let authority_form = if !raw.contains("://") && !raw.starts_with("//") {
            format!("//{raw}")
        } else {
            raw.to_string()
        };
        let parsed = match authority_form.strip_prefix("//") {
            Some(rest) => Url::parse(&format!("{DEFAULT_SCHEME}://{rest}")),
            None => Url::parse(&authority_form),
        };
        let url = parsed.map_err(|source| ConfigError::InvalidUrl {
            input: authority_form.clone(),
            source,
        })?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingHost(raw.to_string()));
        }
        Ok(Self {
            url,
            server_name: None,
        })
    }

    /// Builds a TLS target from explicit host and port.
    pub fn from_parts(
        host: &str,
        port: u16,
        server_name: Option<String>,
    ) -> Result<Self, ConfigError> {
        let authority = match host.parse::<Ipv6Addr>() {
            Ok(v6) => format!("[{v6}]:{port}"),
            Err(_) => format!("{host}:{port}"),
        };
        Ok(Self::parse(&format!("{DEFAULT_SCHEME}://{authority}"))?.with_server_name(server_name))
    }

    /// Overrides the name sent in SNI and checked against the certificate.
    pub fn with_server_name(mut self, server_name: Option<String>) -> Self {
        self.server_name = server_name.filter(|s| !s.is_empty());
        self
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Host without IPv6 brackets.
    pub fn host(&self) -> &str {
        let host = self.url.host_str().unwrap_or_default();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    /// Explicit port, `None` when the scheme default applies.
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    pub fn port_or_default(&self) -> u16 {
        self.url.port_or_known_default().unwrap_or(443)
    }

    pub fn ip_literal(&self) -> Option<IpAddr> {
        match self.url.host()? {
            Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
            Host::Ipv6(v6) => Some(IpAddr::V6(v6)),
            Host::Domain(_) => None,
        }
    }

    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or_else(|| self.host())
    }

    /// Value for the `Host` header.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Origin-form request target: path plus query.
    pub fn request_target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
