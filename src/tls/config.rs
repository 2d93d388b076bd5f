use anyhow::Context;
use rustls::crypto::ring::{default_provider, DEFAULT_CIPHER_SUITES};
use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};
use std::path::Path;
use std::sync::Arc;

/// TLS 1.2 is the floor; nothing older is ever offered.
pub static PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

pub const HTTP1_ALPN: &[u8] = b"http/1.1";

/// Loads trust anchors from a PEM bundle, or the bundled webpki roots.
pub fn load_root_store(ca_path: Option<&Path>) -> Result<RootCertStore, anyhow::Error> {
    let mut root_store = RootCertStore::empty();
    if let Some(file_path) = ca_path {
        let f = std::fs::File::open(file_path)
            .with_context(|| format!("Failed to open CA bundle {}", file_path.display()))?;
        let mut rd = std::io::BufReader::new(f);
        for cert in rustls_pemfile::certs(&mut rd) {
            root_store.add(cert?)?;
        }
        ensure!(
            !root_store.is_empty(),
            "CA bundle {} contains no certificates",
            file_path.display()
        );
    } else {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    };
    Ok(root_store)
}

/// Client config with standard WebPKI verification and the TLS 1.2 floor.
pub fn build_client_config(
    root_store: RootCertStore,
    alpn: &[&[u8]],
) -> Result<Arc<ClientConfig>, anyhow::Error> {
    let provider = Arc::new(rustls::crypto::CryptoProvider {
        cipher_suites: DEFAULT_CIPHER_SUITES.to_vec(),
        ..default_provider()
    });

    let mut tls_config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(PROTOCOL_VERSIONS)?
        .with_root_certificates(root_store)
        .with_no_client_auth();
    tls_config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();

    Ok(Arc::new(tls_config))
}
