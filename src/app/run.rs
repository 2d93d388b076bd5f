use crate::cli::app_config::{Cli, Commands};
use crate::endpoint::Endpoint;
use crate::http::timer::ConnectionTimer;
use crate::plugin::handshake::{report_metrics, HandshakePlugin};
use crate::plugin::ssl::SslPlugin;
use crate::plugin::{is_meta_request, write_definitions, write_values};
use crate::tls::config::{build_client_config, load_root_store, HTTP1_ALPN};
use crate::tls::handshake::DEFAULT_HANDSHAKE_TIMEOUT;
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

pub async fn main_with_error() -> Result<(), anyhow::Error> {
    let cli: Cli = Cli::parse();
    init_logging(cli.verbosity)?;

    run(cli).await
}

fn init_logging(verbosity: u8) -> Result<(), anyhow::Error> {
    let log_level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy()
        .add_directive("hyper_util=off".parse()?);
    // stdout belongs to the agent
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let limit = cli.timeout_option.map(Duration::from_secs);
    let prefix = cli.prefix_option.as_deref();
    let mut out = std::io::stdout();

    match cli.command {
        Some(Commands::Handshake {
            ref host,
            port,
            ref server_name,
        }) => {
            let endpoint = Endpoint::from_parts(host, port, server_name.clone())?;
            let tls_config = build_client_config(
                load_root_store(cli.certificate_path_option.as_deref())?,
                &[],
            )?;
            let plugin = HandshakePlugin::new(
                prefix,
                endpoint,
                tls_config,
                limit.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
            );
            if is_meta_request() {
                return write_definitions(&mut out, &plugin);
            }

            let report = plugin.measure().await;
            write_values(&mut out, &plugin, &report_metrics(&report), Utc::now().timestamp())?;
            report.outcome.map(|_| ())
        }
        None => {
            let raw = cli.url.as_deref().ok_or(anyhow!("URL is required"))?;
            let endpoint = Endpoint::parse(raw)?.with_server_name(cli.server_name_option.clone());
            let tls_config = build_client_config(
                load_root_store(cli.certificate_path_option.as_deref())?,
                &[HTTP1_ALPN],
            )?;
            let plugin = SslPlugin::new(prefix, endpoint, ConnectionTimer::new(tls_config, limit));
            if is_meta_request() {
                return write_definitions(&mut out, &plugin);
            }

            let metrics = plugin.fetch_metrics().await?;
            write_values(&mut out, &plugin, &metrics, Utc::now().timestamp())
        }
    }
}
