use crate::endpoint::Endpoint;
use crate::http::error::VisitError;
use crate::http::timer::ConnectionTimer;
use crate::plugin::{
    prefix_or_default, title_case, Graph, GraphDefinitions, MetricDef, MetricSource, Metrics,
};
use crate::timing::TimingSample;
use std::collections::BTreeMap;

pub const DEFAULT_PREFIX: &str = "ssl";

pub const DNS_LOOKUP_TIME: &str = "dnsLookupTime";
pub const TCP_HANDSHAKE_TIME: &str = "tcphandshakeTime";
pub const SSL_HANDSHAKE_TIME: &str = "sslhandshakeTime";

/// Connection phase latencies of one HTTP(S) request, in milliseconds.
pub struct SslPlugin {
    prefix: String,
    endpoint: Endpoint,
    timer: ConnectionTimer,
}

impl SslPlugin {
    pub fn new(prefix: Option<&str>, endpoint: Endpoint, timer: ConnectionTimer) -> Self {
        Self {
            prefix: prefix_or_default(prefix, DEFAULT_PREFIX),
            endpoint,
            timer,
        }
    }

    /// Runs one visit. Connect-phase failures are returned; any other failure
    /// yields an empty set so the agent just sees a gap.
    pub async fn fetch_metrics(&self) -> Result<Metrics, VisitError> {
        match self.timer.visit(&self.endpoint).await {
            Ok(sample) => Ok(sample_metrics(&sample)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("{}: {}", self.endpoint, e);
                Ok(Metrics::new())
            }
        }
    }
}

pub fn sample_metrics(sample: &TimingSample) -> Metrics {
    let mut metrics = Metrics::new();
    metrics.insert(DNS_LOOKUP_TIME.to_string(), sample.dns_lookup_ms());
    metrics.insert(TCP_HANDSHAKE_TIME.to_string(), sample.tcp_handshake_ms());
    metrics.insert(SSL_HANDSHAKE_TIME.to_string(), sample.tls_handshake_ms());
    metrics
}

impl MetricSource for SslPlugin {
    fn metric_key_prefix(&self) -> &str {
        &self.prefix
    }

    fn graph_definition(&self) -> GraphDefinitions {
        let mut graphs = BTreeMap::new();
        graphs.insert(
            self.prefix.clone(),
            Graph {
                label: format!("{}_connection_time", title_case(&self.prefix)),
                unit: "float".to_string(),
                metrics: vec![
                    MetricDef::named(DNS_LOOKUP_TIME),
                    MetricDef::named(TCP_HANDSHAKE_TIME),
                    MetricDef::named(SSL_HANDSHAKE_TIME),
                ],
            },
        );
        GraphDefinitions { graphs }
    }
}
