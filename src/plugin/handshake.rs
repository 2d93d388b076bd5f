use crate::endpoint::Endpoint;
use crate::plugin::{
    prefix_or_default, title_case, Graph, GraphDefinitions, MetricDef, MetricSource, Metrics,
};
use crate::tls::handshake::{measure_handshake, HandshakeReport};
use rustls::ClientConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PREFIX: &str = "tls";

pub const SECONDS: &str = "seconds";

/// Time to complete a raw TCP+TLS dial, in seconds.
pub struct HandshakePlugin {
    prefix: String,
    endpoint: Endpoint,
    tls_config: Arc<ClientConfig>,
    limit: Duration,
}

impl HandshakePlugin {
    pub fn new(
        prefix: Option<&str>,
        endpoint: Endpoint,
        tls_config: Arc<ClientConfig>,
        limit: Duration,
    ) -> Self {
        Self {
            prefix: prefix_or_default(prefix, DEFAULT_PREFIX),
            endpoint,
            tls_config,
            limit,
        }
    }

    pub async fn measure(&self) -> HandshakeReport {
        measure_handshake(&self.endpoint, self.tls_config.clone(), self.limit).await
    }
}

/// The duration is reported whether or not the dial succeeded.
pub fn report_metrics(report: &HandshakeReport) -> Metrics {
    let mut metrics = Metrics::new();
    metrics.insert(SECONDS.to_string(), report.seconds());
    metrics
}

impl MetricSource for HandshakePlugin {
    fn metric_key_prefix(&self) -> &str {
        &self.prefix
    }

    fn graph_definition(&self) -> GraphDefinitions {
        let mut graphs = BTreeMap::new();
        graphs.insert(
            self.prefix.clone(),
            Graph {
                label: format!("{}_handshake_time", title_case(&self.prefix)),
                unit: "float".to_string(),
                metrics: vec![MetricDef::named(SECONDS)],
            },
        );
        GraphDefinitions { graphs }
    }
}
