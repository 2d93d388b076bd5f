//! The Mackerel agent plugin contract.
//!
//! A plugin prints either its graph definitions (when the agent sets
//! `MACKEREL_AGENT_PLUGIN_META=1`) or one `key\tvalue\ttimestamp` line per
//! metric.

pub mod handshake;
pub mod ssl;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

pub const PLUGIN_META_ENV: &str = "MACKEREL_AGENT_PLUGIN_META";
const META_HEADER: &str = "# mackerel-agent-plugin";

/// Metric name to value, as handed to the agent.
pub type Metrics = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDef {
    pub name: String,
    pub label: String,
    pub stacked: bool,
}

impl MetricDef {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            stacked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    pub label: String,
    pub unit: String,
    pub metrics: Vec<MetricDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDefinitions {
    pub graphs: BTreeMap<String, Graph>,
}

/// Static description of what a plugin reports. Nothing here may depend on a
/// measurement.
pub trait MetricSource {
    fn metric_key_prefix(&self) -> &str;

    fn graph_definition(&self) -> GraphDefinitions;
}

/// Resolves an optional user prefix: empty or missing falls back to `default`,
/// anything else is kept verbatim.
pub fn prefix_or_default(prefix: Option<&str>, default: &'static str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => default.to_string(),
    }
}

/// Upper-cases the first letter of every word. Word boundaries are any
/// characters other than Unicode letters, digits and `_`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

pub fn is_meta_request() -> bool {
    std::env::var(PLUGIN_META_ENV).map_or(false, |v| v == "1")
}

pub fn write_definitions<W, S>(out: &mut W, source: &S) -> Result<(), anyhow::Error>
where
    W: Write,
    S: MetricSource + ?Sized,
{
    writeln!(out, "{}", META_HEADER)?;
    writeln!(out, "{}", serde_json::to_string(&source.graph_definition())?)?;
    Ok(())
}

/// Writes `prefix.name\tvalue\ttimestamp` for every defined metric present in
/// `metrics`, in definition order.
pub fn write_values<W, S>(
    out: &mut W,
    source: &S,
    metrics: &Metrics,
    timestamp: i64,
) -> Result<(), anyhow::Error>
where
    W: Write,
    S: MetricSource + ?Sized,
{
    let prefix = source.metric_key_prefix();
    for graph in source.graph_definition().graphs.values() {
        for def in &graph.metrics {
            if let Some(value) = metrics.get(&def.name) {
                writeln!(out, "{}.{}\t{:.6}\t{}", prefix, def.name, value, timestamp)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
