use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub chain: Chain,
    pub coordinator: Coordinator,
    pub gateway: Gateway,
    pub metrics: Metrics,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chain {
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Coordinator {
    /// Fixed service port of the elected coordinator. Consensus-critical:
    /// every cooperating node must use the same value.
    #[serde(default = "default_coordinator_port")]
    pub port: u16,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Gateway {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_metrics_bind")]
    pub bind: String,
}

fn default_rpc_endpoint() -> String { "http://127.0.0.1:19932".into() }
fn default_coordinator_port() -> u16 { 4334 }
fn default_check_interval() -> u64 { 60 }
fn default_gateway_bind() -> String { "0.0.0.0:8000".into() }
fn default_metrics_bind() -> String { "0.0.0.0:9100".into() }

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read or parsed.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

/// Deserialize a `Config` from TOML text (used for the embedded fallback).
pub fn load_from_str(text: &str) -> Result<Config> {
    toml::from_str(text).with_context(|| "📝  invalid TOML in config file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = load_from_str("[chain]\n[coordinator]\n[gateway]\n[metrics]\n").unwrap();
        assert_eq!(cfg.coordinator.port, 4334);
        assert_eq!(cfg.coordinator.check_interval_secs, 60);
        assert_eq!(cfg.chain.rpc_endpoint, "http://127.0.0.1:19932");
    }

    #[test]
    fn embedded_config_parses() {
        let cfg = load_from_str(include_str!("../config.toml")).unwrap();
        assert_eq!(cfg.coordinator.port, 4334);
        assert_eq!(cfg.gateway.bind, "0.0.0.0:8000");
    }
}
