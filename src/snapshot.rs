//! Snapshot provider: fetches the chain tip, our identity and the peer list
//! from the local chain node's HTTP RPC and folds them into a [`Snapshot`].
//!
//! Everything here is a possibly-slow, possibly-failing remote call; any
//! transport or decode failure collapses to `SnapshotError::Unavailable` and
//! the caller retries on its own schedule (the maintenance loop waits for
//! its next tick, it never retries inline).

use crate::election::{PeerRecord, PeerStatus, Snapshot};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

const RPC_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum SnapshotError {
    /// Transient transport/decode failure; retried on the next tick.
    Unavailable(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Unavailable(reason) => write!(f, "snapshot unavailable: {}", reason),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<reqwest::Error> for SnapshotError {
    fn from(e: reqwest::Error) -> Self {
        SnapshotError::Unavailable(e.to_string())
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot, SnapshotError>;
}

#[derive(Debug, Deserialize)]
struct BlockInfo {
    merkleroot: String,
}

/// Concrete provider against a chain node's HTTP RPC.
pub struct RpcSnapshotProvider {
    base: String,
    client: reqwest::Client,
}

impl RpcSnapshotProvider {
    pub fn new(rpc_endpoint: impl Into<String>) -> Result<Self, SnapshotError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .build()?;
        Ok(Self { base: rpc_endpoint.into(), client })
    }

    async fn best_block_merkle_root(&self) -> Result<String, SnapshotError> {
        let url = format!("{}/getbestblockhash", self.base);
        let blockhash = self.client.get(&url).send().await?.error_for_status()?.text().await?;
        let url = format!("{}/getblock", self.base);
        let block: BlockInfo = self
            .client
            .get(&url)
            .query(&[("blockhash", blockhash.trim())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(block.merkleroot)
    }

    async fn self_identity(&self) -> Result<String, SnapshotError> {
        let url = format!("{}/nodeid", self.base);
        let ids: HashMap<String, serde_json::Value> = self
            .client
            .get(&url)
            .query(&[("method", "list")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        // Lexicographically first registered identity; the RPC map carries
        // no order of its own.
        ids.into_keys()
            .min()
            .ok_or_else(|| SnapshotError::Unavailable("node has no registered identity".into()))
    }

    async fn peer_rows(&self) -> Result<HashMap<String, String>, SnapshotError> {
        let url = format!("{}/peerlist", self.base);
        Ok(self
            .client
            .get(&url)
            .query(&[("mode", "full")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[async_trait]
impl SnapshotSource for RpcSnapshotProvider {
    async fn snapshot(&self) -> Result<Snapshot, SnapshotError> {
        let fingerprint = self.best_block_merkle_root().await?;
        let self_identity = self.self_identity().await?;
        let peers = parse_peer_rows(self.peer_rows().await?);
        Ok(Snapshot { fingerprint, self_identity, peers })
    }
}

/// Fold full-mode peer rows into records. Row format is whitespace-separated
/// with the lifecycle status first and the advertised `host:port` last;
/// malformed rows are dropped rather than failing the snapshot.
pub fn parse_peer_rows(rows: HashMap<String, String>) -> HashMap<String, PeerRecord> {
    rows.into_iter()
        .filter_map(|(identity, row)| {
            let mut fields = row.split_whitespace();
            let status = PeerStatus::parse(fields.next()?);
            let address = fields.last()?;
            Some((identity, PeerRecord { status, address: address.to_string() }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn full_mode_rows_parse() {
        let peers = parse_peer_rows(rows(&[
            ("nodeB", "ENABLED 70015 payee 1717171717 86400 10.0.0.2:9933"),
            ("nodeC", "EXPIRED 70015 payee 1717171717 86400 10.0.0.3:9933"),
        ]));
        assert_eq!(peers["nodeB"].status, PeerStatus::Enabled);
        assert_eq!(peers["nodeB"].address, "10.0.0.2:9933");
        assert_eq!(peers["nodeC"].status, PeerStatus::Expired);
    }

    #[test]
    fn malformed_rows_dropped() {
        let peers = parse_peer_rows(rows(&[
            ("ok", "ENABLED 10.0.0.2:9933"),
            ("empty", ""),
            ("blank", "   "),
        ]));
        assert_eq!(peers.len(), 1);
        assert!(peers.contains_key("ok"));
    }

    #[test]
    fn unknown_status_kept_but_ineligible() {
        let peers = parse_peer_rows(rows(&[("odd", "WATCHDOG_EXPIRED 10.0.0.9:9933")]));
        assert_eq!(peers["odd"].status, PeerStatus::Unknown);
        assert!(!peers["odd"].status.is_eligible());
    }
}
