//! Coordinator election.
//!
//! Every node hashes the chain-tip fingerprint and every eligible identity
//! with SHA-256, scores each candidate by XOR distance to the fingerprint
//! digest and elects the closest one. The computation is pure: any two nodes
//! holding the same snapshot converge on the same coordinator with no voting
//! round. Ties fall to the lexicographically smaller identity so the result
//! never depends on map iteration order.

use crate::distance::{self, Distance, DistanceError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Sentinel winner address: this node itself won, connect over loopback.
pub const SELF_ADDRESS: &str = "localhost";

/// Peer lifecycle status as advertised by the chain's peer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerStatus {
    Enabled,
    PreEnabled,
    Expired,
    NewStartRequired,
    Banned,
    Unknown,
}

impl PeerStatus {
    /// Only fully enabled peers may be elected coordinator.
    pub fn is_eligible(&self) -> bool {
        matches!(self, PeerStatus::Enabled)
    }

    /// Parse the status token of a peer-list row. Unrecognized tokens map to
    /// `Unknown` (ineligible) rather than poisoning the whole snapshot.
    pub fn parse(token: &str) -> PeerStatus {
        match token {
            "ENABLED" => PeerStatus::Enabled,
            "PRE_ENABLED" => PeerStatus::PreEnabled,
            "EXPIRED" => PeerStatus::Expired,
            "NEW_START_REQUIRED" => PeerStatus::NewStartRequired,
            "BANNED" => PeerStatus::Banned,
            _ => PeerStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub status: PeerStatus,
    /// Advertised `host:port`. Only the host matters for election; the
    /// coordinator service port is a fixed global constant.
    pub address: String,
}

/// One evaluation's immutable input: chain-tip fingerprint, our own
/// identity, and the peer set. Two snapshots with identical fields are
/// interchangeable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Hex fingerprint of the chain tip (merkle root of the best block).
    pub fingerprint: String,
    pub self_identity: String,
    pub peers: HashMap<String, PeerRecord>,
}

/// Election result: where to connect and who won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Election {
    /// Host to connect to (advertised port stripped), or [`SELF_ADDRESS`].
    pub address: String,
    pub identity: String,
    pub distance: Distance,
}

#[derive(Debug)]
pub enum ElectionError {
    /// Malformed fingerprint or missing self identity. Not retried.
    InvalidSnapshot(String),
    Distance(DistanceError),
}

impl fmt::Display for ElectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionError::InvalidSnapshot(reason) => write!(f, "invalid snapshot: {}", reason),
            ElectionError::Distance(e) => write!(f, "distance: {}", e),
        }
    }
}

impl std::error::Error for ElectionError {}

impl From<DistanceError> for ElectionError {
    fn from(e: DistanceError) -> Self {
        ElectionError::Distance(e)
    }
}

fn digest(data: &str) -> [u8; 32] {
    Sha256::digest(data.as_bytes()).into()
}

/// Host portion of an advertised `host:port` address.
fn host_of(address: &str) -> &str {
    address.split(':').next().unwrap_or("")
}

/// True when the candidate beats the current best: strictly smaller
/// distance, or an exact tie broken by the smaller identity.
fn improves(d: Distance, identity: &str, best_d: Distance, best_identity: &str) -> bool {
    d < best_d || (d == best_d && identity < best_identity)
}

/// Elect the coordinator for `snapshot`.
///
/// Pure and deterministic: the fingerprint digest is re-derived on every
/// call (the tip rotates between evaluations, caching it would be a bug) and
/// the winner is independent of peer iteration order. An empty or fully
/// ineligible peer set is not an error; self wins trivially.
pub fn select(snapshot: &Snapshot) -> Result<Election, ElectionError> {
    if snapshot.fingerprint.is_empty()
        || !snapshot.fingerprint.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(ElectionError::InvalidSnapshot(format!(
            "fingerprint is not hex: '{}'",
            snapshot.fingerprint
        )));
    }
    if snapshot.self_identity.is_empty() {
        return Err(ElectionError::InvalidSnapshot("missing self identity".into()));
    }

    let fp = digest(&snapshot.fingerprint);
    let self_digest = digest(&snapshot.self_identity);
    let mut best = Election {
        address: SELF_ADDRESS.to_string(),
        identity: snapshot.self_identity.clone(),
        distance: distance::xor_distance(&fp, &self_digest)?,
    };

    for (identity, peer) in &snapshot.peers {
        if !peer.status.is_eligible() {
            continue;
        }
        let host = host_of(&peer.address);
        if host.is_empty() {
            // A peer that advertises no reachable host cannot coordinate.
            continue;
        }
        let d = distance::xor_distance(&fp, &digest(identity))?;
        if improves(d, identity, best.distance, &best.identity) {
            best = Election {
                address: host.to_string(),
                identity: identity.clone(),
                distance: d,
            };
        }
    }
    Ok(best)
}
