//! XOR distance metric over SHA-256 digests.
//!
//! Every cooperating node scores candidates as `digest(fingerprint) XOR
//! digest(identity)` and elects the numerically closest one, so the ordering
//! defined here is a cross-node contract: 256-bit magnitude, big-endian,
//! never truncated to a native word.

use std::fmt;

/// Fixed digest width: SHA-256.
pub const DIGEST_LEN: usize = 32;

/// A 256-bit XOR distance. Bytes are big-endian, so the derived
/// lexicographic ordering is exactly numeric ordering of the full-width
/// unsigned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance([u8; DIGEST_LEN]);

impl Distance {
    pub const ZERO: Distance = Distance([0u8; DIGEST_LEN]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Distance {
        Distance(bytes)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceError {
    /// Both inputs must be full SHA-256 digests of the same width.
    InvalidDigestLength { left: usize, right: usize },
}

impl fmt::Display for DistanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceError::InvalidDigestLength { left, right } => {
                write!(f, "invalid digest length: left={} right={} (expected {})", left, right, DIGEST_LEN)
            }
        }
    }
}

impl std::error::Error for DistanceError {}

/// XOR the two digests and return the result as a 256-bit magnitude.
/// Called once per peer per election tick; allocation-free.
pub fn xor_distance(a: &[u8], b: &[u8]) -> Result<Distance, DistanceError> {
    if a.len() != DIGEST_LEN || b.len() != DIGEST_LEN {
        return Err(DistanceError::InvalidDigestLength { left: a.len(), right: b.len() });
    }
    let mut out = [0u8; DIGEST_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = a[i] ^ b[i];
    }
    Ok(Distance(out))
}
