//! Block types shared across the crate.
//!
//! - [`Digest`]: A 32-byte block identifier, displayed and parsed as lowercase hex.
//!
//! - [`BlockRef`]: The minimal view of a block needed to check linkage: its height, identifier,
//!   the identifier it claims as parent, and its timestamp. Generic over the identifier type so
//!   callers can pass whatever their block store uses.

use crate::Timestamp;
use meridian_utils::{from_hex, hex};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// Length of a [Digest] in bytes.
pub const DIGEST_LENGTH: usize = 32;

/// A 32-byte block identifier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LENGTH]);

impl Digest {
    /// Creates a digest from raw bytes.
    pub const fn new(bytes: [u8; DIGEST_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex(&self.0))
    }
}

/// Error returned when a string is not a hex-encoded [Digest].
#[derive(Debug, thiserror::Error)]
#[error("invalid digest: {0}")]
pub struct InvalidDigest(pub String);

impl FromStr for Digest {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s).ok_or_else(|| InvalidDigest(s.to_string()))?;
        let bytes: [u8; DIGEST_LENGTH] = bytes
            .try_into()
            .map_err(|_| InvalidDigest(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The fields of a block that determine whether it extends another.
///
/// Owned by the caller. Nothing in this crate mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef<D> {
    /// Height of the block.
    pub height: u64,

    /// Identifier of the block.
    pub id: D,

    /// Identifier of the parent block (`None` for genesis).
    pub previous_block: Option<D>,

    /// Time the block was forged.
    pub timestamp: Timestamp,
}
