//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use crate::handle::RegionId;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The allocation would push owned memory past the configured
    /// ceiling, or past what a single region can address.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// The ceiling that would be exceeded.
        limit: usize,
    },
    /// A pointer into a region this arena used to own but has since
    /// released (via [`Arena::reset`](crate::Arena::reset)).
    StaleHandle {
        /// The region the pointer names.
        region: RegionId,
    },
    /// A pointer into a region owned by a different arena that has not
    /// been fused into this one.
    ForeignHandle {
        /// The region the pointer names.
        region: RegionId,
    },
    /// Attempted to write into a read-only (aliased input) region.
    ReadOnly {
        /// The read-only region.
        region: RegionId,
    },
    /// A pointer and length that fall outside the memory handed out by
    /// its region.
    OutOfBounds {
        /// The region the pointer names.
        region: RegionId,
        /// Address within the region.
        addr: u32,
        /// Requested length.
        len: usize,
    },
    /// Every region ID is held by a live region.
    RegionsExhausted,
    /// The arena configuration is invalid.
    InvalidConfig {
        /// Description of which invariant was violated.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested, limit } => {
                write!(
                    f,
                    "arena out of memory: requested {requested} bytes, limit {limit} bytes"
                )
            }
            Self::StaleHandle { region } => {
                write!(f, "stale handle into released region {region}")
            }
            Self::ForeignHandle { region } => {
                write!(f, "handle into region {region} owned by an unfused arena")
            }
            Self::ReadOnly { region } => write!(f, "region {region} is read-only"),
            Self::OutOfBounds { region, addr, len } => {
                write!(
                    f,
                    "range {addr}..+{len} is outside the allocated part of region {region}"
                )
            }
            Self::RegionsExhausted => f.write_str("no free region identifiers"),
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
