//! Arena configuration parameters.

use crate::error::ArenaError;

/// Configuration for the arena allocator.
///
/// Controls block sizing and the optional memory ceiling. Validated at
/// construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of the first block in bytes.
    ///
    /// Default: 4096. Must be a multiple of 16 and at least 64.
    pub initial_block_size: u32,

    /// Upper bound on the size of geometrically grown blocks.
    ///
    /// Each new block doubles the previous block's size until this cap.
    /// A single allocation larger than the cap still gets a dedicated
    /// block of exactly the size it needs. Default: 1MB.
    pub max_block_size: u32,

    /// Ceiling on total owned block memory in bytes, or `None` for no
    /// limit other than the host's.
    ///
    /// Exceeding the ceiling reports [`ArenaError::OutOfMemory`], which
    /// is how callers bound the memory an adversarial input can claim.
    pub max_bytes: Option<usize>,
}

impl ArenaConfig {
    /// Default first block size: 4KB.
    pub const DEFAULT_INITIAL_BLOCK_SIZE: u32 = 4096;

    /// Default block size cap: 1MB.
    pub const DEFAULT_MAX_BLOCK_SIZE: u32 = 1 << 20;

    /// Alignment every block base is rounded to.
    pub const BLOCK_ALIGN: u32 = 16;

    /// Create a config with default block sizes and the given ceiling.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.initial_block_size < 64 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "initial_block_size {} is below the minimum of 64",
                    self.initial_block_size
                ),
            });
        }
        if self.initial_block_size % Self::BLOCK_ALIGN != 0 {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "initial_block_size {} is not a multiple of {}",
                    self.initial_block_size,
                    Self::BLOCK_ALIGN
                ),
            });
        }
        if self.max_block_size < self.initial_block_size {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "max_block_size {} is smaller than initial_block_size {}",
                    self.max_block_size, self.initial_block_size
                ),
            });
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_block_size: Self::DEFAULT_INITIAL_BLOCK_SIZE,
            max_block_size: Self::DEFAULT_MAX_BLOCK_SIZE,
            max_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(ArenaConfig::default().validate().is_ok());
    }

    #[test]
    fn tiny_initial_block_rejected() {
        let config = ArenaConfig {
            initial_block_size: 32,
            ..ArenaConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn unaligned_initial_block_rejected() {
        let config = ArenaConfig {
            initial_block_size: 100,
            ..ArenaConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn cap_below_initial_rejected() {
        let config = ArenaConfig {
            initial_block_size: 4096,
            max_block_size: 1024,
            max_bytes: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn with_max_bytes_keeps_block_defaults() {
        let config = ArenaConfig::with_max_bytes(1 << 16);
        assert_eq!(config.max_bytes, Some(65536));
        assert_eq!(
            config.initial_block_size,
            ArenaConfig::DEFAULT_INITIAL_BLOCK_SIZE
        );
    }
}
