//! Configuration for amindex.
//!
//! Compile-time constants fix the on-disk format; [`IndexConfig`] carries the
//! runtime knobs chosen when an index is opened.

use crate::buffer::replacer::ReplacementPolicy;
use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// # Memory Layout
/// With 4KB pages and 32-bit PageIds:
/// - Max pages: 2^32 - 1 (u32::MAX is the null page)
/// - Page-relative offsets always fit in a u16
///
/// # Alignment
/// Pages are aligned to 4096 bytes for efficient Direct I/O (O_DIRECT).
pub const PAGE_SIZE: usize = 4096;

/// Largest attribute length accepted for fixed-length character keys.
pub const MAX_ATTR_LENGTH: usize = 255;

/// Default number of frames in each index's buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 20;

/// Smallest usable pool: a split fixes two pages, plus one for the meta page.
pub const MIN_POOL_SIZE: usize = 3;

/// Default capacity of the scan table.
pub const DEFAULT_MAX_SCANS: usize = 20;

/// Runtime configuration for an [`IndexManager`](crate::index::IndexManager).
///
/// # Example
/// ```
/// use amindex::common::config::IndexConfig;
/// use amindex::buffer::replacer::ReplacementPolicy;
///
/// let config = IndexConfig::default()
///     .with_pool_size(8)
///     .with_replacement_policy(ReplacementPolicy::Mru);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Frames in the buffer pool of every opened index.
    pub pool_size: usize,
    /// Victim selection used by those buffer pools.
    pub replacement_policy: ReplacementPolicy,
    /// Capacity of the scan table.
    pub max_scans: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            replacement_policy: ReplacementPolicy::Lru,
            max_scans: DEFAULT_MAX_SCANS,
        }
    }
}

impl IndexConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_replacement_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.replacement_policy = policy;
        self
    }

    pub fn with_max_scans(mut self, max_scans: usize) -> Self {
        self.max_scans = max_scans;
        self
    }

    /// Check that the values can actually run an index.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if the pool is smaller than
    /// [`MIN_POOL_SIZE`] or the scan table has no slots.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size < MIN_POOL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "pool_size {} is below the minimum of {}",
                self.pool_size, MIN_POOL_SIZE
            )));
        }
        if self.max_scans == 0 {
            return Err(Error::InvalidConfig("max_scans must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_offsets_fit_in_u16() {
        assert!(PAGE_SIZE <= u16::MAX as usize);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = IndexConfig::default();
        assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(config.max_scans, DEFAULT_MAX_SCANS);
        assert_eq!(config.replacement_policy, ReplacementPolicy::Lru);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_tiny_pool() {
        let config = IndexConfig::default().with_pool_size(2);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_empty_scan_table() {
        let config = IndexConfig::default().with_max_scans(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
