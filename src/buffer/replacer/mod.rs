//! Eviction policy implementations (replacers).
//!
//! The policy is picked per buffer pool through [`ReplacementPolicy`]:
//! - [`ReplacementPolicy::Lru`] - evict the least recently fixed frame
//! - [`ReplacementPolicy::Mru`] - evict the most recently fixed frame
//!
//! MRU wins on repeated sequential sweeps larger than the pool (full index
//! scans); LRU is the better default for point lookups and inserts.

mod recency;

pub use recency::RecencyReplacer;

use crate::common::FrameId;

/// Victim selection strategy for a buffer pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    /// Least recently used.
    #[default]
    Lru,
    /// Most recently used.
    Mru,
}

/// Interface every eviction policy implements.
///
/// The buffer pool wraps the replacer in a mutex, so methods take `&mut self`.
pub trait Replacer: Send {
    /// Record that a frame was fixed.
    fn record_access(&mut self, frame_id: FrameId);

    /// Mark a frame as evictable (pin_count dropped to 0) or not.
    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool);

    /// Select and forget a victim frame, or None if all frames are pinned.
    fn evict(&mut self) -> Option<FrameId>;

    /// Number of evictable frames.
    fn size(&self) -> usize;
}

/// Build the replacer for a policy.
pub fn new_replacer(policy: ReplacementPolicy) -> Box<dyn Replacer> {
    Box::new(RecencyReplacer::new(policy))
}
