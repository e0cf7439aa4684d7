//! Recency-ordered replacement (LRU and MRU).

use std::collections::{HashMap, HashSet};

use crate::common::FrameId;

use super::{ReplacementPolicy, Replacer};

/// Orders frames by the logical time of their last fix.
///
/// LRU evicts the evictable frame with the oldest stamp, MRU the one with
/// the newest. Pinned frames are never chosen.
pub struct RecencyReplacer {
    policy: ReplacementPolicy,

    /// Monotonic logical clock, bumped on every access.
    clock: u64,

    /// Stamp of the most recent access per frame.
    last_access: HashMap<FrameId, u64>,

    /// Frames that are currently evictable (pin_count == 0).
    evictable: HashSet<FrameId>,
}

impl RecencyReplacer {
    pub fn new(policy: ReplacementPolicy) -> Self {
        Self {
            policy,
            clock: 0,
            last_access: HashMap::new(),
            evictable: HashSet::new(),
        }
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    fn stamp(&self, frame_id: &FrameId) -> u64 {
        self.last_access.get(frame_id).copied().unwrap_or(0)
    }
}

impl Replacer for RecencyReplacer {
    fn record_access(&mut self, frame_id: FrameId) {
        self.clock += 1;
        self.last_access.insert(frame_id, self.clock);
    }

    fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    fn evict(&mut self) -> Option<FrameId> {
        let candidates = self.evictable.iter().map(|fid| (self.stamp(fid), *fid));
        let victim = match self.policy {
            ReplacementPolicy::Lru => candidates.min_by_key(|(stamp, _)| *stamp),
            ReplacementPolicy::Mru => candidates.max_by_key(|(stamp, _)| *stamp),
        }
        .map(|(_, fid)| fid)?;

        self.evictable.remove(&victim);
        self.last_access.remove(&victim);
        Some(victim)
    }

    fn size(&self) -> usize {
        self.evictable.len()
    }
}
