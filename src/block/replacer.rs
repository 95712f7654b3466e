//! Buffer replacement strategies
//!
//! The pool asks its `Replacer` to pick a victim among the frames that are
//! currently unpinned. Strategies only see access ticks, never block data.

use crate::config::ReplacementPolicy;

/// An unpinned frame that may be evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Slot of the frame in the pool
    pub slot: usize,
    /// Logical clock value of the frame's most recent pin
    pub last_used: u64,
}

/// Strategy choosing which unpinned frame to evict
pub trait Replacer: Send + Sync {
    /// The policy this strategy implements
    fn policy(&self) -> ReplacementPolicy;

    /// Pick the slot to evict, or `None` if there are no candidates
    fn victim(&self, candidates: &[Candidate]) -> Option<usize>;
}

/// Least-recently-used: evict the frame pinned longest ago
#[derive(Debug, Default)]
pub struct LruReplacer;

impl Replacer for LruReplacer {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Lru
    }

    fn victim(&self, candidates: &[Candidate]) -> Option<usize> {
        candidates
            .iter()
            .min_by_key(|c| c.last_used)
            .map(|c| c.slot)
    }
}

/// Most-recently-used: evict the frame pinned most recently
#[derive(Debug, Default)]
pub struct MruReplacer;

impl Replacer for MruReplacer {
    fn policy(&self) -> ReplacementPolicy {
        ReplacementPolicy::Mru
    }

    fn victim(&self, candidates: &[Candidate]) -> Option<usize> {
        candidates
            .iter()
            .max_by_key(|c| c.last_used)
            .map(|c| c.slot)
    }
}

/// Build the strategy for a configured policy
pub fn replacer_for(policy: ReplacementPolicy) -> Box<dyn Replacer> {
    match policy {
        ReplacementPolicy::Lru => Box::new(LruReplacer),
        ReplacementPolicy::Mru => Box::new(MruReplacer),
    }
}
