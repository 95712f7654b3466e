//! Block Store Module
//!
//! Fixed-size block files behind a bounded buffer pool.
//!
//! ## Responsibilities
//! - Create, open and close block files
//! - Allocate new blocks at end-of-file
//! - Pin blocks into memory frames, unpin on guard drop
//! - Track dirty frames and write them back on eviction/close
//! - Pick eviction victims through a pluggable `Replacer` (LRU/MRU)
//!
//! ## File Format
//! ```text
//! ┌─────────────┬─────────────┬─────────────┬─────
//! │  Block 0    │  Block 1    │  Block 2    │ ...
//! │ (512 bytes) │ (512 bytes) │ (512 bytes) │
//! └─────────────┴─────────────┴─────────────┴─────
//! ```
//! Block `n` lives at byte offset `n * BLOCK_SIZE`. The store attaches no
//! meaning to block contents.

mod manager;
mod replacer;

pub use manager::{BlockManager, FileId, PinnedBlock};
pub use replacer::{replacer_for, Candidate, LruReplacer, MruReplacer, Replacer};

/// Size of every block in bytes
pub const BLOCK_SIZE: usize = 512;

/// Index of a block inside its file
pub type BlockId = u32;
