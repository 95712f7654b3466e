//! Block trailer
//!
//! ## Layout (last 16 bytes of every block)
//! ```text
//! ┌──────────────────┬────────────┬────────────────────┐
//! │ block_index (4)  │ next (4)   │ record_count (8)   │
//! │    496..500      │  500..504  │     504..512       │
//! └──────────────────┴────────────┴────────────────────┘
//! ```
//! `block_index` and `next` are little-endian i32, `next = -1` ends a chain.
//! `record_count` is a little-endian u64.

use bytes::{Buf, BufMut};

use crate::block::{BlockId, BLOCK_SIZE};
use crate::error::{HashStoreError, Result};

/// Trailer size in bytes
pub const TRAILER_SIZE: usize = 16;

/// Offset of the trailer inside a block
pub const TRAILER_OFFSET: usize = BLOCK_SIZE - TRAILER_SIZE;

/// On-disk value of an absent block link
pub const NO_BLOCK: i32 = -1;

/// Metadata footer of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTrailer {
    pub block_index: BlockId,
    pub next: Option<BlockId>,
    pub record_count: u64,
}

impl BlockTrailer {
    /// Trailer of a fresh block: no successor, no entries
    pub fn new(block_index: BlockId) -> Self {
        Self {
            block_index,
            next: None,
            record_count: 0,
        }
    }

    /// Read the trailer of `block`, which is expected to be block `index`
    pub fn read(block: &[u8], index: BlockId) -> Result<Self> {
        let mut buf = &block[TRAILER_OFFSET..BLOCK_SIZE];
        let raw_index = buf.get_i32_le();
        let raw_next = buf.get_i32_le();
        let record_count = buf.get_u64_le();

        if raw_index != index as i32 {
            return Err(HashStoreError::CorruptBlock {
                block: index,
                reason: format!("trailer names block {}", raw_index),
            });
        }

        Ok(Self {
            block_index: index,
            next: decode_link(raw_next).map_err(|reason| HashStoreError::CorruptBlock {
                block: index,
                reason,
            })?,
            record_count,
        })
    }

    /// Write this trailer into the tail of `block`
    pub fn write(&self, block: &mut [u8]) {
        let mut buf = &mut block[TRAILER_OFFSET..BLOCK_SIZE];
        buf.put_i32_le(self.block_index as i32);
        buf.put_i32_le(encode_link(self.next));
        buf.put_u64_le(self.record_count);
    }
}

/// Encode an optional block id, `None` becomes `-1`
pub(crate) fn encode_link(link: Option<BlockId>) -> i32 {
    link.map_or(NO_BLOCK, |id| id as i32)
}

/// Decode an on-disk block link
pub(crate) fn decode_link(raw: i32) -> std::result::Result<Option<BlockId>, String> {
    match raw {
        NO_BLOCK => Ok(None),
        id if id >= 0 => Ok(Some(id as BlockId)),
        other => Err(format!("invalid block link {}", other)),
    }
}
