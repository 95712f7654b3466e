//! Bucket File Module
//!
//! Generic chained hash file over fixed-size entries. The primary hash file
//! and the secondary index are two instantiations of `BucketFile`.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Block 0: Header                                         │
//! │   Magic | Version | Len | CRC | bincode(FileHeader)     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Block 1: Directory                                      │
//! │   [head: i32] × bucket_count     (-1 = empty bucket)    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Block 2..: Data blocks                                  │
//! │   [entry][entry]...[entry]  ...free...  [trailer]       │
//! │   trailer = block_index: i32 | next: i32 | count: u64   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each bucket's data blocks form a singly-linked chain rooted at its
//! directory slot. Blocks are only ever appended at the tail.

mod chain;
mod directory;
mod file;
mod header;
mod trailer;

pub use chain::{ChainIter, Hit, Matches};
pub use directory::{DIRECTORY_BLOCK, MAX_BUCKETS};
pub use file::{BucketFile, BucketLoad, FIRST_DATA_BLOCK, HEADER_BLOCK};
pub use header::{FileHeader, FileKind};
pub use trailer::{BlockTrailer, TRAILER_OFFSET, TRAILER_SIZE};

use crate::block::{BlockId, BlockManager, FileId, BLOCK_SIZE};
use crate::error::{HashStoreError, Result};

/// A fixed-size entry that can live in a bucket file
pub trait BucketEntry: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// File kind recorded in the header of files holding this entry
    const KIND: FileKind;

    /// Entries that fit in one data block next to the trailer
    const MAX_PER_BLOCK: usize = (BLOCK_SIZE - TRAILER_SIZE) / Self::SIZE;

    /// Lookup key
    type Key: ?Sized + PartialEq;

    /// Extract the key of this entry
    fn key(&self) -> &Self::Key;

    /// Hash a key; buckets are `hash % bucket_count`
    fn hash_key(key: &Self::Key) -> u32;

    /// Encode into exactly `SIZE` bytes at the front of `dst`
    fn encode_into(&self, dst: &mut [u8]) -> Result<()>;

    /// Decode from the front of `src`
    fn decode_from(src: &[u8]) -> Result<Self>;
}

/// Pin a data block and decode its trailer and packed entries
pub(crate) fn read_data_block<E: BucketEntry>(
    store: &BlockManager,
    file: FileId,
    id: BlockId,
) -> Result<(BlockTrailer, Vec<E>)> {
    let block = store.get_block(file, id)?;
    let data = block.read();
    let trailer = BlockTrailer::read(&data, id)?;

    let count = trailer.record_count as usize;
    if count > E::MAX_PER_BLOCK {
        return Err(HashStoreError::CorruptBlock {
            block: id,
            reason: format!(
                "record count {} exceeds capacity {}",
                count,
                E::MAX_PER_BLOCK
            ),
        });
    }

    let entries = data
        .chunks_exact(E::SIZE)
        .take(count)
        .map(E::decode_from)
        .collect::<Result<Vec<_>>>()?;

    Ok((trailer, entries))
}
