//! Bucket directory (block 1)
//!
//! `bucket_count` little-endian i32 slots from offset 0, one per bucket.
//! `-1` marks a bucket without a data block.

use bytes::{Buf, BufMut};

use crate::block::BlockId;
use crate::error::{HashStoreError, Result};

use super::trailer::{decode_link, encode_link, TRAILER_OFFSET};

/// Block holding the directory
pub const DIRECTORY_BLOCK: BlockId = 1;

/// Bytes per directory slot
pub const SLOT_SIZE: usize = 4;

/// Most buckets that fit in one directory block
pub const MAX_BUCKETS: u32 = (TRAILER_OFFSET / SLOT_SIZE) as u32;

/// Fill the first `bucket_count` slots with the empty sentinel
pub(crate) fn init(block: &mut [u8], bucket_count: u32) {
    let mut buf = &mut block[..bucket_count as usize * SLOT_SIZE];
    for _ in 0..bucket_count {
        buf.put_i32_le(encode_link(None));
    }
}

/// Read one slot
pub(crate) fn read_slot(block: &[u8], bucket: u32) -> Result<Option<BlockId>> {
    let offset = bucket as usize * SLOT_SIZE;
    let raw = (&block[offset..offset + SLOT_SIZE]).get_i32_le();
    decode_link(raw).map_err(|reason| HashStoreError::CorruptBlock {
        block: DIRECTORY_BLOCK,
        reason: format!("bucket {}: {}", bucket, reason),
    })
}

/// Overwrite one slot
pub(crate) fn write_slot(block: &mut [u8], bucket: u32, head: Option<BlockId>) {
    let offset = bucket as usize * SLOT_SIZE;
    (&mut block[offset..offset + SLOT_SIZE]).put_i32_le(encode_link(head));
}

/// Read every slot
pub(crate) fn read_all(block: &[u8], bucket_count: u32) -> Result<Vec<Option<BlockId>>> {
    (0..bucket_count).map(|b| read_slot(block, b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;

    #[test]
    fn test_max_buckets() {
        assert_eq!(MAX_BUCKETS, 124);
    }

    #[test]
    fn test_init_and_update() {
        let mut block = vec![0u8; BLOCK_SIZE];
        init(&mut block, 10);
        assert_eq!(read_all(&block, 10).unwrap(), vec![None; 10]);

        write_slot(&mut block, 3, Some(7));
        assert_eq!(&block[12..16], &7i32.to_le_bytes());
        assert_eq!(read_slot(&block, 3).unwrap(), Some(7));
        assert_eq!(read_slot(&block, 4).unwrap(), None);
    }
}
