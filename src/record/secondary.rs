//! Secondary index entry
//!
//! ## Layout (20 bytes)
//! ```text
//! ┌───────────┬─────┬──────────────┐
//! │ name (15) │ pad │ block_id (4) │
//! │   0..15   │ 15  │   16..20     │
//! └───────────┴─────┴──────────────┘
//! ```
//! `block_id` is a little-endian i32 naming a block of the primary file.

use bytes::{Buf, BufMut};

use crate::block::BlockId;
use crate::error::{HashStoreError, Result};

use super::codec::{check_width, get_fixed_str, put_fixed_str};
use super::primary::{Record, NAME_WIDTH};

/// Compact `{name, primary block}` pair stored in the secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryEntry {
    pub name: String,
    pub block_id: BlockId,
}

impl SecondaryEntry {
    /// Encoded size in bytes
    pub const SIZE: usize = 20;

    pub fn new(name: impl Into<String>, block_id: BlockId) -> Result<Self> {
        let entry = Self {
            name: name.into(),
            block_id,
        };
        check_width("name", &entry.name, NAME_WIDTH)?;
        Ok(entry)
    }

    /// Index entry for a record that landed in `block_id`
    pub fn for_record(record: &Record, block_id: BlockId) -> Result<Self> {
        Self::new(record.name.clone(), block_id)
    }

    /// Encode into the first `SIZE` bytes of `dst`
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        let mut buf = dst.get_mut(..Self::SIZE).ok_or_else(|| {
            HashStoreError::Codec(format!(
                "index entry needs {} bytes, got {}",
                Self::SIZE,
                len
            ))
        })?;
        let block_id = i32::try_from(self.block_id).map_err(|_| {
            HashStoreError::Codec(format!("block id {} does not fit i32", self.block_id))
        })?;

        put_fixed_str(&mut buf, "name", &self.name, NAME_WIDTH)?;
        buf.put_u8(0);
        buf.put_i32_le(block_id);
        Ok(())
    }

    /// Decode from the first `SIZE` bytes of `src`
    pub fn decode_from(src: &[u8]) -> Result<Self> {
        if src.len() < Self::SIZE {
            return Err(HashStoreError::Codec(format!(
                "index entry needs {} bytes, got {}",
                Self::SIZE,
                src.len()
            )));
        }
        let mut buf = &src[..Self::SIZE];
        let name = get_fixed_str(&mut buf, "name", NAME_WIDTH)?;
        buf.advance(1);
        let raw = buf.get_i32_le();
        let block_id = BlockId::try_from(raw)
            .map_err(|_| HashStoreError::Codec(format!("negative block id {}", raw)))?;

        Ok(Self { name, block_id })
    }
}
