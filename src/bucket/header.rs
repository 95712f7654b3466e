//! File header (block 0)
//!
//! ## Layout
//! ```text
//! ┌───────────┬─────────────┬─────────────────┬───────────┬────────────────┐
//! │ Magic (4) │ Version (2) │ PayloadLen (2)  │ CRC32 (4) │ Payload ...    │
//! │   0..4    │    4..6     │      6..8       │   8..12   │ 12..           │
//! └───────────┴─────────────┴─────────────────┴───────────┴────────────────┘
//! ```
//! The payload is a bincode-encoded `FileHeader`; the CRC covers the
//! payload only. The block trailer occupies the last 16 bytes as usual.

use std::fmt;

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{HashStoreError, Result};

use super::trailer::TRAILER_OFFSET;

/// Magic bytes identifying a hashstore file
pub(crate) const MAGIC: &[u8; 4] = b"HSHF";

/// Current header format version
pub(crate) const VERSION: u16 = 1;

/// Magic (4) + Version (2) + PayloadLen (2) + CRC32 (4) = 12 bytes
pub(crate) const PREFIX_SIZE: usize = 12;

/// Largest payload that fits before the trailer
pub(crate) const MAX_PAYLOAD: usize = TRAILER_OFFSET - PREFIX_SIZE;

/// Which kind of record file a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Primary hash file of full records
    Primary,
    /// Secondary index of `{name, block}` entries
    Secondary,
    /// Unordered heap of records, no directory
    Heap,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Primary => f.write_str("primary hash file"),
            FileKind::Secondary => f.write_str("secondary hash index"),
            FileKind::Heap => f.write_str("heap file"),
        }
    }
}

/// Metadata persisted in block 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub kind: FileKind,
    /// Fixed at creation
    pub bucket_count: u32,
    /// Name the file was created under
    pub file_name: String,
    /// Primary file a secondary index is bound to
    pub primary_file: Option<String>,
}

impl FileHeader {
    /// Write magic, version, checksum and payload at the front of `block`
    pub fn encode_into(&self, block: &mut [u8]) -> Result<()> {
        let payload = bincode::serialize(self)
            .map_err(|e| HashStoreError::InvalidHeader(format!("encode failed: {}", e)))?;

        if payload.len() > MAX_PAYLOAD {
            return Err(HashStoreError::InvalidHeader(format!(
                "header payload is {} bytes, at most {} fit in block 0",
                payload.len(),
                MAX_PAYLOAD
            )));
        }

        let crc = crc32fast::hash(&payload);
        let mut buf = &mut block[..PREFIX_SIZE + payload.len()];
        buf.put_slice(MAGIC);
        buf.put_u16_le(VERSION);
        buf.put_u16_le(payload.len() as u16);
        buf.put_u32_le(crc);
        buf.put_slice(&payload);
        Ok(())
    }

    /// Validate and decode the header at the front of `block`
    pub fn decode_from(block: &[u8]) -> Result<Self> {
        if block.len() < TRAILER_OFFSET {
            return Err(HashStoreError::InvalidHeader(format!(
                "block 0 is only {} bytes",
                block.len()
            )));
        }

        let mut buf = &block[..PREFIX_SIZE];
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(HashStoreError::InvalidHeader(format!(
                "bad magic {:?}, expected {:?}",
                magic, MAGIC
            )));
        }

        let version = buf.get_u16_le();
        if version != VERSION {
            return Err(HashStoreError::InvalidHeader(format!(
                "unsupported version {}",
                version
            )));
        }

        let len = buf.get_u16_le() as usize;
        let crc = buf.get_u32_le();
        if len > MAX_PAYLOAD {
            return Err(HashStoreError::InvalidHeader(format!(
                "payload length {} exceeds {}",
                len, MAX_PAYLOAD
            )));
        }

        let payload = &block[PREFIX_SIZE..PREFIX_SIZE + len];
        if crc32fast::hash(payload) != crc {
            return Err(HashStoreError::InvalidHeader(
                "header checksum mismatch".to_string(),
            ));
        }

        bincode::deserialize(payload)
            .map_err(|e| HashStoreError::InvalidHeader(format!("decode failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;

    fn header() -> FileHeader {
        FileHeader {
            kind: FileKind::Secondary,
            bucket_count: 10,
            file_name: "index.db".to_string(),
            primary_file: Some("data.db".to_string()),
        }
    }

    #[test]
    fn test_header_prefix() {
        let mut block = vec![0u8; BLOCK_SIZE];
        header().encode_into(&mut block).unwrap();
        assert_eq!(&block[0..4], MAGIC);
        assert_eq!(&block[4..6], &VERSION.to_le_bytes());
        assert_eq!(FileHeader::decode_from(&block).unwrap(), header());
    }

    #[test]
    fn test_checksum_detects_flip() {
        let mut block = vec![0u8; BLOCK_SIZE];
        header().encode_into(&mut block).unwrap();
        block[PREFIX_SIZE + 2] ^= 0xff;
        assert!(matches!(
            FileHeader::decode_from(&block),
            Err(HashStoreError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_zeroed_block_rejected() {
        let block = vec![0u8; BLOCK_SIZE];
        assert!(matches!(
            FileHeader::decode_from(&block),
            Err(HashStoreError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_oversized_name_rejected() {
        let mut block = vec![0u8; BLOCK_SIZE];
        let mut big = header();
        big.file_name = "x".repeat(600);
        assert!(big.encode_into(&mut block).is_err());
    }
}
