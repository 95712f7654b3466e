//! Secondary Hash Index
//!
//! Maps `name` to the primary blocks holding records with that name.
//!
//! ## Lookup
//! 1. Hash the name (djb2) and walk that bucket's index chain
//! 2. Collect the distinct primary blocks of matching entries, in order
//! 3. Read each primary block once and keep records whose name matches
//!
//! An index entry whose primary block holds no such record means the two
//! files disagree; that is reported as `IndexInconsistency`, never skipped.

use std::collections::HashSet;
use std::sync::Arc;

use crate::block::{BlockId, BlockManager};
use crate::bucket::{BucketEntry, BucketFile, FileKind, Matches, FIRST_DATA_BLOCK};
use crate::error::{HashStoreError, Result};
use crate::hash_table::HashTable;
use crate::record::{Record, SecondaryEntry};
use crate::stats::HashStatistics;

/// djb2 over the bytes of `s`, wrapping in u32
pub fn hash_string(s: &str) -> u32 {
    s.bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(u32::from(b)))
}

impl BucketEntry for SecondaryEntry {
    const SIZE: usize = SecondaryEntry::SIZE;
    const KIND: FileKind = FileKind::Secondary;

    type Key = str;

    fn key(&self) -> &str {
        &self.name
    }

    fn hash_key(key: &str) -> u32 {
        hash_string(key)
    }

    fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        SecondaryEntry::encode_into(self, dst)
    }

    fn decode_from(src: &[u8]) -> Result<Self> {
        SecondaryEntry::decode_from(src)
    }
}

/// Result of a secondary-key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryLookup {
    /// Matching primary records, grouped by primary block in index order
    pub matches: Vec<Record>,
    /// Distinct primary blocks read
    pub primary_blocks: Vec<BlockId>,
    /// Index chain blocks read
    pub blocks_read: usize,
}

/// An open secondary index over one primary hash file
pub struct SecondaryIndex {
    file: BucketFile<SecondaryEntry>,
    primary_file: String,
}

impl SecondaryIndex {
    /// Create an empty index bound to `primary_file`
    pub fn create(
        store: &Arc<BlockManager>,
        name: &str,
        buckets: u32,
        primary_file: &str,
    ) -> Result<()> {
        BucketFile::<SecondaryEntry>::create(store, name, buckets, Some(primary_file))
    }

    /// Open a secondary index
    pub fn open(store: &Arc<BlockManager>, name: &str) -> Result<Self> {
        let file = BucketFile::<SecondaryEntry>::open(store, name)?;
        let primary_file = file.header().primary_file.clone().ok_or_else(|| {
            HashStoreError::InvalidHeader(format!("index {} names no primary file", name))
        })?;
        Ok(Self { file, primary_file })
    }

    /// Close the index
    pub fn close(self) -> Result<()> {
        self.file.close()
    }

    /// Name of the primary file this index is bound to
    pub fn primary_file(&self) -> &str {
        &self.primary_file
    }

    /// Index a record that was stored in primary block `block_id`
    ///
    /// Returns the index block the entry landed in.
    pub fn insert(&mut self, record: &Record, block_id: BlockId) -> Result<BlockId> {
        let entry = SecondaryEntry::for_record(record, block_id)?;
        let block = self.file.insert(&entry)?;
        tracing::trace!(name = %entry.name, primary_block = block_id, block, "indexed record");
        Ok(block)
    }

    /// Lazily yield every index entry for `name`
    pub fn entries<'a>(&'a self, name: &'a str) -> Result<Matches<'a, SecondaryEntry>> {
        self.file.scan(name)
    }

    /// Find every primary record whose name is `name`
    ///
    /// Returns `None` if the index holds no entry for the name.
    pub fn get_all_entries(&self, primary: &HashTable, name: &str) -> Result<Option<SecondaryLookup>> {
        if primary.file_name() != self.primary_file {
            return Err(HashStoreError::IndexMismatch {
                expected: self.primary_file.clone(),
                found: primary.file_name().to_string(),
            });
        }

        let mut scan = self.file.scan(name)?;
        let mut seen = HashSet::new();
        let mut primary_blocks = Vec::new();

        for hit in scan.by_ref() {
            let block_id = hit?.entry.block_id;
            if seen.insert(block_id) {
                primary_blocks.push(block_id);
            }
        }
        let blocks_read = scan.blocks_read();

        if primary_blocks.is_empty() {
            return Ok(None);
        }

        let primary_count = primary.block_count()?;
        let mut matches = Vec::new();

        for &block_id in &primary_blocks {
            let inconsistent = || HashStoreError::IndexInconsistency {
                key: name.to_string(),
                block_id,
            };

            if block_id < FIRST_DATA_BLOCK || block_id >= primary_count {
                tracing::warn!(name, block_id, primary_count, "index points outside primary data blocks");
                return Err(inconsistent());
            }
            let records = primary.read_block(block_id)?;

            let before = matches.len();
            matches.extend(records.into_iter().filter(|r| r.name == name));
            if matches.len() == before {
                tracing::warn!(name, block_id, "primary block holds no record for index entry");
                return Err(inconsistent());
            }
        }

        Ok(Some(SecondaryLookup {
            matches,
            primary_blocks,
            blocks_read,
        }))
    }

    /// Load statistics of this index
    pub fn statistics(&self) -> Result<HashStatistics> {
        HashStatistics::collect(&self.file)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn bucket_file(&self) -> &BucketFile<SecondaryEntry> {
        &self.file
    }

    pub fn file_name(&self) -> &str {
        self.file.file_name()
    }

    pub fn bucket_count(&self) -> u32 {
        self.file.bucket_count()
    }

    pub fn block_count(&self) -> Result<u32> {
        self.file.block_count()
    }

    /// Bucket a name hashes to
    pub fn bucket_of(&self, name: &str) -> u32 {
        self.file.bucket_of(name)
    }

    /// Index entries that fit in one block
    pub fn capacity_per_block(&self) -> usize {
        self.file.capacity_per_block()
    }
}
