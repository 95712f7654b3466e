//! Primary Hash File
//!
//! Full records clustered by `id` into overflow-chained buckets.
//!
//! ## Responsibilities
//! - Create/open files whose header says "primary hash file"
//! - Insert records, reporting the block each one landed in
//! - Find every record with a given `id`
//! - Expose raw block reads for the secondary index

use std::fmt;
use std::sync::Arc;

use crate::block::{BlockId, BlockManager};
use crate::bucket::{BucketEntry, BucketFile, FileKind, Matches};
use crate::error::Result;
use crate::record::Record;
use crate::stats::HashStatistics;

impl BucketEntry for Record {
    const SIZE: usize = Record::SIZE;
    const KIND: FileKind = FileKind::Primary;

    type Key = i32;

    fn key(&self) -> &i32 {
        &self.id
    }

    /// Identity hash; negative ids wrap so the remainder stays unsigned
    fn hash_key(key: &i32) -> u32 {
        *key as u32
    }

    fn encode_into(&self, dst: &mut [u8]) -> Result<()> {
        Record::encode_into(self, dst)
    }

    fn decode_from(src: &[u8]) -> Result<Self> {
        Record::decode_from(src)
    }
}

/// Result of a primary-key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Every record with the key, in chain order
    pub matches: Vec<Record>,
    /// Blocks read up to and including the one holding the first match
    pub blocks_read: usize,
    /// Blocks read to walk the whole chain
    pub blocks_scanned: usize,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.matches {
            writeln!(f, "{}", record)?;
        }
        write!(f, "blocks read: {}", self.blocks_read)
    }
}

/// An open primary hash file
pub struct HashTable {
    file: BucketFile<Record>,
}

impl HashTable {
    /// Create an empty hash file with `buckets` buckets
    pub fn create(store: &Arc<BlockManager>, name: &str, buckets: u32) -> Result<()> {
        BucketFile::<Record>::create(store, name, buckets, None)
    }

    /// Open a primary hash file
    pub fn open(store: &Arc<BlockManager>, name: &str) -> Result<Self> {
        Ok(Self {
            file: BucketFile::open(store, name)?,
        })
    }

    /// Close the file
    pub fn close(self) -> Result<()> {
        self.file.close()
    }

    /// Insert a record; returns the block it was written to
    pub fn insert(&mut self, record: &Record) -> Result<BlockId> {
        let block = self.file.insert(record)?;
        tracing::trace!(id = record.id, block, "inserted record");
        Ok(block)
    }

    /// Lazily yield every record with `id == *key`
    pub fn entries<'a>(&'a self, key: &'a i32) -> Result<Matches<'a, Record>> {
        self.file.scan(key)
    }

    /// Collect every record with `id == key`
    ///
    /// Returns `None` if the file holds no such record.
    pub fn get_all_entries(&self, key: i32) -> Result<Option<Lookup>> {
        let mut scan = self.file.scan(&key)?;
        let mut matches = Vec::new();
        let mut first_at = None;

        for hit in scan.by_ref() {
            let hit = hit?;
            first_at.get_or_insert(hit.position);
            matches.push(hit.entry);
        }

        Ok(first_at.map(|blocks_read| Lookup {
            matches,
            blocks_read,
            blocks_scanned: scan.blocks_read(),
        }))
    }

    /// Decode every record stored in one data block
    pub fn read_block(&self, id: BlockId) -> Result<Vec<Record>> {
        self.file.read_block(id)
    }

    /// Load statistics of this file
    pub fn statistics(&self) -> Result<HashStatistics> {
        HashStatistics::collect(&self.file)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The underlying chained bucket file
    pub fn bucket_file(&self) -> &BucketFile<Record> {
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

    /// Bucket an id hashes to
    pub fn bucket_of(&self, id: i32) -> u32 {
        self.file.bucket_of(&id)
    }

    /// Records that fit in one data block
    pub fn capacity_per_block(&self) -> usize {
        self.file.capacity_per_block()
    }

    /// Head block of every bucket
    pub fn directory(&self) -> Result<Vec<Option<BlockId>>> {
        self.file.directory()
    }

    /// Block ids of a bucket's chain, head first
    pub fn chain_blocks(&self, bucket: u32) -> Result<Vec<BlockId>> {
        self.file.chain_blocks(bucket)
    }
}
