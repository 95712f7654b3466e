//! Bucket File
//!
//! Create/open/insert/scan over a chained hash file of `E` entries.
//!
//! ## Insert
//! 1. Hash the key to a bucket (unsigned remainder)
//! 2. Empty bucket: allocate a data block, point the directory slot at it
//! 3. Walk the chain to its tail
//! 4. Tail full: allocate a block holding the entry, then link it after the tail
//! 5. Otherwise append at `record_count` and bump the count
//!
//! Every step pins, mutates and unpins within the call, and no step holds
//! more than one frame, so a one-frame pool is enough.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::block::{BlockId, BlockManager, FileId};
use crate::error::{HashStoreError, Result};

use super::chain::{ChainIter, Matches};
use super::directory::{self, DIRECTORY_BLOCK, MAX_BUCKETS};
use super::header::FileHeader;
use super::trailer::BlockTrailer;
use super::{read_data_block, BucketEntry, FileKind};

/// Block holding the file header
pub const HEADER_BLOCK: BlockId = 0;

/// First block that can hold entries
pub const FIRST_DATA_BLOCK: BlockId = 2;

/// Load of one bucket's chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketLoad {
    /// Data blocks in the chain
    pub blocks: u32,
    /// Entries across all of them
    pub records: u64,
}

/// An open chained hash file of `E` entries
pub struct BucketFile<E: BucketEntry> {
    store: Arc<BlockManager>,
    file: FileId,
    header: FileHeader,
    closed: bool,
    _entry: PhantomData<fn() -> E>,
}

impl<E: BucketEntry> BucketFile<E> {
    /// Create and format a new file
    ///
    /// Writes the header to block 0 and a directory of empty buckets to
    /// block 1, then closes the file.
    pub fn create(
        store: &Arc<BlockManager>,
        name: &str,
        bucket_count: u32,
        primary_file: Option<&str>,
    ) -> Result<()> {
        if bucket_count == 0 || bucket_count > MAX_BUCKETS {
            return Err(HashStoreError::InvalidBucketCount {
                count: bucket_count,
                max: MAX_BUCKETS,
            });
        }

        let header = FileHeader {
            kind: E::KIND,
            bucket_count,
            file_name: name.to_string(),
            primary_file: primary_file.map(str::to_string),
        };

        // Reject an unencodable header before touching the disk
        header.encode_into(&mut vec![0u8; crate::block::BLOCK_SIZE])?;

        store.create_file(name)?;
        let fd = store.open_file(name)?;
        let formatted = Self::format(store, fd, &header);
        let closed = store.close_file(fd);
        formatted?;
        closed?;

        tracing::info!(file = name, kind = %E::KIND, buckets = bucket_count, "created hash file");
        Ok(())
    }

    fn format(store: &BlockManager, fd: FileId, header: &FileHeader) -> Result<()> {
        {
            let block = store.allocate_block(fd)?;
            debug_assert_eq!(block.index(), HEADER_BLOCK);
            let mut data = block.write();
            header.encode_into(&mut data)?;
            BlockTrailer::new(HEADER_BLOCK).write(&mut data);
        }
        {
            let block = store.allocate_block(fd)?;
            debug_assert_eq!(block.index(), DIRECTORY_BLOCK);
            let mut data = block.write();
            directory::init(&mut data, header.bucket_count);
            BlockTrailer::new(DIRECTORY_BLOCK).write(&mut data);
        }
        Ok(())
    }

    /// Open an existing file, checking it holds `E` entries
    ///
    /// A file of the other kind yields `WrongFileKind` and is closed again.
    pub fn open(store: &Arc<BlockManager>, name: &str) -> Result<Self> {
        let fd = store.open_file(name)?;

        let header = match Self::read_header(store, fd) {
            Ok(header) => header,
            Err(e) => {
                let _ = store.close_file(fd);
                return Err(e);
            }
        };

        tracing::info!(file = name, kind = %header.kind, buckets = header.bucket_count, "opened hash file");

        Ok(Self {
            store: Arc::clone(store),
            file: fd,
            header,
            closed: false,
            _entry: PhantomData,
        })
    }

    fn read_header(store: &BlockManager, fd: FileId) -> Result<FileHeader> {
        let count = store.block_count(fd)?;
        if count == 0 {
            return Err(HashStoreError::InvalidHeader("file has no header block".to_string()));
        }

        let header = {
            let block = store.get_block(fd, HEADER_BLOCK)?;
            let data = block.read();
            FileHeader::decode_from(&data)?
        };

        if header.kind != E::KIND {
            return Err(HashStoreError::WrongFileKind {
                expected: E::KIND,
                found: header.kind,
            });
        }
        if count < FIRST_DATA_BLOCK {
            return Err(HashStoreError::InvalidHeader(format!(
                "file has {} blocks, a hash file needs at least {}",
                count, FIRST_DATA_BLOCK
            )));
        }
        if header.bucket_count == 0 || header.bucket_count > MAX_BUCKETS {
            return Err(HashStoreError::InvalidBucketCount {
                count: header.bucket_count,
                max: MAX_BUCKETS,
            });
        }
        Ok(header)
    }

    /// Close the file
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        tracing::info!(file = %self.header.file_name, "closed hash file");
        self.store.close_file(self.file)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn kind(&self) -> FileKind {
        self.header.kind
    }

    pub fn bucket_count(&self) -> u32 {
        self.header.bucket_count
    }

    pub fn file_name(&self) -> &str {
        &self.header.file_name
    }

    pub fn file_id(&self) -> FileId {
        self.file
    }

    pub fn store(&self) -> &Arc<BlockManager> {
        &self.store
    }

    /// Total blocks in the file, header and directory included
    pub fn block_count(&self) -> Result<u32> {
        self.store.block_count(self.file)
    }

    /// Entries that fit in one data block
    pub fn capacity_per_block(&self) -> usize {
        E::MAX_PER_BLOCK
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Bucket a key hashes to
    pub fn bucket_of(&self, key: &E::Key) -> u32 {
        E::hash_key(key) % self.header.bucket_count
    }

    /// Head block of every bucket, `None` for empty buckets
    pub fn directory(&self) -> Result<Vec<Option<BlockId>>> {
        let block = self.store.get_block(self.file, DIRECTORY_BLOCK)?;
        let data = block.read();
        directory::read_all(&data, self.header.bucket_count)
    }

    /// Head block of one bucket
    pub fn head(&self, bucket: u32) -> Result<Option<BlockId>> {
        self.check_bucket(bucket)?;
        let block = self.store.get_block(self.file, DIRECTORY_BLOCK)?;
        let data = block.read();
        directory::read_slot(&data, bucket)
    }

    /// Trailers of a bucket's chain, head first
    pub fn chain(&self, bucket: u32) -> Result<ChainIter<'_>> {
        let head = self.head(bucket)?;
        Ok(ChainIter::new(&self.store, self.file, head, self.block_count()?))
    }

    /// Block ids of a bucket's chain, head first
    pub fn chain_blocks(&self, bucket: u32) -> Result<Vec<BlockId>> {
        self.chain(bucket)?
            .map(|t| t.map(|t| t.block_index))
            .collect()
    }

    /// Sum blocks and entries over a bucket's chain
    pub fn bucket_load(&self, bucket: u32) -> Result<BucketLoad> {
        self.load_chain(self.head(bucket)?)
    }

    /// Sum blocks and entries over the chain starting at `head`
    pub fn load_chain(&self, head: Option<BlockId>) -> Result<BucketLoad> {
        let mut load = BucketLoad::default();
        for trailer in ChainIter::new(&self.store, self.file, head, self.block_count()?) {
            let trailer = trailer?;
            load.blocks += 1;
            load.records += trailer.record_count;
        }
        Ok(load)
    }

    /// Decode every entry of one data block
    pub fn read_block(&self, id: BlockId) -> Result<Vec<E>> {
        if id < FIRST_DATA_BLOCK {
            return Err(HashStoreError::CorruptBlock {
                block: id,
                reason: "not a data block".to_string(),
            });
        }
        let (_, entries) = read_data_block::<E>(&self.store, self.file, id)?;
        Ok(entries)
    }

    /// Lazily yield every entry whose key equals `key`, in chain order
    pub fn scan<'a>(&'a self, key: &'a E::Key) -> Result<Matches<'a, E>> {
        let head = self.head(self.bucket_of(key))?;
        Ok(Matches::new(
            &self.store,
            self.file,
            key,
            head,
            self.block_count()?,
        ))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert an entry; returns the block it landed in
    pub fn insert(&mut self, entry: &E) -> Result<BlockId> {
        // Encode first so a bad entry leaves the file untouched
        let mut encoded = vec![0u8; E::SIZE];
        entry.encode_into(&mut encoded)?;

        let bucket = self.bucket_of(entry.key());
        let head = match self.head(bucket)? {
            Some(head) => head,
            None => {
                let head = self.allocate_data_block(None)?;
                self.set_head(bucket, head)?;
                tracing::debug!(file = %self.header.file_name, bucket, block = head, "bucket initialized");
                head
            }
        };

        let tail = self.chain_tail(head)?;

        let block = self.store.get_block(self.file, tail)?;
        let trailer = BlockTrailer::read(&block.read(), tail)?;
        let count = trailer.record_count as usize;

        if count > E::MAX_PER_BLOCK {
            return Err(HashStoreError::CorruptBlock {
                block: tail,
                reason: format!("record count {} exceeds capacity {}", count, E::MAX_PER_BLOCK),
            });
        }

        if count < E::MAX_PER_BLOCK {
            let mut data = block.write();
            let offset = count * E::SIZE;
            data[offset..offset + E::SIZE].copy_from_slice(&encoded);
            BlockTrailer {
                record_count: trailer.record_count + 1,
                ..trailer
            }
            .write(&mut data);
            return Ok(tail);
        }

        // Unpin the full tail so growing works with a single free frame
        drop(block);
        let fresh = self.allocate_data_block(Some(&encoded))?;
        self.link(tail, fresh)?;
        tracing::debug!(
            file = %self.header.file_name,
            bucket,
            tail,
            block = fresh,
            "chain extended"
        );
        Ok(fresh)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_bucket(&self, bucket: u32) -> Result<()> {
        if bucket >= self.header.bucket_count {
            return Err(HashStoreError::BucketOutOfRange {
                bucket,
                count: self.header.bucket_count,
            });
        }
        Ok(())
    }

    fn set_head(&self, bucket: u32, head: BlockId) -> Result<()> {
        let block = self.store.get_block(self.file, DIRECTORY_BLOCK)?;
        let mut data = block.write();
        directory::write_slot(&mut data, bucket, Some(head));
        Ok(())
    }

    /// Point the trailer of `tail` at `next`
    fn link(&self, tail: BlockId, next: BlockId) -> Result<()> {
        let block = self.store.get_block(self.file, tail)?;
        let mut data = block.write();
        let mut trailer = BlockTrailer::read(&data, tail)?;
        trailer.next = Some(next);
        trailer.write(&mut data);
        Ok(())
    }

    /// Allocate a data block, optionally seeded with one encoded entry
    fn allocate_data_block(&self, first: Option<&[u8]>) -> Result<BlockId> {
        let block = self.store.allocate_block(self.file)?;
        let id = block.index();
        let mut data = block.write();

        let mut trailer = BlockTrailer::new(id);
        if let Some(bytes) = first {
            data[..bytes.len()].copy_from_slice(bytes);
            trailer.record_count = 1;
        }
        trailer.write(&mut data);

        tracing::trace!(file = %self.header.file_name, block = id, "allocated data block");
        Ok(id)
    }

    fn chain_tail(&self, head: BlockId) -> Result<BlockId> {
        let mut tail = head;
        for trailer in ChainIter::new(&self.store, self.file, Some(head), self.block_count()?) {
            tail = trailer?.block_index;
        }
        Ok(tail)
    }
}

impl<E: BucketEntry> Drop for BucketFile<E> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store.close_file(self.file) {
            tracing::warn!(file = %self.header.file_name, "failed to close hash file: {}", e);
        }
    }
}
