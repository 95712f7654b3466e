//! Heap File
//!
//! Records appended in arrival order, with no hashing and no directory.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Block 0: Header (kind = heap, zero buckets)             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Block 1..: Data blocks                                  │
//! │   [record][record]...[record]  ...free...  [trailer]    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Data blocks are linked through their trailers in allocation order, so
//! the whole file is one chain rooted at block 1 and lookups reuse the
//! bucket chain scanner. Inserts only touch the last block.

use std::sync::Arc;

use crate::block::{BlockId, BlockManager, FileId};
use crate::bucket::{BlockTrailer, BucketEntry, FileHeader, FileKind, Matches, HEADER_BLOCK};
use crate::error::{HashStoreError, Result};
use crate::hash_table::Lookup;
use crate::record::Record;

/// First block holding records
pub const FIRST_HEAP_BLOCK: BlockId = 1;

/// Records per heap block
const CAPACITY: usize = <Record as BucketEntry>::MAX_PER_BLOCK;

/// An open heap file
pub struct HeapFile {
    store: Arc<BlockManager>,
    file: FileId,
    header: FileHeader,
    closed: bool,
}

impl HeapFile {
    /// Create an empty heap file holding only its header block
    pub fn create(store: &Arc<BlockManager>, name: &str) -> Result<()> {
        let header = FileHeader {
            kind: FileKind::Heap,
            bucket_count: 0,
            file_name: name.to_string(),
            primary_file: None,
        };
        header.encode_into(&mut vec![0u8; crate::block::BLOCK_SIZE])?;

        store.create_file(name)?;
        let fd = store.open_file(name)?;
        let formatted = Self::format(store, fd, &header);
        let closed = store.close_file(fd);
        formatted?;
        closed?;

        tracing::info!(file = name, kind = %FileKind::Heap, "created heap file");
        Ok(())
    }

    fn format(store: &BlockManager, fd: FileId, header: &FileHeader) -> Result<()> {
        let block = store.allocate_block(fd)?;
        debug_assert_eq!(block.index(), HEADER_BLOCK);
        let mut data = block.write();
        header.encode_into(&mut data)?;
        BlockTrailer::new(HEADER_BLOCK).write(&mut data);
        Ok(())
    }

    /// Open a heap file
    ///
    /// A hash file or index yields `WrongFileKind` and is closed again.
    pub fn open(store: &Arc<BlockManager>, name: &str) -> Result<Self> {
        let fd = store.open_file(name)?;

        let header = match Self::read_header(store, fd) {
            Ok(header) => header,
            Err(e) => {
                let _ = store.close_file(fd);
                return Err(e);
            }
        };

        tracing::info!(file = name, kind = %header.kind, "opened heap file");

        Ok(Self {
            store: Arc::clone(store),
            file: fd,
            header,
            closed: false,
        })
    }

    fn read_header(store: &BlockManager, fd: FileId) -> Result<FileHeader> {
        if store.block_count(fd)? == 0 {
            return Err(HashStoreError::InvalidHeader("file has no header block".to_string()));
        }

        let header = {
            let block = store.get_block(fd, HEADER_BLOCK)?;
            let data = block.read();
            FileHeader::decode_from(&data)?
        };

        if header.kind != FileKind::Heap {
            return Err(HashStoreError::WrongFileKind {
                expected: FileKind::Heap,
                found: header.kind,
            });
        }
        Ok(header)
    }

    /// Close the file
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        tracing::info!(file = %self.header.file_name, "closed heap file");
        self.store.close_file(self.file)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Append a record to the last block; returns the block it landed in
    pub fn insert(&mut self, record: &Record) -> Result<BlockId> {
        let mut encoded = vec![0u8; Record::SIZE];
        record.encode_into(&mut encoded)?;

        let last = self.last_data_block()?;
        if let Some(last) = last {
            let block = self.store.get_block(self.file, last)?;
            let trailer = BlockTrailer::read(&block.read(), last)?;
            let count = trailer.record_count as usize;

            if count > CAPACITY {
                return Err(HashStoreError::CorruptBlock {
                    block: last,
                    reason: format!("record count {} exceeds capacity {}", count, CAPACITY),
                });
            }
            if count < CAPACITY {
                let mut data = block.write();
                let offset = count * Record::SIZE;
                data[offset..offset + Record::SIZE].copy_from_slice(&encoded);
                BlockTrailer {
                    record_count: trailer.record_count + 1,
                    ..trailer
                }
                .write(&mut data);
                tracing::trace!(id = record.id, block = last, "inserted record");
                return Ok(last);
            }
        }

        let fresh = self.allocate_block(&encoded)?;
        if let Some(last) = last {
            self.link(last, fresh)?;
        }
        tracing::debug!(file = %self.header.file_name, id = record.id, block = fresh, "heap grown");
        Ok(fresh)
    }

    /// Lazily yield every record with `id == *key`, in block order
    pub fn entries<'a>(&'a self, key: &'a i32) -> Result<Matches<'a, Record>> {
        let count = self.block_count()?;
        let head = (count > FIRST_HEAP_BLOCK).then_some(FIRST_HEAP_BLOCK);
        Ok(Matches::new(&self.store, self.file, key, head, count))
    }

    /// Collect every record with `id == key` by scanning all data blocks
    ///
    /// `blocks_read` is the index of the first block holding a match.
    /// Returns `None` if no record has the id.
    pub fn get_all_entries(&self, key: i32) -> Result<Option<Lookup>> {
        let mut scan = self.entries(&key)?;
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

    /// Decode every record of one data block
    pub fn read_block(&self, id: BlockId) -> Result<Vec<Record>> {
        if id < FIRST_HEAP_BLOCK {
            return Err(HashStoreError::CorruptBlock {
                block: id,
                reason: "not a data block".to_string(),
            });
        }
        let (_, records) = crate::bucket::read_data_block::<Record>(&self.store, self.file, id)?;
        Ok(records)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn file_name(&self) -> &str {
        &self.header.file_name
    }

    /// Total blocks in the file, header included
    pub fn block_count(&self) -> Result<u32> {
        self.store.block_count(self.file)
    }

    /// Records that fit in one data block
    pub fn capacity_per_block(&self) -> usize {
        CAPACITY
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn last_data_block(&self) -> Result<Option<BlockId>> {
        let count = self.block_count()?;
        Ok((count > FIRST_HEAP_BLOCK).then(|| count - 1))
    }

    fn allocate_block(&self, first: &[u8]) -> Result<BlockId> {
        let block = self.store.allocate_block(self.file)?;
        let id = block.index();
        let mut data = block.write();
        data[..first.len()].copy_from_slice(first);
        BlockTrailer {
            record_count: 1,
            ..BlockTrailer::new(id)
        }
        .write(&mut data);
        Ok(id)
    }

    fn link(&self, last: BlockId, next: BlockId) -> Result<()> {
        let block = self.store.get_block(self.file, last)?;
        let mut data = block.write();
        let mut trailer = BlockTrailer::read(&data, last)?;
        trailer.next = Some(next);
        trailer.write(&mut data);
        Ok(())
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store.close_file(self.file) {
            tracing::warn!(file = %self.header.file_name, "failed to close heap file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_blocks_are_chained_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder().data_dir(temp_dir.path()).build();
        let store = Arc::new(BlockManager::new(config).unwrap());
        HeapFile::create(&store, "heap.db").unwrap();
        let mut heap = HeapFile::open(&store, "heap.db").unwrap();

        for id in 0..(3 * CAPACITY as i32) {
            heap.insert(&Record::new(id, "n", "s", "c").unwrap()).unwrap();
        }

        let chain: Vec<_> = crate::bucket::ChainIter::new(&store, heap.file, Some(FIRST_HEAP_BLOCK), 4)
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(chain.iter().map(|t| t.block_index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(chain[2].next, None);
        assert!(chain.iter().all(|t| t.record_count == CAPACITY as u64));
    }
}
