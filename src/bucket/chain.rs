//! Chain walking
//!
//! Both iterators pin one block at a time and unpin it before yielding, so
//! nothing stays pinned between `next()` calls. A chain longer than the
//! file's block count can only come from a cycle and is reported as a
//! corrupt block.

use std::collections::VecDeque;

use crate::block::{BlockId, BlockManager, FileId};
use crate::error::{HashStoreError, Result};

use super::trailer::BlockTrailer;
use super::BucketEntry;

/// Cursor shared by the chain iterators
struct Walk {
    next: Option<BlockId>,
    visited: u32,
    limit: u32,
}

impl Walk {
    fn new(head: Option<BlockId>, limit: u32) -> Self {
        Self {
            next: head,
            visited: 0,
            limit,
        }
    }

    fn advance(&mut self) -> Option<Result<BlockId>> {
        let current = self.next.take()?;
        self.visited += 1;
        if self.visited > self.limit {
            return Some(Err(HashStoreError::CorruptBlock {
                block: current,
                reason: "chain revisits a block".to_string(),
            }));
        }
        Some(Ok(current))
    }
}

/// Iterator over the trailers of one bucket's chain
pub struct ChainIter<'a> {
    store: &'a BlockManager,
    file: FileId,
    walk: Walk,
}

impl<'a> ChainIter<'a> {
    pub(crate) fn new(store: &'a BlockManager, file: FileId, head: Option<BlockId>, limit: u32) -> Self {
        Self {
            store,
            file,
            walk: Walk::new(head, limit),
        }
    }

    fn load(&mut self, id: BlockId) -> Result<BlockTrailer> {
        let block = self.store.get_block(self.file, id)?;
        let data = block.read();
        BlockTrailer::read(&data, id)
    }
}

impl Iterator for ChainIter<'_> {
    type Item = Result<BlockTrailer>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = match self.walk.advance()? {
            Ok(id) => id,
            Err(e) => return Some(Err(e)),
        };
        let result = self.load(id);
        if let Ok(trailer) = &result {
            self.walk.next = trailer.next;
        }
        Some(result)
    }
}

/// A matching entry found while scanning a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit<E> {
    /// Block holding the entry
    pub block_id: BlockId,
    /// 1-based position of that block in the chain
    pub position: usize,
    /// Slot of the entry inside the block
    pub slot: usize,
    pub entry: E,
}

/// Lazy iterator over every entry of a chain whose key matches
pub struct Matches<'a, E: BucketEntry> {
    store: &'a BlockManager,
    file: FileId,
    key: &'a E::Key,
    walk: Walk,
    pending: VecDeque<Hit<E>>,
    position: usize,
    failed: bool,
}

impl<'a, E: BucketEntry> Matches<'a, E> {
    pub(crate) fn new(
        store: &'a BlockManager,
        file: FileId,
        key: &'a E::Key,
        head: Option<BlockId>,
        limit: u32,
    ) -> Self {
        Self {
            store,
            file,
            key,
            walk: Walk::new(head, limit),
            pending: VecDeque::new(),
            position: 0,
            failed: false,
        }
    }

    /// Number of chain blocks read so far
    pub fn blocks_read(&self) -> usize {
        self.position
    }

    fn scan_block(&mut self, id: BlockId) -> Result<()> {
        let (trailer, entries) = super::read_data_block::<E>(self.store, self.file, id)?;
        self.walk.next = trailer.next;
        self.position += 1;

        for (slot, entry) in entries.into_iter().enumerate() {
            if entry.key() == self.key {
                self.pending.push_back(Hit {
                    block_id: id,
                    position: self.position,
                    slot,
                    entry,
                });
            }
        }
        Ok(())
    }
}

impl<E: BucketEntry> Iterator for Matches<'_, E> {
    type Item = Result<Hit<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.pending.pop_front() {
                return Some(Ok(hit));
            }
            if self.failed {
                return None;
            }

            let step = self
                .walk
                .advance()?
                .and_then(|id| self.scan_block(id));
            if let Err(e) = step {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}
