//! Block Manager
//!
//! Owns the open-file table and the buffer pool.
//!
//! ## Pinning
//! `allocate_block()` and `get_block()` return a `PinnedBlock` guard. The
//! frame stays resident while the guard lives; dropping it unpins the frame
//! and makes it an eviction candidate again.
//!
//! ## Concurrency:
//! - Pool bookkeeping (frames, page table, open files) sits behind one Mutex
//! - Frame bytes sit behind a per-frame RwLock
//! - All methods use `&self`

use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::error::{HashStoreError, Result};

use super::replacer::{replacer_for, Candidate, Replacer};
use super::{BlockId, BLOCK_SIZE};

/// Handle of an open block file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

impl FileId {
    /// Raw slot of the file in the open-file table
    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Bytes of one resident block
struct Frame {
    data: RwLock<Vec<u8>>,
    dirty: AtomicBool,
}

impl Frame {
    fn new() -> Self {
        Self {
            data: RwLock::new(vec![0u8; BLOCK_SIZE]),
            dirty: AtomicBool::new(false),
        }
    }
}

/// Pool bookkeeping for one frame
struct FrameSlot {
    frame: Arc<Frame>,
    /// Block currently held, `None` for a free slot
    page: Option<(FileId, BlockId)>,
    pins: usize,
    last_used: u64,
}

struct OpenFile {
    name: String,
    path: PathBuf,
    file: File,
    block_count: u32,
    /// How many callers opened this path and have not closed it yet
    handles: usize,
}

#[derive(Default)]
struct PoolState {
    slots: Vec<FrameSlot>,
    page_table: HashMap<(FileId, BlockId), usize>,
    files: Vec<Option<OpenFile>>,
    clock: u64,
}

impl PoolState {
    fn open_file_mut(&mut self, id: FileId) -> Result<&mut OpenFile> {
        self.files
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(HashStoreError::InvalidFile(id.0))
    }

    fn open_file(&self, id: FileId) -> Result<&OpenFile> {
        self.files
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(HashStoreError::InvalidFile(id.0))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Manages block files and the buffer pool
pub struct BlockManager {
    config: Config,
    replacer: Box<dyn Replacer>,
    state: Mutex<PoolState>,
}

impl BlockManager {
    /// Create a block store with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;

        tracing::debug!(
            capacity = config.buffer_capacity,
            policy = %config.replacement_policy,
            "block store initialized"
        );

        Ok(Self {
            replacer: replacer_for(config.replacement_policy),
            config,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create a new, empty block file
    ///
    /// Fails with `FileAlreadyExists` if the file is already there.
    pub fn create_file(&self, name: &str) -> Result<()> {
        let path = self.config.data_dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(HashStoreError::FileAlreadyExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open a block file
    ///
    /// Opening a path that is already open returns the same `FileId`, so
    /// every handle shares one set of cached frames.
    pub fn open_file(&self, name: &str) -> Result<FileId> {
        // Different spellings of one path must share a handle
        let path = std::fs::canonicalize(self.config.data_dir.join(name))?;
        let mut state = self.state.lock();

        let existing = state
            .files
            .iter()
            .position(|f| f.as_ref().map_or(false, |f| f.path == path));
        if let Some(slot) = existing {
            let id = FileId(slot);
            state.open_file_mut(id)?.handles += 1;
            return Ok(id);
        }

        let open_count = state.files.iter().filter(|f| f.is_some()).count();
        if open_count >= self.config.max_open_files {
            return Err(HashStoreError::OpenFilesLimit(self.config.max_open_files));
        }

        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        let block_count = (len / BLOCK_SIZE as u64) as u32;

        let entry = OpenFile {
            name: name.to_string(),
            path,
            file,
            block_count,
            handles: 1,
        };

        let slot = match state.files.iter().position(Option::is_none) {
            Some(slot) => {
                state.files[slot] = Some(entry);
                slot
            }
            None => {
                state.files.push(Some(entry));
                state.files.len() - 1
            }
        };

        tracing::debug!(file = name, slot, block_count, "opened block file");
        Ok(FileId(slot))
    }

    /// Close a block file
    ///
    /// The last close writes back the file's dirty frames and drops them
    /// from the pool. Fails if any of its blocks are still pinned.
    pub fn close_file(&self, id: FileId) -> Result<()> {
        let mut state = self.state.lock();

        let open = state.open_file_mut(id)?;
        if open.handles > 1 {
            open.handles -= 1;
            return Ok(());
        }

        let pinned = state
            .slots
            .iter()
            .filter(|s| s.pins > 0 && matches!(s.page, Some((f, _)) if f == id))
            .count();
        if pinned > 0 {
            return Err(HashStoreError::PinnedBlocksActive(pinned));
        }

        let PoolState {
            slots,
            page_table,
            files,
            ..
        } = &mut *state;

        for slot in slots.iter_mut() {
            if let Some((file_id, block)) = slot.page {
                if file_id != id {
                    continue;
                }
                write_back(files, slot)?;
                page_table.remove(&(file_id, block));
                slot.page = None;
            }
        }

        if let Some(open) = files[id.0].take() {
            open.file.sync_all()?;
            tracing::debug!(file = %open.name, "closed block file");
        }

        Ok(())
    }

    /// Number of blocks in the file, including ones not yet written back
    pub fn block_count(&self, id: FileId) -> Result<u32> {
        let state = self.state.lock();
        Ok(state.open_file(id)?.block_count)
    }

    /// Name the file was opened with
    pub fn file_name(&self, id: FileId) -> Result<String> {
        let state = self.state.lock();
        Ok(state.open_file(id)?.name.clone())
    }

    /// Allocate a zeroed block at end-of-file and pin it
    ///
    /// The new block's index is `block_count - 1` after the call.
    pub fn allocate_block(&self, id: FileId) -> Result<PinnedBlock<'_>> {
        let mut state = self.state.lock();
        let index = state.open_file(id)?.block_count;

        let slot = self.claim_slot(&mut state)?;
        state.open_file_mut(id)?.block_count += 1;

        let frame = Arc::clone(&state.slots[slot].frame);
        frame.data.write().fill(0);
        frame.dirty.store(true, Ordering::Release);

        self.install(&mut state, slot, id, index);
        tracing::trace!(file = id.0, block = index, "allocated block");

        Ok(PinnedBlock {
            manager: self,
            slot,
            frame,
            file: id,
            index,
        })
    }

    /// Pin an existing block
    pub fn get_block(&self, id: FileId, index: BlockId) -> Result<PinnedBlock<'_>> {
        let mut state = self.state.lock();
        let count = state.open_file(id)?.block_count;
        if index >= count {
            return Err(HashStoreError::InvalidBlockNumber {
                block: index,
                count,
            });
        }

        if let Some(&slot) = state.page_table.get(&(id, index)) {
            let now = state.tick();
            let entry = &mut state.slots[slot];
            entry.pins += 1;
            entry.last_used = now;
            return Ok(PinnedBlock {
                manager: self,
                slot,
                frame: Arc::clone(&entry.frame),
                file: id,
                index,
            });
        }

        let slot = self.claim_slot(&mut state)?;
        let frame = Arc::clone(&state.slots[slot].frame);
        {
            let open = state.open_file_mut(id)?;
            let mut data = frame.data.write();
            read_block(&mut open.file, index, &mut data)?;
        }
        frame.dirty.store(false, Ordering::Release);

        self.install(&mut state, slot, id, index);

        Ok(PinnedBlock {
            manager: self,
            slot,
            frame,
            file: id,
            index,
        })
    }

    /// Write every dirty frame back and sync the open files
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        let PoolState { slots, files, .. } = &mut *state;

        for slot in slots.iter() {
            write_back(files, slot)?;
        }
        for open in files.iter().flatten() {
            open.file.sync_all()?;
        }
        Ok(())
    }

    /// Number of frames currently pinned
    pub fn pinned_count(&self) -> usize {
        self.state.lock().slots.iter().filter(|s| s.pins > 0).count()
    }

    /// Whether a block is currently resident in the pool
    pub fn is_resident(&self, id: FileId, index: BlockId) -> bool {
        self.state.lock().page_table.contains_key(&(id, index))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Find a frame for a new page: a never-used slot while the pool grows,
    /// then a free slot, then a victim picked by the replacer.
    fn claim_slot(&self, state: &mut PoolState) -> Result<usize> {
        if state.slots.len() < self.config.buffer_capacity {
            state.slots.push(FrameSlot {
                frame: Arc::new(Frame::new()),
                page: None,
                pins: 0,
                last_used: 0,
            });
            return Ok(state.slots.len() - 1);
        }

        if let Some(free) = state.slots.iter().position(|s| s.page.is_none()) {
            return Ok(free);
        }

        let candidates: Vec<Candidate> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.pins == 0)
            .map(|(slot, s)| Candidate {
                slot,
                last_used: s.last_used,
            })
            .collect();

        let victim = self
            .replacer
            .victim(&candidates)
            .ok_or(HashStoreError::FullMemory(self.config.buffer_capacity))?;

        let PoolState {
            slots,
            page_table,
            files,
            ..
        } = state;
        let entry = &mut slots[victim];
        write_back(files, entry)?;
        if let Some(page) = entry.page.take() {
            page_table.remove(&page);
            tracing::trace!(file = page.0.as_usize(), block = page.1, victim, "evicted block");
        }

        Ok(victim)
    }

    fn install(&self, state: &mut PoolState, slot: usize, id: FileId, index: BlockId) {
        let now = state.tick();
        let entry = &mut state.slots[slot];
        entry.page = Some((id, index));
        entry.pins = 1;
        entry.last_used = now;
        state.page_table.insert((id, index), slot);
    }

    fn unpin(&self, slot: usize) {
        let mut state = self.state.lock();
        if let Some(entry) = state.slots.get_mut(slot) {
            entry.pins = entry.pins.saturating_sub(1);
        }
    }
}

impl Drop for BlockManager {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            tracing::warn!("failed to flush block store on drop: {}", e);
        }
    }
}

/// A block pinned in the buffer pool
///
/// Dropping the guard unpins the block.
pub struct PinnedBlock<'a> {
    manager: &'a BlockManager,
    slot: usize,
    frame: Arc<Frame>,
    file: FileId,
    index: BlockId,
}

impl PinnedBlock<'_> {
    /// Index of this block in its file
    pub fn index(&self) -> BlockId {
        self.index
    }

    /// File this block belongs to
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Borrow the block bytes for reading
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.frame.data.read()
    }

    /// Borrow the block bytes for writing; marks the block dirty
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.mark_dirty();
        self.frame.data.write()
    }

    /// Mark the block as needing write-back
    pub fn mark_dirty(&self) {
        self.frame.dirty.store(true, Ordering::Release);
    }

    /// Whether the block has unwritten changes
    pub fn is_dirty(&self) -> bool {
        self.frame.dirty.load(Ordering::Acquire)
    }
}

impl fmt::Debug for PinnedBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedBlock")
            .field("file", &self.file)
            .field("index", &self.index)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Drop for PinnedBlock<'_> {
    fn drop(&mut self) {
        self.manager.unpin(self.slot);
    }
}

/// Write a dirty frame to its file and clear the dirty flag
fn write_back(files: &mut [Option<OpenFile>], slot: &FrameSlot) -> Result<()> {
    let Some((id, index)) = slot.page else {
        return Ok(());
    };
    if !slot.frame.dirty.load(Ordering::Acquire) {
        return Ok(());
    }

    let open = files
        .get_mut(id.0)
        .and_then(Option::as_mut)
        .ok_or(HashStoreError::InvalidFile(id.0))?;

    let data = slot.frame.data.read();
    open.file
        .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
    open.file.write_all(&data)?;
    slot.frame.dirty.store(false, Ordering::Release);
    Ok(())
}

/// Read a block from disk; bytes past end-of-file read as zero
fn read_block(file: &mut File, index: BlockId, buf: &mut [u8]) -> Result<()> {
    let offset = index as u64 * BLOCK_SIZE as u64;
    let len = file.metadata()?.len();

    buf.fill(0);
    if offset >= len {
        return Ok(());
    }

    file.seek(SeekFrom::Start(offset))?;
    let available = ((len - offset) as usize).min(BLOCK_SIZE);
    file.read_exact(&mut buf[..available])?;
    Ok(())
}
