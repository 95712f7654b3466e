//! # hashstore
//!
//! A disk-resident hash file with:
//! - Static hashing into a fixed number of buckets
//! - Overflow chains of 512-byte blocks per bucket
//! - A secondary hash index from `name` to primary blocks
//! - An unhashed heap file of the same records, for comparison
//! - A pinned buffer pool with LRU/MRU replacement underneath
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  HashTable (by id)   │◄─────│ SecondaryIndex (name)│
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │                             │
//!            └──────────────┬──────────────┘
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │     BucketFile<E: Entry>     │
//!            │ header | directory | chains  │
//!            └──────────────┬───────────────┘
//!                           ▼
//!            ┌──────────────────────────────┐
//!            │         BlockManager         │
//!            │  (pinned frames, Replacer)   │
//!            └──────────────────────────────┘
//! ```
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use hashstore::{BlockManager, Config, HashTable, Record, SecondaryIndex};
//!
//! # fn main() -> hashstore::Result<()> {
//! let store = Arc::new(BlockManager::new(Config::builder().data_dir("./data").build())?);
//! HashTable::create(&store, "data.db", 10)?;
//! SecondaryIndex::create(&store, "index.db", 10, "data.db")?;
//!
//! let mut table = HashTable::open(&store, "data.db")?;
//! let mut index = SecondaryIndex::open(&store, "index.db")?;
//!
//! let record = Record::new(1, "Feb", "Smith", "Athens")?;
//! let block = table.insert(&record)?;
//! index.insert(&record, block)?;
//!
//! assert!(table.get_all_entries(1)?.is_some());
//! assert!(index.get_all_entries(&table, "Feb")?.is_some());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod record;
pub mod bucket;
pub mod hash_table;
pub mod heap_file;
pub mod secondary;
pub mod stats;
pub mod generator;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HashStoreError, Result};
pub use config::{Config, ReplacementPolicy};
pub use block::{BlockId, BlockManager, BLOCK_SIZE};
pub use record::{Record, SecondaryEntry};
pub use bucket::{BucketEntry, BucketFile, FileKind};
pub use hash_table::{HashTable, Lookup};
pub use heap_file::HeapFile;
pub use secondary::{hash_string, SecondaryIndex, SecondaryLookup};
pub use stats::{hash_statistics, BucketStats, HashStatistics};
pub use generator::RecordGenerator;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of hashstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
