//! Tests for the primary hash file
//!
//! These tests verify:
//! - Create/open/close and header validation
//! - Every inserted key is found, absent keys are not
//! - Chain growth once a bucket's head block is full
//! - Blocks-read accounting
//! - Persistence across a restart

use std::collections::HashSet;
use std::sync::Arc;

use hashstore::bucket::{FileKind, FIRST_DATA_BLOCK, MAX_BUCKETS};
use hashstore::{BlockManager, Config, HashStoreError, HashTable, Record, SecondaryIndex};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (TempDir, Arc<BlockManager>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let store = Arc::new(BlockManager::new(config).unwrap());
    (temp_dir, store)
}

fn record(id: i32) -> Record {
    Record::new(id, format!("name{}", id % 7), "Surname", "City").unwrap()
}

fn open_new(store: &Arc<BlockManager>, buckets: u32) -> HashTable {
    HashTable::create(store, "data.db", buckets).unwrap();
    HashTable::open(store, "data.db").unwrap()
}

// =============================================================================
// Create/Open Tests
// =============================================================================

#[test]
fn test_create_then_open() {
    let (temp, store) = setup_store();

    HashTable::create(&store, "data.db", 10).unwrap();
    assert!(temp.path().join("data.db").exists());

    let table = HashTable::open(&store, "data.db").unwrap();
    assert_eq!(table.bucket_count(), 10);
    assert_eq!(table.file_name(), "data.db");
    assert_eq!(table.bucket_file().kind(), FileKind::Primary);
    // Header and directory only
    assert_eq!(table.block_count().unwrap(), 2);
    assert!(table.directory().unwrap().iter().all(Option::is_none));
    table.close().unwrap();
}

#[test]
fn test_create_existing_file_fails() {
    let (_temp, store) = setup_store();

    HashTable::create(&store, "data.db", 10).unwrap();
    assert!(matches!(
        HashTable::create(&store, "data.db", 10),
        Err(HashStoreError::FileAlreadyExists(_))
    ));
}

#[test]
fn test_invalid_bucket_counts() {
    let (temp, store) = setup_store();

    for buckets in [0, MAX_BUCKETS + 1] {
        let err = HashTable::create(&store, "data.db", buckets).unwrap_err();
        assert!(matches!(err, HashStoreError::InvalidBucketCount { .. }));
    }
    // Nothing was written
    assert!(!temp.path().join("data.db").exists());

    HashTable::create(&store, "data.db", MAX_BUCKETS).unwrap();
    let table = HashTable::open(&store, "data.db").unwrap();
    assert_eq!(table.directory().unwrap().len(), MAX_BUCKETS as usize);
}

#[test]
fn test_open_secondary_as_primary_fails() {
    let (_temp, store) = setup_store();

    SecondaryIndex::create(&store, "index.db", 10, "data.db").unwrap();
    let err = HashTable::open(&store, "index.db").err().unwrap();

    assert!(matches!(
        err,
        HashStoreError::WrongFileKind {
            expected: FileKind::Primary,
            found: FileKind::Secondary
        }
    ));
    // The failed open released its handle
    assert_eq!(store.pinned_count(), 0);
}

#[test]
fn test_open_garbage_file_fails() {
    let (temp, store) = setup_store();

    std::fs::write(temp.path().join("junk.db"), vec![0xabu8; 1024]).unwrap();
    assert!(matches!(
        HashTable::open(&store, "junk.db"),
        Err(HashStoreError::InvalidHeader(_))
    ));

    std::fs::write(temp.path().join("short.db"), vec![0u8; 100]).unwrap();
    assert!(matches!(
        HashTable::open(&store, "short.db"),
        Err(HashStoreError::InvalidHeader(_))
    ));
}

// =============================================================================
// Insert/Lookup Tests
// =============================================================================

#[test]
fn test_every_inserted_key_found() {
    for buckets in [1, 2, 3, 10, 17, MAX_BUCKETS] {
        let (_temp, store) = setup_store();
        let mut table = open_new(&store, buckets);

        for id in 0..200 {
            let block = table.insert(&record(id)).unwrap();
            assert!(block >= FIRST_DATA_BLOCK);
        }

        for id in 0..200 {
            let lookup = table.get_all_entries(id).unwrap().unwrap();
            assert_eq!(lookup.matches, vec![record(id)], "buckets={}", buckets);
            assert!(lookup.blocks_read >= 1);
            assert!(lookup.blocks_read <= lookup.blocks_scanned);
        }
        for id in [200, 1000, -1, i32::MIN] {
            assert!(table.get_all_entries(id).unwrap().is_none());
        }
        assert_eq!(store.pinned_count(), 0);
    }
}

#[test]
fn test_duplicate_keys_all_returned() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 4);

    for city in ["A", "B", "C", "D", "E", "F", "G", "H"] {
        table.insert(&Record::new(5, "n", "s", city).unwrap()).unwrap();
    }

    let lookup = table.get_all_entries(5).unwrap().unwrap();
    let cities: Vec<_> = lookup.matches.iter().map(|r| r.city.as_str()).collect();
    assert_eq!(cities, vec!["A", "B", "C", "D", "E", "F", "G", "H"]);
    assert_eq!(lookup.blocks_read, 1);
    assert_eq!(lookup.blocks_scanned, 2);
}

#[test]
fn test_negative_ids() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 7);

    for id in [-1, -100, i32::MIN, i32::MAX] {
        table.insert(&record(id)).unwrap();
    }
    for id in [-1, -100, i32::MIN, i32::MAX] {
        let bucket = table.bucket_of(id);
        assert!(bucket < 7);
        assert_eq!(bucket, (id as u32) % 7);
        assert!(table.get_all_entries(id).unwrap().is_some());
    }
}

#[test]
fn test_lazy_entries() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 1);
    for id in 0..20 {
        table.insert(&record(id % 2)).unwrap();
    }

    let key = 1;
    let mut entries = table.entries(&key).unwrap();
    let first = entries.next().unwrap().unwrap();
    assert_eq!(first.entry.id, 1);
    assert_eq!(first.position, 1);
    // Only the head block has been read so far
    assert_eq!(entries.blocks_read(), 1);
    assert_eq!(store.pinned_count(), 0);

    assert_eq!(entries.count(), 9);
}

// =============================================================================
// Chain Growth Tests
// =============================================================================

#[test]
fn test_chain_grows_after_capacity() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 10);
    let max = table.capacity_per_block() as i32;

    // Same bucket: multiples of 10
    let blocks: Vec<_> = (0..=max)
        .map(|i| table.insert(&record(i * 10)).unwrap())
        .collect();

    let chain = table.chain_blocks(0).unwrap();
    assert_eq!(chain.len(), 2);
    assert!(blocks[..max as usize].iter().all(|&b| b == chain[0]));
    assert_eq!(blocks[max as usize], chain[1]);

    assert_eq!(
        table.read_block(chain[0]).unwrap().len(),
        max as usize
    );
    assert_eq!(table.read_block(chain[1]).unwrap(), vec![record(max * 10)]);
}

#[test]
fn test_ten_bucket_scenario() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 10);

    assert_eq!(table.block_count().unwrap(), 2);

    let block = table.insert(&record(80)).unwrap();
    assert_eq!(block, 2);
    assert_eq!(table.block_count().unwrap(), 3);

    let lookup = table.get_all_entries(80).unwrap().unwrap();
    assert_eq!(lookup.blocks_read, 1);
    assert!(table.get_all_entries(0).unwrap().is_none());

    let mut first_overflow = None;
    for id in (0..70).step_by(10) {
        let rec = Record::new(id, format!("n{}", id), "s", "c").unwrap();
        let block = table.insert(&rec).unwrap();
        if id == 50 {
            first_overflow = Some((block, rec));
        }
    }
    assert_eq!(table.block_count().unwrap(), 4);

    // Key 50 is the first record that no longer fits block 2
    let (block, rec) = first_overflow.unwrap();
    assert_eq!(block, 3);
    assert_eq!(table.read_block(3).unwrap()[0], rec);

    let lookup = table.get_all_entries(60).unwrap().unwrap();
    assert_eq!(lookup.blocks_read, 2);
    assert_eq!(table.chain_blocks(0).unwrap(), vec![2, 3]);
}

#[test]
fn test_chain_grows_with_single_frame_pool() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .buffer_capacity(1)
        .build();
    config.validate().unwrap();
    let store = Arc::new(BlockManager::new(config).unwrap());
    let mut table = open_new(&store, 10);

    let blocks: Vec<_> = (0..70)
        .step_by(10)
        .map(|id| table.insert(&record(id)).unwrap())
        .collect();

    assert_eq!(blocks, vec![2, 2, 2, 2, 2, 2, 3]);
    assert_eq!(table.chain_blocks(0).unwrap(), vec![2, 3]);
    let lookup = table.get_all_entries(60).unwrap().unwrap();
    assert_eq!(lookup.matches, vec![record(60)]);
    assert_eq!(lookup.blocks_read, 2);
    assert_eq!(store.pinned_count(), 0);

    // The index grows the same way over the shared frame
    SecondaryIndex::create(&store, "index.db", 1, "data.db").unwrap();
    let mut index = SecondaryIndex::open(&store, "index.db").unwrap();
    for id in 0..30 {
        let rec = Record::new(id, "Iosif", "s", "c").unwrap();
        let block = table.insert(&rec).unwrap();
        index.insert(&rec, block).unwrap();
    }
    assert_eq!(index.bucket_file().chain_blocks(0).unwrap().len(), 2);
    let by_name = index.get_all_entries(&table, "Iosif").unwrap().unwrap();
    assert_eq!(by_name.matches.len(), 30);
}

#[test]
fn test_directory_only_changes_on_first_insert() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 5);

    table.insert(&record(3)).unwrap();
    let before = table.directory().unwrap();
    for i in 1..20 {
        table.insert(&record(3 + 5 * i)).unwrap();
    }
    assert_eq!(table.directory().unwrap(), before);

    let heads: HashSet<_> = before.iter().flatten().collect();
    assert_eq!(heads.len(), 1);
}

#[test]
fn test_read_metadata_block_rejected() {
    let (_temp, store) = setup_store();
    let table = open_new(&store, 3);

    for id in [0, 1] {
        assert!(matches!(
            table.read_block(id),
            Err(HashStoreError::CorruptBlock { .. })
        ));
    }
}

#[test]
fn test_overlong_record_not_inserted() {
    let (_temp, store) = setup_store();
    let mut table = open_new(&store, 3);

    let bad = Record {
        record: "t".to_string(),
        id: 1,
        name: "x".repeat(40),
        surname: String::new(),
        city: String::new(),
    };
    assert!(matches!(
        table.insert(&bad),
        Err(HashStoreError::FieldTooLong { field: "name", .. })
    ));
    assert_eq!(table.block_count().unwrap(), 2);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_records_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .buffer_capacity(3)
        .build();

    {
        let store = Arc::new(BlockManager::new(config.clone()).unwrap());
        let mut table = open_new(&store, 4);
        for id in 0..100 {
            table.insert(&record(id)).unwrap();
        }
        table.close().unwrap();
    }

    let store = Arc::new(BlockManager::new(config).unwrap());
    let table = HashTable::open(&store, "data.db").unwrap();
    assert_eq!(table.bucket_count(), 4);
    for id in 0..100 {
        assert_eq!(
            table.get_all_entries(id).unwrap().unwrap().matches,
            vec![record(id)]
        );
    }
}
