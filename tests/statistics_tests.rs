//! Tests for the statistics reporter
//!
//! These tests verify:
//! - Totals agree with what was inserted
//! - Min/max buckets and overflow reporting
//! - Collecting statistics never changes the file

use std::sync::Arc;

use hashstore::{
    hash_statistics, BlockManager, Config, HashStoreError, HashTable, Record, RecordGenerator,
    SecondaryIndex,
};
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
    Record::new(id, "Sofia", "Svingos", "Tokyo").unwrap()
}

// =============================================================================
// Statistics Tests
// =============================================================================

#[test]
fn test_empty_file() {
    let (_temp, store) = setup_store();
    HashTable::create(&store, "data.db", 5).unwrap();

    let stats = hash_statistics(&store, "data.db").unwrap();

    assert_eq!(stats.total_blocks, 2);
    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.average_blocks_per_bucket, 0);
    assert_eq!(stats.buckets.len(), 5);
    assert!(stats.buckets.iter().all(|b| b.records == 0 && b.blocks == 0));
    assert_eq!(stats.overflowed().count(), 0);
    // Ties go to the first bucket
    assert_eq!(stats.min_bucket.bucket, 0);
    assert_eq!(stats.max_bucket.bucket, 0);
}

#[test]
fn test_counts_match_inserts() {
    let (_temp, store) = setup_store();
    HashTable::create(&store, "data.db", 4).unwrap();
    let mut table = HashTable::open(&store, "data.db").unwrap();

    // Bucket 0: 13 records, bucket 1: 1, bucket 2: 3, bucket 3: none
    let ids: Vec<i32> = (0..13)
        .map(|i| i * 4)
        .chain([1])
        .chain([2, 6, 10])
        .collect();
    for &id in &ids {
        table.insert(&record(id)).unwrap();
    }

    let stats = table.statistics().unwrap();
    let records: Vec<_> = stats.buckets.iter().map(|b| b.records).collect();
    assert_eq!(records, vec![13, 1, 3, 0]);

    let blocks: Vec<_> = stats.buckets.iter().map(|b| b.blocks).collect();
    assert_eq!(blocks, vec![3, 1, 1, 0]);

    assert_eq!(stats.total_records, ids.len() as u64);
    // Header + directory + 5 data blocks
    assert_eq!(stats.total_blocks, 7);
    assert_eq!(stats.average_blocks_per_bucket, 1);
    assert_eq!(stats.average_records_per_bucket, 4);

    assert_eq!(stats.min_bucket.bucket, 3);
    assert_eq!(stats.max_bucket.bucket, 0);

    let overflowed: Vec<_> = stats.overflowed().collect();
    assert_eq!(overflowed.len(), 1);
    assert_eq!(overflowed[0].bucket, 0);
    assert_eq!(overflowed[0].overflow_blocks, 2);

    let text = stats.to_string();
    assert!(text.contains("Total blocks: 7"));
    assert!(text.contains("Overflowed: YES"));
}

#[test]
fn test_statistics_do_not_mutate() {
    let (temp, store) = setup_store();
    HashTable::create(&store, "data.db", 6).unwrap();
    {
        let mut table = HashTable::open(&store, "data.db").unwrap();
        for record in RecordGenerator::new(5).take(80) {
            table.insert(&record).unwrap();
        }
        table.close().unwrap();
    }
    store.flush_all().unwrap();
    let before = std::fs::read(temp.path().join("data.db")).unwrap();

    let first = hash_statistics(&store, "data.db").unwrap();
    let second = hash_statistics(&store, "data.db").unwrap();
    store.flush_all().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_records, 80);
    assert_eq!(std::fs::read(temp.path().join("data.db")).unwrap(), before);
}

#[test]
fn test_statistics_while_open() {
    let (_temp, store) = setup_store();
    HashTable::create(&store, "data.db", 3).unwrap();
    let mut table = HashTable::open(&store, "data.db").unwrap();
    for id in 0..10 {
        table.insert(&record(id)).unwrap();
    }

    // A second open of the same file sees the unflushed inserts
    let stats = hash_statistics(&store, "data.db").unwrap();
    assert_eq!(stats.total_records, 10);

    // The table is still usable afterwards
    table.insert(&record(10)).unwrap();
    assert!(table.get_all_entries(10).unwrap().is_some());
}

#[test]
fn test_statistics_of_index_file() {
    let (_temp, store) = setup_store();
    SecondaryIndex::create(&store, "index.db", 3, "data.db").unwrap();

    assert!(matches!(
        hash_statistics(&store, "index.db"),
        Err(HashStoreError::WrongFileKind { .. })
    ));

    let index = SecondaryIndex::open(&store, "index.db").unwrap();
    let stats = index.statistics().unwrap();
    assert_eq!(stats.capacity_per_block, 24);
    assert_eq!(stats.total_records, 0);
}
