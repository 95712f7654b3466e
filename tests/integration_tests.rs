//! Integration tests for hashstore
//!
//! End-to-end runs of the hash file, its index and the statistics reporter
//! over one block store.

use std::sync::Arc;

use hashstore::{
    hash_statistics, BlockManager, Config, HashTable, RecordGenerator, ReplacementPolicy,
    SecondaryIndex,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config(temp_dir: &TempDir, capacity: usize, policy: ReplacementPolicy) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .buffer_capacity(capacity)
        .replacement_policy(policy)
        .build()
}

/// Insert `count` generated records into fresh files; returns the captured
/// name and the records
fn populate(
    store: &Arc<BlockManager>,
    count: usize,
    buckets: u32,
) -> (String, Vec<hashstore::Record>) {
    HashTable::create(store, "data.db", buckets).unwrap();
    SecondaryIndex::create(store, "index.db", buckets, "data.db").unwrap();
    let mut table = HashTable::open(store, "data.db").unwrap();
    let mut index = SecondaryIndex::open(store, "index.db").unwrap();

    let mut generator = RecordGenerator::new(12569874);
    let name = generator.random_name().to_string();
    let records: Vec<_> = generator.take(count).collect();
    for record in &records {
        let block = table.insert(record).unwrap();
        index.insert(record, block).unwrap();
    }

    index.close().unwrap();
    table.close().unwrap();
    (name, records)
}

// =============================================================================
// End-to-End Tests
// =============================================================================

#[test]
fn test_demo_flow() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(BlockManager::new(config(&temp_dir, 100, ReplacementPolicy::Lru)).unwrap());

    let (name, records) = populate(&store, 30, 10);

    let table = HashTable::open(&store, "data.db").unwrap();
    let index = SecondaryIndex::open(&store, "index.db").unwrap();

    let expected = records.iter().filter(|r| r.name == name).count();
    match index.get_all_entries(&table, &name).unwrap() {
        Some(lookup) => assert_eq!(lookup.matches.len(), expected),
        None => assert_eq!(expected, 0),
    }
    table.close().unwrap();

    let stats = hash_statistics(&store, "data.db").unwrap();
    assert_eq!(stats.total_records, 30);
    assert_eq!(stats.bucket_count, 10);
    // 30 sequential ids over 10 buckets: 3 per bucket, one block each
    assert!(stats.buckets.iter().all(|b| b.records == 3 && b.blocks == 1));
    assert_eq!(stats.total_blocks, 12);
}

#[test]
fn test_small_pool_same_results_for_both_policies() {
    let mut summaries = Vec::new();

    for policy in [ReplacementPolicy::Lru, ReplacementPolicy::Mru] {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(BlockManager::new(config(&temp_dir, 3, policy)).unwrap());
        let (_, records) = populate(&store, 300, 13);

        let table = HashTable::open(&store, "data.db").unwrap();
        let index = SecondaryIndex::open(&store, "index.db").unwrap();

        for record in &records {
            let lookup = table.get_all_entries(record.id).unwrap().unwrap();
            assert_eq!(lookup.matches, vec![record.clone()]);

            let by_name = index.get_all_entries(&table, &record.name).unwrap().unwrap();
            assert!(by_name.matches.contains(record));
        }
        assert_eq!(store.pinned_count(), 0);

        summaries.push(table.statistics().unwrap());
    }

    assert_eq!(summaries[0], summaries[1]);
}

#[test]
fn test_files_survive_restart() {
    let temp_dir = TempDir::new().unwrap();

    let (name, records) = {
        let store = Arc::new(BlockManager::new(config(&temp_dir, 8, ReplacementPolicy::Lru)).unwrap());
        populate(&store, 120, 5)
    };

    let store = Arc::new(BlockManager::new(config(&temp_dir, 8, ReplacementPolicy::Mru)).unwrap());
    let table = HashTable::open(&store, "data.db").unwrap();
    let index = SecondaryIndex::open(&store, "index.db").unwrap();
    assert_eq!(index.primary_file(), "data.db");

    for record in &records {
        assert!(table.get_all_entries(record.id).unwrap().is_some());
    }

    let expected: Vec<_> = records.iter().filter(|r| r.name == name).collect();
    let found = index.get_all_entries(&table, &name).unwrap();
    assert_eq!(found.map_or(0, |l| l.matches.len()), expected.len());
}
