//! Statistics Reporter
//!
//! Read-only pass over a hash file: block totals, per-bucket load and the
//! buckets whose chains overflowed their head block.

use std::fmt;
use std::sync::Arc;

use crate::block::BlockManager;
use crate::bucket::{BucketEntry, BucketFile};
use crate::error::Result;
use crate::hash_table::HashTable;

/// Load of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStats {
    pub bucket: u32,
    pub records: u64,
    /// Data blocks in the chain
    pub blocks: u32,
    /// `records / capacity_per_block`
    pub overflow_blocks: u64,
}

impl BucketStats {
    /// Whether the bucket holds more records than one block fits
    pub fn overflowed(&self, capacity_per_block: usize) -> bool {
        self.records > capacity_per_block as u64
    }
}

/// Summary of one hash file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashStatistics {
    pub file_name: String,
    pub bucket_count: u32,
    pub capacity_per_block: usize,
    /// Blocks in the file, header and directory included
    pub total_blocks: u32,
    pub average_blocks_per_bucket: u32,
    pub total_records: u64,
    pub average_records_per_bucket: u64,
    /// Least loaded bucket; the lowest index wins ties
    pub min_bucket: BucketStats,
    /// Most loaded bucket; the lowest index wins ties
    pub max_bucket: BucketStats,
    pub buckets: Vec<BucketStats>,
}

impl HashStatistics {
    /// Walk every chain of an open file
    pub fn collect<E: BucketEntry>(file: &BucketFile<E>) -> Result<Self> {
        let capacity = file.capacity_per_block();
        let bucket_count = file.bucket_count();
        let total_blocks = file.block_count()?;

        let mut buckets = Vec::with_capacity(bucket_count as usize);
        for (bucket, head) in (0u32..).zip(file.directory()?) {
            let load = file.load_chain(head)?;
            buckets.push(BucketStats {
                bucket,
                records: load.records,
                blocks: load.blocks,
                overflow_blocks: load.records / capacity as u64,
            });
        }

        let mut min_bucket = buckets[0];
        let mut max_bucket = buckets[0];
        for stats in &buckets[1..] {
            if stats.records < min_bucket.records {
                min_bucket = *stats;
            }
            if stats.records > max_bucket.records {
                max_bucket = *stats;
            }
        }

        let total_records: u64 = buckets.iter().map(|b| b.records).sum();

        tracing::debug!(
            file = file.file_name(),
            total_blocks,
            total_records,
            "collected statistics"
        );

        Ok(Self {
            file_name: file.file_name().to_string(),
            bucket_count,
            capacity_per_block: capacity,
            total_blocks,
            average_blocks_per_bucket: total_blocks / bucket_count,
            total_records,
            average_records_per_bucket: total_records / u64::from(bucket_count),
            min_bucket,
            max_bucket,
            buckets,
        })
    }

    /// Buckets whose records no longer fit one block
    pub fn overflowed(&self) -> impl Iterator<Item = &BucketStats> + '_ {
        self.buckets
            .iter()
            .filter(move |b| b.overflowed(self.capacity_per_block))
    }
}

impl fmt::Display for HashStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics for {}", self.file_name)?;
        writeln!(f, "Total blocks: {}", self.total_blocks)?;
        writeln!(
            f,
            "Records per bucket: min {} (bucket {}), average {}, max {} (bucket {})",
            self.min_bucket.records,
            self.min_bucket.bucket,
            self.average_records_per_bucket,
            self.max_bucket.records,
            self.max_bucket.bucket
        )?;
        writeln!(
            f,
            "Average blocks per bucket: {}",
            self.average_blocks_per_bucket
        )?;

        let overflowed: Vec<_> = self.overflowed().collect();
        writeln!(f, "Overflowed buckets: {}", overflowed.len())?;
        for bucket in &self.buckets {
            if bucket.overflowed(self.capacity_per_block) {
                writeln!(
                    f,
                    "  bucket {}: {} records, Overflowed: YES, overflow blocks: {}",
                    bucket.bucket, bucket.records, bucket.overflow_blocks
                )?;
            } else {
                writeln!(f, "  bucket {}: {} records", bucket.bucket, bucket.records)?;
            }
        }
        Ok(())
    }
}

/// Open a primary hash file by name and summarize it
pub fn hash_statistics(store: &Arc<BlockManager>, file_name: &str) -> Result<HashStatistics> {
    let table = HashTable::open(store, file_name)?;
    let stats = table.statistics();
    table.close()?;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflowed_threshold() {
        let bucket = BucketStats {
            bucket: 0,
            records: 6,
            blocks: 1,
            overflow_blocks: 1,
        };
        assert!(!bucket.overflowed(6));
        assert!(BucketStats { records: 7, ..bucket }.overflowed(6));
    }
}
