//! Error types for hashstore
//!
//! Provides a unified error type for all operations.
//!
//! Logical "not found" is never an error: lookups return `Option`.

use thiserror::Error;

use crate::bucket::FileKind;

/// Result type alias using HashStoreError
pub type Result<T> = std::result::Result<T, HashStoreError>;

/// Unified error type for hashstore operations
#[derive(Debug, Error)]
pub enum HashStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Store Errors
    // -------------------------------------------------------------------------
    #[error("Open files limit reached ({0} files)")]
    OpenFilesLimit(usize),

    #[error("Invalid file handle: {0}")]
    InvalidFile(usize),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Buffer pool is full: all {0} frames are pinned")]
    FullMemory(usize),

    #[error("Block {block} does not exist (file has {count} blocks)")]
    InvalidBlockNumber { block: u32, count: u32 },

    #[error("Cannot close file: {0} blocks still pinned")]
    PinnedBlocksActive(usize),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Wrong file kind: expected {expected}, found {found}")]
    WrongFileKind { expected: FileKind, found: FileKind },

    #[error("Invalid file header: {0}")]
    InvalidHeader(String),

    #[error("Invalid bucket count {count} (must be between 1 and {max})")]
    InvalidBucketCount { count: u32, max: u32 },

    #[error("Bucket {bucket} out of range (file has {count} buckets)")]
    BucketOutOfRange { bucket: u32, count: u32 },

    #[error("Corrupt block {block}: {reason}")]
    CorruptBlock { block: u32, reason: String },

    #[error("Index is bound to {expected}, not {found}")]
    IndexMismatch { expected: String, found: String },

    // -------------------------------------------------------------------------
    // Consistency Errors
    // -------------------------------------------------------------------------
    #[error("Index points at block {block_id} but it holds no record named {key:?}")]
    IndexInconsistency { key: String, block_id: u32 },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Field {field} is longer than {max} bytes")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
