//! hashstore Demo Binary
//!
//! Fills a hash file and its secondary index with random records, looks up
//! one name through the index and prints the file's statistics.

use std::process;
use std::sync::Arc;

use clap::Parser;
use hashstore::{
    hash_statistics, BlockManager, Config, HashTable, ReplacementPolicy, RecordGenerator,
    SecondaryIndex,
};
use tracing_subscriber::{fmt, EnvFilter};

const FILE_NAME: &str = "data.db";
const INDEX_NAME: &str = "index.db";

/// hashstore demo driver
#[derive(Parser, Debug)]
#[command(name = "hashstore-demo")]
#[command(about = "Insert random records into a hash file and query them by name")]
#[command(version)]
struct Args {
    /// Number of records to insert
    #[arg(short, long, default_value = "30")]
    records: usize,

    /// Buckets of both the hash file and the index
    #[arg(short, long, default_value = "10")]
    buckets: u32,

    /// Seed of the record generator
    #[arg(short, long, default_value = "12569874")]
    seed: u64,

    /// Data directory
    #[arg(short, long, default_value = "./hashstore_data")]
    data_dir: String,

    /// Buffer replacement policy (lru or mru)
    #[arg(short, long, default_value = "lru")]
    policy: ReplacementPolicy,

    /// Remove files left by a previous run first
    #[arg(long)]
    overwrite: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hashstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("hashstore demo v{}", hashstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Replacement policy: {}", args.policy);

    if let Err(e) = run(&args) {
        tracing::error!("Demo failed: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> hashstore::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .replacement_policy(args.policy)
        .default_buckets(args.buckets)
        .build();
    config.validate()?;

    if args.overwrite {
        for name in [FILE_NAME, INDEX_NAME] {
            let path = config.data_dir.join(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
                tracing::info!("Removed {}", path.display());
            }
        }
    }

    let store = Arc::new(BlockManager::new(config)?);

    HashTable::create(&store, FILE_NAME, args.buckets)?;
    SecondaryIndex::create(&store, INDEX_NAME, args.buckets, FILE_NAME)?;

    let mut table = HashTable::open(&store, FILE_NAME)?;
    let mut index = SecondaryIndex::open(&store, INDEX_NAME)?;

    let mut generator = RecordGenerator::new(args.seed);

    // The name we look up later
    let search_name = generator.random_name().to_string();

    println!("Insert Entries");
    for record in generator.by_ref().take(args.records) {
        let block = table.insert(&record)?;
        index.insert(&record, block)?;
    }

    println!("RUN PrintAllEntries for name {}", search_name);
    match index.get_all_entries(&table, &search_name)? {
        Some(lookup) => {
            for record in &lookup.matches {
                println!("{}", record);
            }
            println!("index blocks read: {}", lookup.blocks_read);
            println!("primary blocks read: {}", lookup.primary_blocks.len());
        }
        None => println!("-1"),
    }

    table.close()?;
    let stats = hash_statistics(&store, FILE_NAME)?;
    print!("{}", stats);

    index.close()?;
    store.flush_all()?;
    Ok(())
}
