//! hashstore CLI
//!
//! Command-line interface over hash files in a data directory.

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hashstore::{
    hash_statistics, BlockManager, Config, HashStoreError, HashTable, HeapFile, Record,
    RecordGenerator, ReplacementPolicy, SecondaryIndex,
};
use tracing_subscriber::{fmt, EnvFilter};

/// hashstore CLI
#[derive(Parser, Debug)]
#[command(name = "hashstore-cli")]
#[command(about = "CLI for hashstore hash files")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./hashstore_data")]
    data_dir: String,

    /// Buffer replacement policy (lru or mru)
    #[arg(short, long, default_value = "lru")]
    policy: ReplacementPolicy,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty hash file
    Create {
        file: String,

        /// Number of buckets
        #[arg(short, long)]
        buckets: Option<u32>,
    },

    /// Create a secondary index over a hash file
    CreateIndex {
        index: String,

        /// The hash file being indexed
        primary: String,

        /// Number of buckets
        #[arg(short, long)]
        buckets: Option<u32>,
    },

    /// Insert one record
    Insert {
        file: String,

        /// Secondary index to mirror the record into
        #[arg(short, long)]
        index: Option<String>,

        id: i32,
        name: String,
        surname: String,
        city: String,

        /// Record tag (defaults to rec<id>)
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Insert generated records
    Seed {
        file: String,

        /// Secondary index to mirror the records into
        #[arg(short, long)]
        index: Option<String>,

        /// Number of records
        #[arg(short, long, default_value = "30")]
        count: usize,

        /// Generator seed
        #[arg(short, long, default_value = "12569874")]
        seed: u64,
    },

    /// Print every record with an id
    Get { file: String, id: i32 },

    /// Print every record with a name, through an index
    Find {
        file: String,
        index: String,
        name: String,
    },

    /// Print bucket statistics of a file
    Stats { file: String },

    /// Create an empty heap file
    CreateHeap { file: String },

    /// Append generated records to a heap file
    HeapSeed {
        file: String,

        /// Number of records
        #[arg(short, long, default_value = "30")]
        count: usize,

        /// Generator seed
        #[arg(short, long, default_value = "12569874")]
        seed: u64,
    },

    /// Print every record with an id by scanning a heap file
    HeapGet { file: String, id: i32 },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> hashstore::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .replacement_policy(args.policy)
        .build();
    config.validate()?;
    let default_buckets = config.default_buckets;
    let store = Arc::new(BlockManager::new(config)?);

    match args.command {
        Commands::Create { file, buckets } => {
            let buckets = buckets.unwrap_or(default_buckets);
            HashTable::create(&store, &file, buckets)?;
            println!("created {} with {} buckets", file, buckets);
        }

        Commands::CreateIndex {
            index,
            primary,
            buckets,
        } => {
            let buckets = buckets.unwrap_or(default_buckets);
            // Bind only to a file that really is a primary hash file
            HashTable::open(&store, &primary)?.close()?;
            SecondaryIndex::create(&store, &index, buckets, &primary)?;
            println!("created {} over {} with {} buckets", index, primary, buckets);
        }

        Commands::Insert {
            file,
            index,
            id,
            name,
            surname,
            city,
            tag,
        } => {
            let record = match tag {
                Some(tag) => Record::with_tag(tag, id, name, surname, city)?,
                None => Record::new(id, name, surname, city)?,
            };
            let mut table = HashTable::open(&store, &file)?;
            let mut index = open_index(&store, index.as_deref(), &table)?;

            let block = table.insert(&record)?;
            if let Some(index) = index.as_mut() {
                index.insert(&record, block)?;
            }
            println!("inserted {} into block {}", record, block);

            close_all(table, index)?;
        }

        Commands::Seed {
            file,
            index,
            count,
            seed,
        } => {
            let mut table = HashTable::open(&store, &file)?;
            let mut index = open_index(&store, index.as_deref(), &table)?;

            for record in RecordGenerator::new(seed).take(count) {
                let block = table.insert(&record)?;
                if let Some(index) = index.as_mut() {
                    index.insert(&record, block)?;
                }
            }
            println!("inserted {} records into {}", count, file);

            close_all(table, index)?;
        }

        Commands::Get { file, id } => {
            let table = HashTable::open(&store, &file)?;
            match table.get_all_entries(id)? {
                Some(lookup) => println!("{}", lookup),
                None => println!("no record with id {}", id),
            }
            table.close()?;
        }

        Commands::Find { file, index, name } => {
            let table = HashTable::open(&store, &file)?;
            let index = SecondaryIndex::open(&store, &index)?;
            match index.get_all_entries(&table, &name)? {
                Some(lookup) => {
                    for record in &lookup.matches {
                        println!("{}", record);
                    }
                    println!("index blocks read: {}", lookup.blocks_read);
                }
                None => println!("no record named {}", name),
            }
            close_all(table, Some(index))?;
        }

        Commands::Stats { file } => {
            let stats = match hash_statistics(&store, &file) {
                Err(HashStoreError::WrongFileKind { .. }) => {
                    let index = SecondaryIndex::open(&store, &file)?;
                    let stats = index.statistics();
                    index.close()?;
                    stats?
                }
                other => other?,
            };
            print!("{}", stats);
        }

        Commands::CreateHeap { file } => {
            HeapFile::create(&store, &file)?;
            println!("created heap file {}", file);
        }

        Commands::HeapSeed { file, count, seed } => {
            let mut heap = HeapFile::open(&store, &file)?;
            for record in RecordGenerator::new(seed).take(count) {
                heap.insert(&record)?;
            }
            println!("inserted {} records into {}", count, file);
            heap.close()?;
        }

        Commands::HeapGet { file, id } => {
            let heap = HeapFile::open(&store, &file)?;
            match heap.get_all_entries(id)? {
                Some(lookup) => println!("{}", lookup),
                None => println!("no record with id {}", id),
            }
            heap.close()?;
        }
    }

    store.flush_all()
}

/// Open the index named on the command line, checking it covers `table`
fn open_index(
    store: &Arc<BlockManager>,
    name: Option<&str>,
    table: &HashTable,
) -> hashstore::Result<Option<SecondaryIndex>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let index = SecondaryIndex::open(store, name)?;
    if index.primary_file() != table.file_name() {
        return Err(HashStoreError::IndexMismatch {
            expected: index.primary_file().to_string(),
            found: table.file_name().to_string(),
        });
    }
    Ok(Some(index))
}

fn close_all(table: HashTable, index: Option<SecondaryIndex>) -> hashstore::Result<()> {
    if let Some(index) = index {
        index.close()?;
    }
    table.close()
}
