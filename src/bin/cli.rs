//! GenKV CLI
//!
//! Command-line tool for inspecting and maintaining a generation directory.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use genkv::{Config, Entry, Result, Storage};
use tracing_subscriber::{fmt, EnvFilter};

/// GenKV CLI
#[derive(Parser, Debug)]
#[command(name = "genkv-cli")]
#[command(about = "Inspect and maintain GenKV generation files")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./genkv_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show generations, entry counts and tombstone flags
    Info,

    /// Look up a key (newest generation wins)
    Get {
        /// The key to look up
        key: String,
    },

    /// List entries in [from, to)
    Scan {
        /// Inclusive lower bound
        #[arg(long)]
        from: Option<String>,

        /// Exclusive upper bound
        #[arg(long)]
        to: Option<String>,

        /// Print every generation separately, tombstones included
        #[arg(long)]
        raw: bool,
    },

    /// Write one new generation; `key=value` stores, a bare `key` deletes
    PutBatch {
        /// Entries as key=value or key
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Merge all generations into one, dropping deleted keys
    Compact,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,genkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::builder().data_dir(&args.data_dir).build();

    tracing::debug!("GenKV CLI v{}", genkv::VERSION);

    if let Err(e) = run(&config, args.command) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(config: &Config, command: Commands) -> Result<()> {
    let storage = Storage::load(config)?;

    match command {
        Commands::Info => info(&storage)?,
        Commands::Get { key } => match storage.get(key.as_bytes())? {
            Some(entry) => print_entry(&entry),
            None => println!("(not found)"),
        },
        Commands::Scan { from, to, raw } => {
            let from = from.as_deref().map(str::as_bytes);
            let to = to.as_deref().map(str::as_bytes);
            if raw {
                for cursor in storage.iterate(from, to)? {
                    println!("-- generation {}", cursor.generation_id());
                    for entry in cursor {
                        print_entry(&entry?);
                    }
                }
            } else {
                for entry in storage.range(from, to)? {
                    print_entry(&entry?);
                }
            }
        }
        Commands::PutBatch { entries } => {
            let batch = parse_batch(&entries);
            let meta = storage.save(&batch)?;
            println!("wrote {} entries to {}", meta.entry_count, meta.path.display());
        }
        Commands::Compact => {
            let live: Vec<Entry> = storage.range(None, None)?.collect::<Result<_>>()?;
            let meta = Storage::compact(config, &live)?;
            storage.close();
            println!("compacted into {} live entries", meta.entry_count);
        }
    }

    Ok(())
}

fn info(storage: &Storage) -> Result<()> {
    println!("data dir:    {}", storage.data_dir().display());
    println!("generations: {}", storage.generation_count());
    println!("compacted:   {}", storage.is_compacted());

    for generation in storage.generations()?.iter() {
        println!(
            "  #{:<4} {:>10} entries {:>12} bytes  tombstones={}  {}",
            generation.id(),
            generation.entry_count(),
            generation.file_size(),
            generation.has_tombstone(),
            generation.path().display()
        );
    }
    Ok(())
}

/// Parse `key=value` / `key` arguments into a sorted, deduplicated batch.
/// The last occurrence of a key wins.
fn parse_batch(args: &[String]) -> Vec<Entry> {
    let mut batch = std::collections::BTreeMap::new();
    for arg in args {
        let entry = match arg.split_once('=') {
            Some((key, value)) => Entry::new(key.as_bytes().to_vec(), value.as_bytes().to_vec()),
            None => Entry::tombstone(arg.as_bytes().to_vec()),
        };
        batch.insert(entry.key.clone(), entry);
    }
    batch.into_values().collect()
}

fn print_entry(entry: &Entry) {
    let key = String::from_utf8_lossy(entry.key());
    match entry.value() {
        Some(value) => println!("{} = {}", key, String::from_utf8_lossy(value)),
        None => println!("{} (deleted)", key),
    }
}
