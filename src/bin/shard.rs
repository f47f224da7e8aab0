//! `shard`: command-line front end over the Shard Builder/Reader library.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};
use shard::{Shard, ShardBuilder, KEY_LEN};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shard")]
#[command(about = "Create and inspect write-once, read-many object shards")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display shard file header information
    Info {
        /// Shard files to inspect
        #[arg(value_name = "SHARD", required = true)]
        shards: Vec<PathBuf>,
    },

    /// Create a shard file from given files
    Create {
        /// Path of the shard file to create
        shard: PathBuf,

        /// Files to add to the shard, or "-" to read a file list from stdin
        #[arg(value_name = "FILES", required = true)]
        files: Vec<String>,

        /// Sort files by reversed filename before writing, for better compressibility
        #[arg(long)]
        sorted: bool,
    },

    /// List objects in a shard file
    Ls {
        /// Shard file to list
        shard: PathBuf,
    },

    /// Write the objects for given keys to standard output
    Get {
        /// Shard file to read from
        shard: PathBuf,

        /// Hex-encoded keys to fetch
        #[arg(value_name = "HEXKEY", required = true)]
        keys: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Info { shards } => cmd_info(&shards),
        Commands::Create {
            shard,
            files,
            sorted,
        } => cmd_create(&shard, files, sorted),
        Commands::Ls { shard } => cmd_ls(&shard),
        Commands::Get { shard, keys } => cmd_get(&shard, &keys),
    }
}

fn cmd_info(shards: &[PathBuf]) -> Result<()> {
    for path in shards {
        let shard =
            Shard::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let h = shard.header();
        println!("Shard {}", path.display());
        println!("├─version:    {}", h.version);
        println!("├─objects:    {}", h.objects_count);
        println!("│ ├─position: {}", h.objects_position);
        println!("│ └─size:     {}", h.objects_size);
        println!("├─index");
        println!("│ ├─position: {}", h.index_position);
        println!("│ └─size:     {}", h.index_size);
        println!("└─hash");
        println!("  └─position: {}", h.hash_position);
    }
    Ok(())
}

fn cmd_create(shard_path: &PathBuf, files: Vec<String>, sorted: bool) -> Result<()> {
    let files = if files == ["-"] {
        io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    } else {
        files
    };
    println!("There are {} entries", files.len());

    // Dedupe by content digest, keeping the first file seen for each digest,
    // and preserving file-argument order so repeated runs over identical
    // inputs write objects in the same order (sort order differs only under
    // `--sorted`).
    let mut seen = std::collections::HashSet::new();
    let mut entries: Vec<(String, [u8; KEY_LEN])> = Vec::new();
    for fname in &files {
        let data = match std::fs::read(fname) {
            Ok(data) => data,
            Err(_) => continue,
        };
        let digest: [u8; KEY_LEN] = Sha256::digest(&data).into();
        if seen.insert(digest) {
            entries.push((fname.clone(), digest));
        }
    }
    println!("after deduplication: {} entries", entries.len());

    if sorted {
        entries.sort_by_key(|(fname, _)| fname.chars().rev().collect::<String>());
    }

    let mut builder = ShardBuilder::open(shard_path, entries.len() as u64)
        .with_context(|| format!("failed to create {}", shard_path.display()))?;
    for (fname, digest) in &entries {
        let data = std::fs::read(fname).with_context(|| format!("failed to read {fname}"))?;
        builder.write(digest, &data)?;
    }
    builder.finalize()?;
    println!("Done");
    Ok(())
}

fn cmd_ls(shard_path: &PathBuf) -> Result<()> {
    let shard = Shard::open(shard_path)
        .with_context(|| format!("failed to open {}", shard_path.display()))?;
    for key in shard.iter() {
        let size = shard.size_of(&key)?;
        println!("{}: {} bytes", hex::encode(key), size);
    }
    Ok(())
}

fn cmd_get(shard_path: &PathBuf, keys: &[String]) -> Result<()> {
    let shard = Shard::open(shard_path)
        .with_context(|| format!("failed to open {}", shard_path.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for hexkey in keys {
        let key = hex::decode(hexkey).with_context(|| format!("invalid hex key: {hexkey}"))?;
        let object = shard.lookup(&key)?;
        out.write_all(object)?;
    }
    Ok(())
}
