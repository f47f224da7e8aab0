//! Shard, a write-once, read-many on-disk container for opaque objects
//! addressed by fixed-length keys.
//!
//! A Shard packs a fixed set of `(key, object)` pairs into a single file: the
//! objects themselves, packed contiguously in insertion order; a dense index,
//! laid out in the slot order of a minimal perfect hash function (MPHF) built
//! over the key set; and the serialized MPHF itself. Once built, a Shard
//! supports O(1) random lookup of an object given its key, using one MPHF
//! evaluation, one fixed-size index read and one variable-size payload read,
//! no scans.
//!
//! Typical use: a content-addressed storage pipeline that shards a very large
//! object corpus across many such files, building each one once and then
//! serving lookups from many concurrent readers via a shared memory map.
//!
//! # Quick start
//!
//! ```rust
//! use shard::{ShardBuilder, Shard};
//! # use tempfile::tempdir;
//! # let dir = tempdir().unwrap();
//! # let path = dir.path().join("example.shard");
//!
//! let mut builder = ShardBuilder::open(&path, 2)?;
//! builder.write(&[0x41; 32], b"AAAA")?;
//! builder.write(&[0x42; 32], b"BBBB")?;
//! builder.finalize()?;
//!
//! let shard = Shard::open(&path)?;
//! assert_eq!(shard.lookup(&[0x41; 32])?, b"AAAA");
//! assert!(shard.lookup(&[0x43; 32]).is_err()); // never inserted
//! # Ok::<(), shard::ShardError>(())
//! ```
//!
//! # Lifecycle
//!
//! A Shard is immutable once finalized: there is no in-place update, deletion
//! or compaction, and no transactional API across multiple Shards. The format
//! targets little-endian hosts and is not required to be portable across
//! endiannesses.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod error;
pub mod format;
pub mod mphf;
pub mod reader;

pub use builder::ShardBuilder;
pub use error::{ShardError, ShardResult};
pub use format::{Header, IndexEntry, FORMAT_VERSION, INDEX_ENTRY_SIZE, KEY_LEN};
pub use reader::{Iter, Shard};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_with_public_api_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shard");

        let mut builder = ShardBuilder::open(&path, 3).unwrap();
        builder.write(&[1; KEY_LEN], b"one").unwrap();
        builder.write(&[2; KEY_LEN], b"two").unwrap();
        builder.write(&[3; KEY_LEN], b"three").unwrap();
        builder.finalize().unwrap();

        let shard = Shard::open(&path).unwrap();
        assert_eq!(shard.key_len(), KEY_LEN);
        assert_eq!(shard.lookup(&[1; KEY_LEN]).unwrap(), b"one");
        assert_eq!(shard.size_of(&[2; KEY_LEN]).unwrap(), 3);
        assert_eq!(shard.header().version, FORMAT_VERSION);
        shard.close();
    }
}
