//! On-disk binary layout for a Shard file.
//!
//! A Shard is a single regular file containing, in order:
//!
//! ```text
//! [Header]          512 bytes, fixed offset 0
//! [Object region]    objects_size bytes, packed contiguously, insertion order
//! [Index region]     objects_count * INDEX_ENTRY_SIZE bytes, MPHF slot order
//! [Hash region]      serialized MPHF, runs to end of file
//! ```
//!
//! All multi-byte integers are little-endian; there are no varints. The header
//! is written last during a build so a crash mid-build leaves a file whose
//! header fails validation (see [`Header::validate`]) rather than one that
//! looks finalized but is actually truncated.
//!
//! # Safety
//!
//! [`Header`] and [`IndexEntry`] are `#[repr(C)]` and implement zerocopy's
//! `FromBytes`/`IntoBytes`, so they can be read directly out of a memory map
//! without an intermediate parsing or copying step. Every accessor that turns
//! raw bytes into one of these types goes through [`Header::validate`] (for
//! the header) or a bounds check against the file length (for index entries)
//! before the bytes are trusted.

use crate::error::{ShardError, ShardResult};
use std::path::Path;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Length in bytes of every key stored in a Shard.
///
/// Frozen at compile time for a given deployment; the header does not record
/// it, so Shards built with a different `KEY_LEN` are simply incompatible.
pub const KEY_LEN: usize = 32;

/// A fixed-width opaque key.
pub type KeyBytes = [u8; KEY_LEN];

/// Magic bytes identifying a Shard file.
pub const MAGIC: [u8; 4] = *b"SHRD";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Fixed size of the header region, at offset 0.
pub const HEADER_SIZE: usize = 512;

/// Fixed size of one index entry: `key (KEY_LEN) + object_offset (8) + object_size (8)`.
pub const INDEX_ENTRY_SIZE: usize = KEY_LEN + 16;

/// Implementation-defined ceiling on `objects_count`, to keep `index_size`
/// arithmetic (`objects_count * INDEX_ENTRY_SIZE`) comfortably inside `u64`.
pub const MAX_OBJECTS: u64 = 1 << 40;

const RESERVED_SIZE: usize = HEADER_SIZE - 4 - 4 - 8 * 6;

/// Fixed 512-byte Shard header, written last during a build.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Header {
    /// Magic bytes, `b"SHRD"`.
    pub magic: [u8; 4],
    /// Format version; currently always 1.
    pub version: u32,
    /// Number of `(key, object)` pairs stored.
    pub objects_count: u64,
    /// Byte offset of the first object payload. Always [`HEADER_SIZE`].
    pub objects_position: u64,
    /// Total bytes occupied by object payloads.
    pub objects_size: u64,
    /// Byte offset of the index region.
    pub index_position: u64,
    /// Byte size of the index region (`objects_count * INDEX_ENTRY_SIZE`).
    pub index_size: u64,
    /// Byte offset of the serialized MPHF.
    pub hash_position: u64,
    reserved: [u8; RESERVED_SIZE],
}

const _: () = assert!(std::mem::size_of::<Header>() == HEADER_SIZE);

impl Header {
    /// Build the header for a finalized Shard with `objects_count` objects and
    /// `objects_size` bytes of payload. Derives `index_position`, `index_size`
    /// and `hash_position` from the invariants in the module documentation.
    pub fn new(objects_count: u64, objects_size: u64) -> Self {
        let objects_position = HEADER_SIZE as u64;
        let index_position = objects_position + objects_size;
        let index_size = objects_count * INDEX_ENTRY_SIZE as u64;
        let hash_position = index_position + index_size;
        Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            objects_count,
            objects_position,
            objects_size,
            index_position,
            index_size,
            hash_position,
            reserved: [0u8; RESERVED_SIZE],
        }
    }

    /// Parse a header out of the first [`HEADER_SIZE`] bytes of a Shard file.
    pub fn parse(path: &Path, bytes: &[u8]) -> ShardResult<Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(ShardError::BadFormat(
                path.to_path_buf(),
                format!(
                    "file too small to contain a header: {} bytes (need {})",
                    bytes.len(),
                    HEADER_SIZE
                ),
            ));
        }
        Header::read_from_bytes(&bytes[..HEADER_SIZE]).map_err(|_| {
            ShardError::BadFormat(path.to_path_buf(), "malformed header".to_string())
        })
    }

    /// Check every invariant a finalized header must satisfy against the
    /// total size of the file it came from.
    pub fn validate(&self, path: &Path, file_len: u64) -> ShardResult<()> {
        let bad = |detail: String| ShardError::BadFormat(path.to_path_buf(), detail);

        if self.magic != MAGIC {
            return Err(bad(format!(
                "bad magic: expected {:?}, got {:?}",
                MAGIC, self.magic
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(bad(format!(
                "unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        if self.objects_position != HEADER_SIZE as u64 {
            return Err(bad(format!(
                "objects_position is {}, expected {}",
                self.objects_position, HEADER_SIZE
            )));
        }
        if self.objects_count > MAX_OBJECTS {
            return Err(bad(format!(
                "objects_count {} exceeds limit {}",
                self.objects_count, MAX_OBJECTS
            )));
        }
        let expected_index_position = self.objects_position + self.objects_size;
        if self.index_position != expected_index_position {
            return Err(bad(format!(
                "index_position {} does not follow the object region (expected {})",
                self.index_position, expected_index_position
            )));
        }
        let expected_index_size = self.objects_count * INDEX_ENTRY_SIZE as u64;
        if self.index_size != expected_index_size {
            return Err(bad(format!(
                "index_size {} does not match objects_count * {} (expected {})",
                self.index_size, INDEX_ENTRY_SIZE, expected_index_size
            )));
        }
        let expected_hash_position = self.index_position + self.index_size;
        if self.hash_position != expected_hash_position {
            return Err(bad(format!(
                "hash_position {} does not follow the index region (expected {})",
                self.hash_position, expected_hash_position
            )));
        }
        if self.hash_position > file_len {
            return Err(bad(format!(
                "hash region starts at {} past end of file ({} bytes)",
                self.hash_position, file_len
            )));
        }
        Ok(())
    }
}

/// One fixed-width record in the index region: the stored key together with
/// where and how large its object payload is.
///
/// Entries are laid out in MPHF slot order: slot `i` holds the entry for the
/// unique key `k` with `mphf(k) == i`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IndexEntry {
    /// The key this entry was built for.
    pub key: KeyBytes,
    /// Byte offset of the object payload, relative to the start of the file.
    pub object_offset: u64,
    /// Byte length of the object payload.
    pub object_size: u64,
}

const _: () = assert!(std::mem::size_of::<IndexEntry>() == INDEX_ENTRY_SIZE);

impl IndexEntry {
    /// Parse one index entry out of a byte slice at least [`INDEX_ENTRY_SIZE`] long.
    pub fn parse(bytes: &[u8]) -> Option<IndexEntry> {
        IndexEntry::read_from_bytes(bytes.get(..INDEX_ENTRY_SIZE)?).ok()
    }
}
