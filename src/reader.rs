//! Memory-mapped, read-only access to a finalized Shard.
use crate::error::{ShardError, ShardResult};
use crate::format::{Header, IndexEntry, KeyBytes, INDEX_ENTRY_SIZE, KEY_LEN};
use crate::mphf::ShardMphf;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// An opened, validated Shard file.
///
/// Backed by a shared read-only memory map: any number of threads may call
/// [`Shard::lookup`], [`Shard::size_of`], [`Shard::iter`] and [`Shard::header`]
/// concurrently, since there is no mutable state on the read path after `open`.
pub struct Shard {
    path: PathBuf,
    mmap: Mmap,
    header: Header,
    mphf: ShardMphf,
}

impl Shard {
    /// Open `path` read-only, validate its header, and load the MPHF region.
    pub fn open<P: AsRef<Path>>(path: P) -> ShardResult<Shard> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ShardError::from_io(&path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| ShardError::from_io(&path, e))?;

        let header = Header::parse(&path, &mmap)?;
        header.validate(&path, mmap.len() as u64)?;

        let hash_bytes = &mmap[header.hash_position as usize..];
        let mphf = ShardMphf::deserialize_from(hash_bytes).map_err(|e| {
            ShardError::BadFormat(path.clone(), format!("invalid mphf region: {e}"))
        })?;

        Ok(Shard {
            path,
            mmap,
            header,
            mphf,
        })
    }

    /// Length in bytes of every key in this Shard (always [`KEY_LEN`]).
    pub fn key_len(&self) -> usize {
        KEY_LEN
    }

    /// The path this Shard was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The validated header, for diagnostics.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Iterate over every stored key exactly once, in MPHF slot order (the
    /// permutation the MPHF assigned to the Builder's insertion order, not
    /// insertion order itself).
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            shard: self,
            slot: 0,
        }
    }

    /// Resolve `key` to its index entry, or fail per the resolution algorithm
    /// in the module documentation: MPHF query, bounds check, stored-key
    /// equality check (this is what turns a query for an absent key into a
    /// reliable [`ShardError::NotFound`] rather than a wrong answer), and
    /// finally an offset/size sanity check against the object region.
    fn resolve(&self, key: &[u8]) -> ShardResult<IndexEntry> {
        if key.len() != KEY_LEN {
            return Err(ShardError::BadKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }
        let mut query = [0u8; KEY_LEN];
        query.copy_from_slice(key);

        let slot = self.mphf.eval(&query);
        if slot >= self.header.objects_count {
            return Err(ShardError::BadFormat(
                self.path.clone(),
                format!(
                    "mphf produced slot {slot} outside objects_count {}",
                    self.header.objects_count
                ),
            ));
        }

        let entry_offset = self.header.index_position as usize + slot as usize * INDEX_ENTRY_SIZE;
        let entry_bytes = self
            .mmap
            .get(entry_offset..entry_offset + INDEX_ENTRY_SIZE)
            .ok_or_else(|| {
                ShardError::BadFormat(self.path.clone(), "index entry out of bounds".to_string())
            })?;
        let entry = IndexEntry::parse(entry_bytes).ok_or_else(|| {
            ShardError::BadFormat(self.path.clone(), "malformed index entry".to_string())
        })?;

        if entry.key != query {
            return Err(ShardError::NotFound(self.path.clone()));
        }

        let region_start = self.header.objects_position;
        let region_end = self.header.objects_position + self.header.objects_size;
        let object_end = entry.object_offset.checked_add(entry.object_size);
        let in_bounds = matches!(object_end, Some(end) if entry.object_offset >= region_start && end <= region_end);
        if !in_bounds {
            return Err(ShardError::BadFormat(
                self.path.clone(),
                "corrupted object size in index entry".to_string(),
            ));
        }

        Ok(entry)
    }

    /// Size in bytes of the object stored under `key`.
    pub fn size_of(&self, key: &[u8]) -> ShardResult<u64> {
        Ok(self.resolve(key)?.object_size)
    }

    /// Look up the object stored under `key`. The returned slice borrows
    /// directly from the memory map: no copy is made.
    pub fn lookup(&self, key: &[u8]) -> ShardResult<&[u8]> {
        let entry = self.resolve(key)?;
        let start = entry.object_offset as usize;
        let end = start + entry.object_size as usize;
        self.mmap.get(start..end).ok_or_else(|| {
            ShardError::BadFormat(
                self.path.clone(),
                "corrupted object size in index entry".to_string(),
            )
        })
    }

    /// Release the memory map. Equivalent to dropping the Shard.
    pub fn close(self) {}
}

/// Iterator over the keys stored in a [`Shard`], in MPHF slot order.
pub struct Iter<'a> {
    shard: &'a Shard,
    slot: u64,
}

impl<'a> Iterator for Iter<'a> {
    type Item = KeyBytes;

    fn next(&mut self) -> Option<KeyBytes> {
        if self.slot >= self.shard.header.objects_count {
            return None;
        }
        let offset =
            self.shard.header.index_position as usize + self.slot as usize * INDEX_ENTRY_SIZE;
        let entry = IndexEntry::parse(&self.shard.mmap[offset..offset + INDEX_ENTRY_SIZE])
            .expect("index region was validated on open");
        self.slot += 1;
        Some(entry.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.shard.header.objects_count - self.slot) as usize;
        (remaining, Some(remaining))
    }
}
