//! Two-phase Shard construction: stream objects, then freeze an index.
use crate::error::{ShardError, ShardResult};
use crate::format::{Header, IndexEntry, KeyBytes, HEADER_SIZE, INDEX_ENTRY_SIZE, KEY_LEN};
use crate::mphf::ShardMphf;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use zerocopy::IntoBytes;

/// Streams `(key, object)` pairs to a new Shard file and freezes them into a
/// minimal-perfect-hash-indexed container on [`ShardBuilder::finalize`].
///
/// Single-threaded, single-use: write everything, then finalize exactly once.
/// Dropping a Builder that never reached a successful `finalize` deletes the
/// partial file, so a build interrupted by an error (or simply abandoned)
/// never leaves a half-written Shard lying around.
pub struct ShardBuilder {
    path: PathBuf,
    file: Option<File>,
    object_count: u64,
    cursor: u64,
    entries: Vec<(KeyBytes, u64, u64)>,
    finalized: bool,
}

impl ShardBuilder {
    /// Create the target file (truncating it if it already exists), reserve
    /// the header region, and prepare to accept exactly `object_count` writes.
    pub fn open<P: AsRef<Path>>(path: P, object_count: u64) -> ShardResult<ShardBuilder> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(|e| ShardError::from_io(&path, e))?;
        file.write_all(&[0u8; HEADER_SIZE])
            .map_err(|e| ShardError::from_io(&path, e))?;
        Ok(ShardBuilder {
            path,
            file: Some(file),
            object_count,
            cursor: HEADER_SIZE as u64,
            entries: Vec::with_capacity(object_count as usize),
            finalized: false,
        })
    }

    /// Append `object` at the current write cursor and record `key` as its
    /// address. `key` must be exactly [`KEY_LEN`] bytes.
    pub fn write(&mut self, key: &[u8], object: &[u8]) -> ShardResult<()> {
        if key.len() != KEY_LEN {
            return Err(ShardError::BadKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            });
        }
        if self.entries.len() as u64 >= self.object_count {
            return Err(ShardError::TooManyObjects);
        }

        let file = self
            .file
            .as_mut()
            .expect("ShardBuilder::write called after finalize/abort");
        file.write_all(object)
            .map_err(|e| ShardError::from_io(&self.path, e))?;

        let mut stored_key = [0u8; KEY_LEN];
        stored_key.copy_from_slice(key);
        self.entries.push((stored_key, self.cursor, object.len() as u64));
        self.cursor += object.len() as u64;
        Ok(())
    }

    /// Number of objects written so far.
    pub fn written_count(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Build the MPHF, write the index and hash regions, and patch in the
    /// header last. Consumes the Builder so it cannot be written to or
    /// finalized a second time.
    pub fn finalize(mut self) -> ShardResult<()> {
        if self.entries.len() as u64 != self.object_count {
            return Err(ShardError::CountMismatch {
                declared: self.object_count,
                written: self.entries.len() as u64,
            });
        }

        let mut file = self
            .file
            .take()
            .expect("ShardBuilder::finalize called twice");
        let objects_size = self.cursor - HEADER_SIZE as u64;
        let n = self.entries.len();

        eprintln!(
            "[shard] building minimal perfect hash for {} objects ({} threads available)...",
            n,
            rayon::current_num_threads()
        );
        let start = Instant::now();
        let keys: Vec<KeyBytes> = self.entries.iter().map(|(k, _, _)| *k).collect();
        let mphf = ShardMphf::build(&keys)?;
        eprintln!("[shard] mphf built in {:?}", start.elapsed());

        let mut slots: Vec<Option<IndexEntry>> = vec![None; n];
        for (key, offset, size) in &self.entries {
            let slot = mphf.eval(key) as usize;
            if slot >= n {
                return Err(ShardError::Internal(format!(
                    "mphf produced out-of-range slot {slot} for {n} objects"
                )));
            }
            if slots[slot].is_some() {
                return Err(ShardError::Internal(format!(
                    "mphf collision: two keys mapped to slot {slot}"
                )));
            }
            slots[slot] = Some(IndexEntry {
                key: *key,
                object_offset: *offset,
                object_size: *size,
            });
        }

        let index_position = HEADER_SIZE as u64 + objects_size;
        for (slot, entry) in slots.into_iter().enumerate() {
            let entry = entry.ok_or_else(|| {
                ShardError::Internal(format!(
                    "mphf left slot {slot} unfilled: not a bijection over {n} keys"
                ))
            })?;
            file.write_all(entry.as_bytes())
                .map_err(|e| ShardError::from_io(&self.path, e))?;
        }

        let index_size = n as u64 * INDEX_ENTRY_SIZE as u64;
        mphf.serialize_into(&mut file)?;

        let header = Header::new(n as u64, objects_size);
        debug_assert_eq!(header.index_position, index_position);
        debug_assert_eq!(header.index_size, index_size);

        file.seek(SeekFrom::Start(0))
            .map_err(|e| ShardError::from_io(&self.path, e))?;
        file.write_all(header.as_bytes())
            .map_err(|e| ShardError::from_io(&self.path, e))?;
        file.flush().map_err(|e| ShardError::from_io(&self.path, e))?;

        self.finalized = true;
        Ok(())
    }

    /// Explicitly abandon the build. Equivalent to dropping the Builder: the
    /// partial file is deleted. Provided for call sites that want to make the
    /// abandonment visible rather than relying on scope exit.
    pub fn abort(self) {}
}

impl Drop for ShardBuilder {
    fn drop(&mut self) {
        if !self.finalized {
            self.file.take();
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Shard;
    use tempfile::tempdir;

    fn key(byte: u8) -> [u8; KEY_LEN] {
        [byte; KEY_LEN]
    }

    #[test]
    fn write_rejects_wrong_key_length() {
        let dir = tempdir().unwrap();
        let mut builder = ShardBuilder::open(dir.path().join("shard"), 1).unwrap();
        let err = builder.write(b"A", b"AAAA").unwrap_err();
        assert!(matches!(
            err,
            ShardError::BadKeyLength {
                expected: 32,
                actual: 1
            }
        ));
    }

    #[test]
    fn write_rejects_past_declared_count() {
        let dir = tempdir().unwrap();
        let mut builder = ShardBuilder::open(dir.path().join("shard"), 1).unwrap();
        builder.write(&key(b'A'), b"AAAA").unwrap();
        let err = builder.write(&key(b'B'), b"BBBB").unwrap_err();
        assert!(matches!(err, ShardError::TooManyObjects));
    }

    #[test]
    fn finalize_rejects_count_mismatch() {
        let dir = tempdir().unwrap();
        let mut builder = ShardBuilder::open(dir.path().join("shard"), 2).unwrap();
        builder.write(&key(b'A'), b"AAAA").unwrap();
        let err = builder.finalize().unwrap_err();
        assert!(matches!(
            err,
            ShardError::CountMismatch {
                declared: 2,
                written: 1
            }
        ));
    }

    #[test]
    fn finalize_rejects_duplicate_keys() {
        let dir = tempdir().unwrap();
        let mut builder = ShardBuilder::open(dir.path().join("shard"), 2).unwrap();
        builder.write(&key(b'A'), b"AAAA").unwrap();
        builder.write(&key(b'A'), b"AAAA").unwrap();
        let err = builder.finalize().unwrap_err();
        assert!(matches!(err, ShardError::DuplicateKey));
    }

    #[test]
    fn dropping_an_unfinalized_builder_deletes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shard");
        {
            let mut builder = ShardBuilder::open(&path, 1).unwrap();
            builder.write(&key(b'A'), b"AAAA").unwrap();
            // builder dropped here without finalize()
        }
        assert!(!path.exists());
    }

    #[test]
    fn finalized_file_survives_and_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shard");
        let mut builder = ShardBuilder::open(&path, 2).unwrap();
        builder.write(&key(b'A'), b"AAAA").unwrap();
        builder.write(&key(b'B'), b"BBBB").unwrap();
        builder.finalize().unwrap();

        assert!(path.exists());
        let shard = Shard::open(&path).unwrap();
        assert_eq!(shard.header().objects_count, 2);
    }
}
