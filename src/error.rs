//! Error types for the shard library.
use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias for shard operations.
pub type ShardResult<T> = std::result::Result<T, ShardError>;

/// Failure modes surfaced by [`crate::builder::ShardBuilder`] and [`crate::reader::Shard`].
///
/// Every variant that can be attributed to a specific file carries that file's
/// path, so a single log line is enough to identify the offending Shard.
#[derive(Debug)]
pub enum ShardError {
    /// The Shard file does not exist, or the requested key is not present in it.
    NotFound(PathBuf),

    /// A filesystem operation on the given path failed.
    Io(PathBuf, std::io::Error),

    /// A key passed to `write`/`lookup`/`size_of` was not exactly [`crate::format::KEY_LEN`] bytes.
    BadKeyLength {
        /// Expected key length.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// `write` was called after the declared `object_count` had already been written.
    TooManyObjects,

    /// `finalize` was called with fewer writes than the declared `object_count`.
    CountMismatch {
        /// Number of objects declared at `open` time.
        declared: u64,
        /// Number of objects actually written before `finalize`.
        written: u64,
    },

    /// Two identical keys were written to the same Builder.
    DuplicateKey,

    /// The Shard's on-disk layout is internally inconsistent (bad magic, truncated
    /// region, an index entry pointing outside the object region, ...).
    BadFormat(PathBuf, String),

    /// Something that should be structurally impossible happened (e.g. the MPHF
    /// produced an out-of-range slot, or two distinct keys collided on the same
    /// slot). Indicates a bug rather than bad input.
    Internal(String),
}

impl fmt::Display for ShardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardError::NotFound(path) => write!(f, "{}: not found", path.display()),
            ShardError::Io(path, cause) => write!(f, "{}: {}", path.display(), cause),
            ShardError::BadKeyLength { expected, actual } => write!(
                f,
                "bad key length: expected {} bytes, got {}",
                expected, actual
            ),
            ShardError::TooManyObjects => {
                write!(f, "too many objects written: exceeds declared object_count")
            }
            ShardError::CountMismatch { declared, written } => write!(
                f,
                "object count mismatch: declared {}, wrote {}",
                declared, written
            ),
            ShardError::DuplicateKey => write!(f, "duplicate key in shard build set"),
            ShardError::BadFormat(path, detail) => write!(f, "{}: {}", path.display(), detail),
            ShardError::Internal(detail) => write!(f, "internal error: {}", detail),
        }
    }
}

impl std::error::Error for ShardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShardError::Io(_, cause) => Some(cause),
            _ => None,
        }
    }
}

impl ShardError {
    /// Wrap a filesystem error with the path it happened on, mapping "file not
    /// found" to [`ShardError::NotFound`] rather than the generic `Io` variant.
    pub(crate) fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ShardError::NotFound(path.to_path_buf())
        } else {
            ShardError::Io(path.to_path_buf(), err)
        }
    }
}
