//! Minimal perfect hash function over a Shard's key set.
//!
//! Wraps [`boomphf::Mphf`], a parallel, space-efficient (~2-3 bits/key) MPHF
//! construction already used elsewhere in this codebase for the same purpose
//! (see the literal-pattern hash table). The wrapper's job is narrow: build a
//! bijection over a known, duplicate-free key set, persist it with `bincode`,
//! and evaluate it defensively against keys that may not belong to that set.

use crate::error::{ShardError, ShardResult};
use crate::format::KeyBytes;
use boomphf::Mphf;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::panic;

/// Space/time tradeoff passed to `boomphf`. Lower values build a denser (and
/// slower to construct) function; 1.7 is `boomphf`'s own suggested default
/// for a reasonable space/build-time balance.
const GAMMA: f64 = 1.7;

/// A minimal perfect hash function over the keys of one Shard.
pub struct ShardMphf {
    inner: Mphf<KeyBytes>,
}

impl ShardMphf {
    /// Build an MPHF over `keys`. Fails with [`ShardError::DuplicateKey`] if
    /// `keys` contains a repeated entry; a minimal perfect hash is only
    /// defined over a set of distinct keys.
    pub fn build(keys: &[KeyBytes]) -> ShardResult<ShardMphf> {
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if !seen.insert(*key) {
                return Err(ShardError::DuplicateKey);
            }
        }
        let inner = Mphf::new_parallel(GAMMA, keys, None);
        Ok(ShardMphf { inner })
    }

    /// Evaluate the function against `key`, returning a slot in `[0, n)` when
    /// `key` was part of the build set.
    ///
    /// For a key outside the original set, `boomphf` is free to return any
    /// value in range, or in practice to panic while walking its internal
    /// levels; either way this method returns *some* slot in `[0, n)` rather
    /// than propagating a panic. Correctness is re-established by the caller
    /// comparing the stored key at the resolved slot against `key`.
    pub fn eval(&self, key: &KeyBytes) -> u64 {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| self.inner.hash(key))) {
            Ok(slot) => slot,
            Err(_) => 0,
        }
    }

    /// Serialize the function to `writer` (used to write the hash region).
    pub fn serialize_into<W: Write>(&self, writer: W) -> ShardResult<()> {
        bincode::serialize_into(writer, &self.inner)
            .map_err(|e| ShardError::Internal(format!("failed to serialize mphf: {e}")))
    }

    /// Deserialize a function previously written by [`ShardMphf::serialize_into`].
    pub fn deserialize_from<R: Read>(reader: R) -> ShardResult<ShardMphf> {
        let inner = bincode::deserialize_from(reader)
            .map_err(|e| ShardError::Internal(format!("failed to deserialize mphf: {e}")))?;
        Ok(ShardMphf { inner })
    }
}
