#![no_main]
use libfuzzer_sys::fuzz_target;
use shard::{Shard, ShardBuilder, KEY_LEN};

// Carve the fuzz input into a handful of distinct (key, value) pairs, build a
// real Shard from them, then look up both the keys that were inserted and a
// query key derived from the input but never inserted. Neither path should
// panic, and present keys must round-trip.
fuzz_target!(|data: &[u8]| {
    if data.len() < KEY_LEN + 1 {
        return;
    }

    let chunk = KEY_LEN + 8;
    let pairs: Vec<(&[u8], &[u8])> = data
        .chunks(chunk)
        .filter(|c| c.len() == chunk)
        .take(32)
        .map(|c| (&c[..KEY_LEN], &c[KEY_LEN..]))
        .collect();
    if pairs.is_empty() {
        return;
    }

    let mut seen = std::collections::HashSet::new();
    let unique: Vec<(&[u8], &[u8])> = pairs
        .into_iter()
        .filter(|(k, _)| seen.insert(*k))
        .collect();

    let mut path = std::env::temp_dir();
    path.push(format!(
        "shard-fuzz-lookup-{}-{}.shard",
        std::process::id(),
        unique.len()
    ));

    let mut builder = match ShardBuilder::open(&path, unique.len() as u64) {
        Ok(b) => b,
        Err(_) => return,
    };
    for (key, value) in &unique {
        if builder.write(key, value).is_err() {
            return;
        }
    }
    if builder.finalize().is_err() {
        let _ = std::fs::remove_file(&path);
        return;
    }

    if let Ok(shard) = Shard::open(&path) {
        for (key, value) in &unique {
            match shard.lookup(key) {
                Ok(got) => assert_eq!(got, *value),
                Err(_) => panic!("lookup of an inserted key must not fail"),
            }
        }
        let absent = vec![0xFFu8; KEY_LEN];
        let _ = shard.lookup(&absent);
    }
    let _ = std::fs::remove_file(&path);
});
