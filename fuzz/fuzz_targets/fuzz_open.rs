#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

// Arbitrary bytes should never panic `Shard::open`: either the header
// validates and the rest of the file is a real Shard, or it doesn't and we
// get a `BadFormat`/`NotFound` error back.
fuzz_target!(|data: &[u8]| {
    let mut path = std::env::temp_dir();
    path.push(format!("shard-fuzz-open-{}.shard", std::process::id()));

    let mut file = match std::fs::File::create(&path) {
        Ok(f) => f,
        Err(_) => return,
    };
    if file.write_all(data).is_err() {
        return;
    }
    drop(file);

    let _ = shard::Shard::open(&path);
    let _ = std::fs::remove_file(&path);
});
