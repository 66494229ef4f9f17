//! One writer wrapping a small ring as fast as it can while several readers
//! look up recent sequence numbers.
//!
//! Lookups are lock-free and frames carry no version, so a reader walking a
//! frame the writer is overwriting can decode a mix of two messages. These
//! tests do not assert that tearing happens (it depends on scheduling); they
//! count it, and assert that every lookup returns without panicking.
//!
//! ```bash
//! cargo test -p ringlog-store --test concurrent_wraparound -- --nocapture
//! ```

use ringlog_store::{HeapStore, MappedStore, MessageStore};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const MESSAGES: i64 = 200_000;
const READERS: usize = 4;

/// Payload for `seq`: its little-endian bytes repeated to a length that
/// varies with `seq`, so consecutive passes put frame boundaries in
/// different places.
fn payload_for(seq: i64) -> Vec<u8> {
    let len = 8 + (seq.rem_euclid(57)) as usize;
    seq.to_le_bytes().iter().copied().cycle().take(len).collect()
}

#[derive(Default, Debug)]
struct ReaderStats {
    hits: u64,
    misses: u64,
    torn: u64,
}

fn hammer<S: MessageStore>(store: &S, label: &str) {
    let done = AtomicBool::new(false);
    let start = Instant::now();

    let stats: Vec<ReaderStats> = std::thread::scope(|s| {
        let readers: Vec<_> = (0..READERS)
            .map(|r| {
                let done = &done;
                s.spawn(move || {
                    let mut stats = ReaderStats::default();
                    let mut back = r as i64;
                    loop {
                        // Checked before the lookup so the final pass runs
                        // against a quiescent ring.
                        let finished = done.load(Ordering::Acquire);
                        if let Some(last) = store.last_number() {
                            let target = if finished { last } else { last - back };
                            back = (back + 1) % 24;
                            match store.get(target) {
                                Some(p) if p == payload_for(target) => stats.hits += 1,
                                Some(_) => stats.torn += 1,
                                None => stats.misses += 1,
                            }
                        }
                        if finished {
                            return stats;
                        }
                        std::hint::spin_loop();
                    }
                })
            })
            .collect();

        for seq in 0..MESSAGES {
            store.insert(&payload_for(seq), seq).unwrap();
        }
        done.store(true, Ordering::Release);

        readers.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let hits: u64 = stats.iter().map(|s| s.hits).sum();
    let misses: u64 = stats.iter().map(|s| s.misses).sum();
    let torn: u64 = stats.iter().map(|s| s.torn).sum();
    log!(
        "[{label}] {MESSAGES} inserts in {:?}: {hits} hits, {misses} misses, {torn} torn reads",
        start.elapsed()
    );

    assert_eq!(store.last_number(), Some(MESSAGES - 1));
    assert_eq!(store.get(MESSAGES - 1), Some(payload_for(MESSAGES - 1)));
    assert!(hits > 0, "no reader ever found a message: {stats:?}");
}

#[test]
fn heap_readers_racing_a_wrapping_writer() {
    let store = HeapStore::new(1024);
    hammer(&store, "heap");
}

#[test]
fn mapped_readers_racing_a_wrapping_writer() {
    let dir = tempfile::tempdir().unwrap();
    let store = MappedStore::open(1024, dir.path().join("race.ring"), "race").unwrap();
    hammer(&store, "mapped");

    drop(store);
    let reopened = MappedStore::open(1024, dir.path().join("race.ring"), "race").unwrap();
    assert_eq!(reopened.last_number(), Some(MESSAGES - 1));
}
