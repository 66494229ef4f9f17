use anyhow::Context;
use ringlog_config::RinglogConfig;
use ringlog_store::{MessageStore, RingStore};
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Appends each stdin line to the configured store as one message, numbering
/// them after the store's last sequence number, then looks up any numbers
/// given as arguments after the config path.
///
/// ```text
/// ringlog [config.toml] [seq...]
/// ```
fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RinglogConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => RinglogConfig::default(),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = RingStore::open(&config.store).context("failed to open store")?;

    let bytes = Arc::new(AtomicU64::new(0));
    {
        let bytes = Arc::clone(&bytes);
        store.register_handler(move |payload: &[u8], seq| {
            bytes.fetch_add(payload.len() as u64, Ordering::Relaxed);
            debug!(seq, len = payload.len(), "appended");
        });
    }

    let mut seq = store.last_number().map_or(0, |n| n + 1);
    let first = seq;
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        store.insert(line.as_bytes(), seq)?;
        seq += 1;
    }
    info!(
        messages = seq - first,
        bytes = bytes.load(Ordering::Relaxed),
        last_number = ?store.last_number(),
        "ingest complete"
    );

    for arg in args {
        let wanted: i64 = arg.parse().with_context(|| format!("not a sequence number: {arg}"))?;
        match store.get(wanted) {
            Some(payload) => println!("{wanted}\t{}", String::from_utf8_lossy(&payload)),
            None => println!("{wanted}\t<not found>"),
        }
    }

    store.close()?;
    Ok(())
}
