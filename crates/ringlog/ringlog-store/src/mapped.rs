//! Ring store persisted in a memory-mapped file.
//!
//! # File Format
//!
//! The file is exactly `capacity` bytes of frames in [`MappedLayout`], with
//! no separate header or footer:
//!
//! ```text
//! ┌──────────────────────┬──────────────────────┬──────────┬───────────┐
//! │ frame 0              │ frame 1              │ SENTINEL │ stale ... │
//! │ seq│prev│size│bytes  │ seq│prev│size│bytes  │ (8B)     │           │
//! └──────────────────────┴──────────────────────┴──────────┴───────────┘
//! ```
//!
//! Every insert writes [`SENTINEL_SEQUENCE`] right after its frame. A new
//! file starts with a sentinel at offset 0. Reopening scans forward from
//! offset 0 until the first sentinel; the frame before it is the newest.
//! Nothing else is persisted, so the scan is linear in the number of frames
//! written since the last wrap.

use crate::cells;
use crate::error::{Result, StoreError};
use crate::ring::{Ring, RingInfo};
use ringlog_frame::{FrameHeader, FrameLayout, MappedLayout, NO_PREVIOUS, SENTINEL_SEQUENCE};
use ringlog_mmap::{MmapFileMut, Opened};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU8;
use tracing::{info, warn};

/// Smallest ring that can hold an empty frame and its sentinel.
const MIN_CAPACITY: usize = MappedLayout::HEADER_LEN + MappedLayout::TRAILER_LEN;

/// A ring of framed messages backed by a memory-mapped file.
///
/// Single process, single writer. Dropping the store (or calling
/// [`MappedStore::close`]) releases the mapping before the file.
pub struct MappedStore {
    /// Start of the mapping owned by `mm`.
    base: *mut u8,
    ring: Ring<MappedLayout>,
    name: String,
    path: PathBuf,
    mm: MmapFileMut,
}

// SAFETY: `base` points into the mapping owned by `mm`, which lives exactly as
// long as the store. All access to the mapped bytes goes through
// `&[AtomicU8]`, so sharing the store across threads cannot race.
unsafe impl Send for MappedStore {}
unsafe impl Sync for MappedStore {}

impl MappedStore {
    /// Opens the store at `location`, creating it if the file does not exist.
    ///
    /// A new file is sized to `capacity` and marked empty. An existing file
    /// must be exactly `capacity` bytes; its write position is recovered by
    /// scanning for the sentinel.
    ///
    /// `name` is a logical label for the mapping, used in logs.
    ///
    /// # Errors
    /// - [`StoreError::CapacityTooSmall`] below 28 bytes
    /// - [`StoreError::Io`] if the file can't be created, opened or mapped
    /// - [`StoreError::SizeMismatch`] if an existing file has another length
    pub fn open<P: AsRef<Path>>(capacity: usize, location: P, name: &str) -> Result<Self> {
        check_capacity(capacity)?;
        let path = location.as_ref().to_path_buf();
        let (mm, opened) = MmapFileMut::open_or_create(&path, capacity as u64, mark_empty)
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        if mm.len() != capacity {
            return Err(StoreError::SizeMismatch {
                path,
                expected: capacity,
                actual: mm.len(),
            });
        }

        match opened {
            Opened::Created => Ok(Self::fresh(mm, capacity, path, name)),
            Opened::Existing => Ok(Self::recover(mm, capacity, path, name)),
        }
    }

    /// Creates an empty store at `location`, discarding any existing file.
    pub fn create<P: AsRef<Path>>(capacity: usize, location: P, name: &str) -> Result<Self> {
        check_capacity(capacity)?;
        let path = location.as_ref().to_path_buf();
        let mm = MmapFileMut::create_rw(&path, capacity as u64, mark_empty).map_err(|source| {
            StoreError::Io {
                path: path.clone(),
                source,
            }
        })?;
        Ok(Self::fresh(mm, capacity, path, name))
    }

    fn assemble(mut mm: MmapFileMut, ring: Ring<MappedLayout>, path: PathBuf, name: &str) -> Self {
        let base = mm.as_mut_ptr();
        Self {
            base,
            ring,
            name: name.to_string(),
            path,
            mm,
        }
    }

    /// The file was marked empty by [`mark_empty`] before it was moved into
    /// place.
    fn fresh(mm: MmapFileMut, capacity: usize, path: PathBuf, name: &str) -> Self {
        let store = Self::assemble(mm, Ring::new(capacity), path, name);
        info!(store = name, path = %store.path.display(), capacity, "created mapped store");
        store
    }

    fn recover(mm: MmapFileMut, capacity: usize, path: PathBuf, name: &str) -> Self {
        let mut store = Self::assemble(mm, Ring::new(capacity), path, name);
        let scan = scan_to_sentinel(store.cells());

        if !scan.found_sentinel {
            warn!(
                store = name,
                path = %store.path.display(),
                end = scan.end,
                frames = scan.frames,
                "no sentinel found, truncating after last complete frame"
            );
            write_sentinel(store.cells(), scan.end);
        }

        let current = scan.last.map_or(NO_PREVIOUS, |at| at as u64);
        store.ring = Ring::resume(capacity, current, scan.end);
        info!(
            store = name,
            path = %store.path.display(),
            capacity,
            frames = scan.frames,
            last_number = ?store.last_number(),
            "recovered mapped store"
        );
        store
    }

    #[inline]
    fn cells(&self) -> &[AtomicU8] {
        // SAFETY: `base` is the start of a live mapping of `capacity` bytes
        // (checked in `open`), and AtomicU8 has the same layout as u8.
        unsafe { std::slice::from_raw_parts(self.base as *const AtomicU8, self.ring.capacity()) }
    }

    /// Appends `payload` under `sequence`, followed by the sentinel.
    ///
    /// Must only be called from one thread at a time.
    ///
    /// # Errors
    /// - [`StoreError::FrameTooLarge`] if header, payload and sentinel exceed
    ///   the capacity
    /// - [`StoreError::ReservedSequence`] for [`SENTINEL_SEQUENCE`]
    #[inline]
    pub fn insert(&self, payload: &[u8], sequence: i64) -> Result<()> {
        self.ring.insert(self.cells(), payload, sequence)
    }

    #[inline]
    pub fn get(&self, sequence: i64) -> Option<Vec<u8>> {
        self.ring.get(self.cells(), sequence)
    }

    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8], i64) + Send + Sync + 'static,
    {
        self.ring.listeners().register(handler);
    }

    /// Sequence number of the newest frame, `None` while empty.
    pub fn last_number(&self) -> Option<i64> {
        self.ring.last_sequence(self.cells())
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> RingInfo {
        self.ring.info()
    }

    /// Writes dirty pages back to the file.
    pub fn flush(&self) -> Result<()> {
        self.mm.flush().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Flushes, then releases the mapping and the file, in that order.
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity < MIN_CAPACITY {
        return Err(StoreError::CapacityTooSmall {
            capacity,
            min: MIN_CAPACITY,
        });
    }
    Ok(())
}

/// Writes the sentinel at offset 0 of a new, still private file.
fn mark_empty(bytes: &mut [u8]) {
    MappedLayout::put_trailer(&mut bytes[..MappedLayout::TRAILER_LEN]);
}

fn write_sentinel(cells: &[AtomicU8], at: usize) {
    let mut raw = [0u8; MappedLayout::TRAILER_LEN];
    MappedLayout::put_trailer(&mut raw);
    cells::store(cells, at, &raw);
}

fn is_sentinel_at(cells: &[AtomicU8], at: usize) -> bool {
    let mut raw = [0u8; 8];
    cells::load_into(cells, at, &mut raw) && i64::from_le_bytes(raw) == SENTINEL_SEQUENCE
}

/// What an all-zero header decodes to.
const BLANK_HEADER: FrameHeader = FrameHeader {
    payload_len: 0,
    previous_offset: 0,
    sequence: 0,
};

/// Outcome of the forward scan over a reopened file.
#[derive(Debug, PartialEq, Eq)]
struct Scan {
    /// Offset of the newest complete frame.
    last: Option<usize>,
    /// Offset just past it, where the next frame goes.
    end: usize,
    frames: usize,
    found_sentinel: bool,
}

/// Walks frames forward from offset 0 until the sentinel.
///
/// Offsets strictly increase, so this terminates. The scan ends early,
/// without a sentinel, at the first frame that:
/// - would run past the end of the file or leave no room for its sentinel
/// - does not link back to the frame before it
/// - is blank (all-zero header) and not followed by a sentinel
///
/// Zero-filled space decodes as an endless run of blank frames, so the last
/// rule keeps a file that never held a sentinel from reading as data.
fn scan_to_sentinel(cells: &[AtomicU8]) -> Scan {
    let mut scan = Scan {
        last: None,
        end: 0,
        frames: 0,
        found_sentinel: false,
    };
    loop {
        // The sentinel overlays the sequence field and may sit closer to the
        // end of the file than a full header would fit.
        if is_sentinel_at(cells, scan.end) {
            scan.found_sentinel = true;
            return scan;
        }
        let Some(header) = Ring::<MappedLayout>::header_at(cells, scan.end) else {
            return scan;
        };
        let next = usize::try_from(header.frame_len::<MappedLayout>())
            .ok()
            .and_then(|len| scan.end.checked_add(len))
            .filter(|&next| next.saturating_add(MappedLayout::TRAILER_LEN) <= cells.len());
        let Some(next) = next else {
            return scan;
        };
        if scan
            .last
            .is_some_and(|last| header.previous_offset != last as u64)
        {
            return scan;
        }
        if header == BLANK_HEADER && !is_sentinel_at(cells, next) {
            return scan;
        }
        scan.last = Some(scan.end);
        scan.end = next;
        scan.frames += 1;
    }
}
