use crate::cells;
use crate::error::Result;
use crate::ring::{Ring, RingInfo};
use ringlog_frame::HeapLayout;
use std::sync::atomic::AtomicU8;

/// A ring of framed messages in a heap allocation.
///
/// Frames use [`HeapLayout`]: `[size:8][previous:8][sequence:8][payload]`.
/// Nothing survives the process.
pub struct HeapStore {
    cells: Box<[AtomicU8]>,
    ring: Ring<HeapLayout>,
}

impl HeapStore {
    /// Creates an empty store of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: cells::zeroed(capacity),
            ring: Ring::new(capacity),
        }
    }

    /// Appends `payload` under `sequence`.
    ///
    /// Must only be called from one thread at a time. Registered handlers run
    /// on the calling thread before this returns.
    ///
    /// # Errors
    /// [`StoreError::FrameTooLarge`](crate::StoreError::FrameTooLarge) if the
    /// 24 byte header plus payload exceeds the capacity.
    #[inline]
    pub fn insert(&self, payload: &[u8], sequence: i64) -> Result<()> {
        self.ring.insert(&self.cells, payload, sequence)
    }

    /// Returns a copy of the payload stored under `sequence`, or `None` if it
    /// was never inserted or has been overwritten.
    #[inline]
    pub fn get(&self, sequence: i64) -> Option<Vec<u8>> {
        self.ring.get(&self.cells, sequence)
    }

    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8], i64) + Send + Sync + 'static,
    {
        self.ring.listeners().register(handler);
    }

    pub fn last_number(&self) -> Option<i64> {
        self.ring.last_sequence(&self.cells)
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn info(&self) -> RingInfo {
        self.ring.info()
    }
}
