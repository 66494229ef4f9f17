//! Insert and lookup over a ring of framed messages.
//!
//! Both backends run this code; they differ only in where the bytes live
//! and in the [`FrameLayout`] they use.
//!
//! # Insert
//! ```text
//!            write_cursor
//!                 │
//! ┌───────┬───────┼────────────────────────────┬───────┐
//! │ f(n-2)│ f(n-1)│ f(n) ...                   │ tail  │
//! └───────┴───────┴────────────────────────────┴───────┘
//! ```
//! A frame (plus the layout's trailer) that does not fit before the end of
//! the ring is written at offset 0 instead; the tail is abandoned for this
//! pass. The frame's bytes are written first, then `current` is published
//! with Release ordering, then the cursor advances.
//!
//! # Lookup
//! Start at `current` and follow backward links. Within one pass links
//! strictly decrease. The frame at offset 0 is the only one whose link may
//! point forward (to the last frame of the previous pass), and that jump is
//! taken at most once. After it, anything below the `floor` (the end of the
//! newest frame and its trailer) has been overwritten by the current pass.

use crate::cells;
use crate::error::{Result, StoreError};
use crate::listener::ListenerRegistry;
use ringlog_frame::{FrameHeader, FrameLayout, MAX_HEADER_LEN, NO_PREVIOUS, SENTINEL_SEQUENCE};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

/// Point-in-time view of a ring's cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingInfo {
    pub capacity: usize,
    /// Offset where the next frame goes (before any wrap decision).
    pub write_cursor: usize,
    /// Offset of the newest frame, `None` while empty.
    pub current_offset: Option<u64>,
}

pub(crate) struct Ring<L: FrameLayout> {
    capacity: usize,
    write_cursor: AtomicUsize,
    current: AtomicU64,
    listeners: ListenerRegistry,
    _layout: PhantomData<fn() -> L>,
}

impl<L: FrameLayout> Ring<L> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self::resume(capacity, NO_PREVIOUS, 0)
    }

    /// A ring whose newest frame sits at `current`, with the next frame to go
    /// at `write_cursor`.
    pub(crate) fn resume(capacity: usize, current: u64, write_cursor: usize) -> Self {
        debug_assert!(write_cursor <= capacity);
        Self {
            capacity,
            write_cursor: AtomicUsize::new(write_cursor),
            current: AtomicU64::new(current),
            listeners: ListenerRegistry::new(),
            _layout: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub(crate) fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub(crate) fn info(&self) -> RingInfo {
        let current = self.current.load(Ordering::Acquire);
        RingInfo {
            capacity: self.capacity,
            write_cursor: self.write_cursor.load(Ordering::Relaxed),
            current_offset: (current != NO_PREVIOUS).then_some(current),
        }
    }

    /// Layouts with a trailer reserve the sentinel value.
    #[inline]
    fn reserves_sentinel() -> bool {
        L::TRAILER_LEN > 0
    }

    /// Appends one frame. Single writer only.
    pub(crate) fn insert(&self, cells: &[AtomicU8], payload: &[u8], sequence: i64) -> Result<()> {
        if Self::reserves_sentinel() && sequence == SENTINEL_SEQUENCE {
            return Err(StoreError::ReservedSequence(sequence));
        }
        let payload_len = ringlog_frame::checked_payload_len::<L>(payload.len())?;
        let frame_len = L::HEADER_LEN + payload.len();
        let needed = frame_len + L::TRAILER_LEN;
        if needed > self.capacity {
            return Err(StoreError::FrameTooLarge {
                frame_len: needed,
                capacity: self.capacity,
            });
        }

        let mut at = self.write_cursor.load(Ordering::Relaxed);
        if needed > self.capacity - at {
            trace!(abandoned = self.capacity - at, sequence, "ring wrapped");
            at = 0;
        }

        let header = FrameHeader {
            payload_len,
            previous_offset: self.current.load(Ordering::Relaxed),
            sequence,
        };
        let mut raw = [0u8; MAX_HEADER_LEN];

        // Trailer and payload land before the header, so a torn insert never
        // leaves a header without the sentinel behind it.
        if Self::reserves_sentinel() {
            L::put_trailer(&mut raw[..L::TRAILER_LEN]);
            cells::store(cells, at + frame_len, &raw[..L::TRAILER_LEN]);
        }
        cells::store(cells, at + L::HEADER_LEN, payload);
        L::put_header(&header, &mut raw[..L::HEADER_LEN]);
        cells::store(cells, at, &raw[..L::HEADER_LEN]);

        self.current.store(at as u64, Ordering::Release);
        self.write_cursor.store(at + frame_len, Ordering::Relaxed);

        self.listeners.notify(payload, sequence);
        Ok(())
    }

    /// Looks up `sequence`, walking back from the newest frame.
    pub(crate) fn get(&self, cells: &[AtomicU8], sequence: i64) -> Option<Vec<u8>> {
        if Self::reserves_sentinel() && sequence == SENTINEL_SEQUENCE {
            return None;
        }
        let head = self.current.load(Ordering::Acquire);
        if head == NO_PREVIOUS {
            return None;
        }

        let mut pos = usize::try_from(head).ok()?;
        let mut header = Self::header_at(cells, pos)?;
        let floor = pos
            .checked_add(usize::try_from(header.frame_len::<L>()).ok()?)?
            .checked_add(L::TRAILER_LEN)?;
        let mut wrapped = false;

        loop {
            if header.sequence == sequence {
                let len = usize::try_from(header.payload_len).ok()?;
                return cells::load_vec(cells, pos.checked_add(L::HEADER_LEN)?, len);
            }

            let prev = usize::try_from(header.previous()?).ok()?;
            if prev >= pos {
                if pos != 0 || wrapped {
                    return None;
                }
                wrapped = true;
            }
            if wrapped && prev < floor {
                return None;
            }

            pos = prev;
            header = Self::header_at(cells, pos)?;
        }
    }

    /// Sequence number of the newest frame.
    pub(crate) fn last_sequence(&self, cells: &[AtomicU8]) -> Option<i64> {
        let head = self.current.load(Ordering::Acquire);
        if head == NO_PREVIOUS {
            return None;
        }
        Self::header_at(cells, usize::try_from(head).ok()?).map(|h| h.sequence)
    }

    /// Decodes the header at `pos`, or `None` if it does not fit.
    #[inline]
    pub(crate) fn header_at(cells: &[AtomicU8], pos: usize) -> Option<FrameHeader> {
        let mut raw = [0u8; MAX_HEADER_LEN];
        if !cells::load_into(cells, pos, &mut raw[..L::HEADER_LEN]) {
            return None;
        }
        ringlog_frame::decode_header::<L>(&raw[..L::HEADER_LEN], 0).ok()
    }
}
