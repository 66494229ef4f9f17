//! Byte access over shared ring memory.
//!
//! Ring bytes are `AtomicU8` so that the writer and any number of readers
//! can touch the same range without a data race. Relaxed per-byte access is
//! enough: the only ordering the stores promise comes from the Release store
//! and Acquire load of the published offset.

use std::sync::atomic::{AtomicU8, Ordering};

/// Allocates `len` zeroed cells.
pub(crate) fn zeroed(len: usize) -> Box<[AtomicU8]> {
    (0..len).map(|_| AtomicU8::new(0)).collect()
}

/// Writes `src` at `offset`.
///
/// # Panics
/// If the range is out of bounds. The writer sizes every write against the
/// ring capacity first, so reaching this is a bug in the caller.
#[inline]
pub(crate) fn store(cells: &[AtomicU8], offset: usize, src: &[u8]) {
    let dst = &cells[offset..offset + src.len()];
    for (cell, &b) in dst.iter().zip(src) {
        cell.store(b, Ordering::Relaxed);
    }
}

/// Copies `dst.len()` bytes starting at `offset` into `dst`.
///
/// Returns `false` without touching `dst` if the range is out of bounds.
#[inline]
pub(crate) fn load_into(cells: &[AtomicU8], offset: usize, dst: &mut [u8]) -> bool {
    let Some(src) = offset
        .checked_add(dst.len())
        .and_then(|end| cells.get(offset..end))
    else {
        return false;
    };
    for (b, cell) in dst.iter_mut().zip(src) {
        *b = cell.load(Ordering::Relaxed);
    }
    true
}

/// Copies `len` bytes starting at `offset` into a fresh vector.
pub(crate) fn load_vec(cells: &[AtomicU8], offset: usize, len: usize) -> Option<Vec<u8>> {
    let src = offset.checked_add(len).and_then(|end| cells.get(offset..end))?;
    Some(src.iter().map(|c| c.load(Ordering::Relaxed)).collect())
}
