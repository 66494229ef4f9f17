//! Concrete header layouts.
//!
//! Callers always hand `put_header`/`get_header` a slice of exactly
//! `HEADER_LEN` bytes and `put_trailer` a slice of exactly `TRAILER_LEN`
//! bytes; the stores guarantee this through bounds-checked slicing, so the
//! fixed-size conversions below cannot fail.

use crate::{FrameHeader, SENTINEL_SEQUENCE};

/// Field order and widths of one frame header.
pub trait FrameLayout {
    const HEADER_LEN: usize;

    /// Bytes reserved after every frame for an end-of-data marker.
    const TRAILER_LEN: usize;

    /// Largest payload the size field can describe.
    const MAX_PAYLOAD_LEN: u64;

    fn put_header(header: &FrameHeader, out: &mut [u8]);

    fn get_header(raw: &[u8]) -> FrameHeader;

    fn put_trailer(_out: &mut [u8]) {}
}

/// Layout of the heap-backed store: `[size:8][previous:8][sequence:8]`.
#[derive(Debug, Clone, Copy)]
pub struct HeapLayout;

/// Layout of the mapped store: `[sequence:8][previous:8][size:4]`, followed
/// by an eight byte sentinel after the payload.
#[derive(Debug, Clone, Copy)]
pub struct MappedLayout;

impl FrameLayout for HeapLayout {
    const HEADER_LEN: usize = 24;
    const TRAILER_LEN: usize = 0;
    const MAX_PAYLOAD_LEN: u64 = u64::MAX;

    #[inline]
    fn put_header(header: &FrameHeader, out: &mut [u8]) {
        out[0..8].copy_from_slice(&header.payload_len.to_le_bytes());
        out[8..16].copy_from_slice(&header.previous_offset.to_le_bytes());
        out[16..24].copy_from_slice(&header.sequence.to_le_bytes());
    }

    #[inline]
    fn get_header(raw: &[u8]) -> FrameHeader {
        FrameHeader {
            payload_len: u64::from_le_bytes(le8(&raw[0..8])),
            previous_offset: u64::from_le_bytes(le8(&raw[8..16])),
            sequence: i64::from_le_bytes(le8(&raw[16..24])),
        }
    }
}

impl FrameLayout for MappedLayout {
    const HEADER_LEN: usize = 20;
    const TRAILER_LEN: usize = 8;
    const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64;

    #[inline]
    fn put_header(header: &FrameHeader, out: &mut [u8]) {
        out[0..8].copy_from_slice(&header.sequence.to_le_bytes());
        out[8..16].copy_from_slice(&header.previous_offset.to_le_bytes());
        // payload_len was range-checked against MAX_PAYLOAD_LEN on insert
        out[16..20].copy_from_slice(&(header.payload_len as u32).to_le_bytes());
    }

    #[inline]
    fn get_header(raw: &[u8]) -> FrameHeader {
        let mut size = [0u8; 4];
        size.copy_from_slice(&raw[16..20]);
        FrameHeader {
            sequence: i64::from_le_bytes(le8(&raw[0..8])),
            previous_offset: u64::from_le_bytes(le8(&raw[8..16])),
            payload_len: u32::from_le_bytes(size) as u64,
        }
    }

    #[inline]
    fn put_trailer(out: &mut [u8]) {
        out[0..8].copy_from_slice(&SENTINEL_SEQUENCE.to_le_bytes());
    }
}

#[inline(always)]
fn le8(raw: &[u8]) -> [u8; 8] {
    let mut b = [0u8; 8];
    b.copy_from_slice(raw);
    b
}
