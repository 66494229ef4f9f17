//! Frame codec for the ringlog stores.
//!
//! A frame is one message record: three metadata fields followed by the
//! payload bytes. Two layouts exist, one per backend. Both are little-endian
//! and both carry the same metadata; they differ in field order and width.
//!
//! ```text
//! HeapLayout (24 byte header, no trailer)
//! ┌──────────────┬──────────────┬──────────────┬───────────────┐
//! │ size (u64)   │ previous(u64)│ sequence(i64)│ payload       │
//! └──────────────┴──────────────┴──────────────┴───────────────┘
//!
//! MappedLayout (20 byte header, 8 byte trailer)
//! ┌──────────────┬──────────────┬──────────┬─────────┬────────────────────┐
//! │ sequence(i64)│ previous(u64)│ size(u32)│ payload │ SENTINEL_SEQUENCE  │
//! └──────────────┴──────────────┴──────────┴─────────┴────────────────────┘
//! ```
//!
//! The trailer is not part of the frame: it occupies the first eight bytes
//! of where the *next* header will go, so in the mapped layout it overlays
//! that header's sequence field.

mod layout;

pub use layout::{FrameLayout, HeapLayout, MappedLayout};

/// Backward link value for the first frame ever written into a store.
pub const NO_PREVIOUS: u64 = u64::MAX;

/// Sequence number reserved to mark the logical end of written data.
pub const SENTINEL_SEQUENCE: i64 = i64::MIN;

/// Largest header any layout uses. Lets callers stage a header on the stack.
pub const MAX_HEADER_LEN: usize = 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("payload of {len} bytes exceeds the layout limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: u64 },
}

/// Decoded metadata of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_len: u64,
    pub previous_offset: u64,
    pub sequence: i64,
}

impl FrameHeader {
    /// The backward link, or `None` for the first frame of the store.
    #[inline]
    pub fn previous(&self) -> Option<u64> {
        (self.previous_offset != NO_PREVIOUS).then_some(self.previous_offset)
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.sequence == SENTINEL_SEQUENCE
    }

    /// Header plus payload, in bytes.
    #[inline]
    pub fn frame_len<L: FrameLayout>(&self) -> u64 {
        L::HEADER_LEN as u64 + self.payload_len
    }
}

/// Encodes a complete frame (header and payload, no trailer).
pub fn encode<L: FrameLayout>(
    sequence: i64,
    previous_offset: u64,
    payload: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let header = FrameHeader {
        payload_len: checked_payload_len::<L>(payload.len())?,
        previous_offset,
        sequence,
    };
    let mut out = vec![0u8; L::HEADER_LEN + payload.len()];
    L::put_header(&header, &mut out[..L::HEADER_LEN]);
    out[L::HEADER_LEN..].copy_from_slice(payload);
    Ok(out)
}

/// Decodes the header starting at `offset`.
pub fn decode_header<L: FrameLayout>(
    bytes: &[u8],
    offset: usize,
) -> Result<FrameHeader, FrameError> {
    let raw = slice_at(bytes, offset, L::HEADER_LEN)?;
    Ok(L::get_header(raw))
}

/// Returns the `size` payload bytes of the frame at `offset`.
pub fn decode_payload<L: FrameLayout>(
    bytes: &[u8],
    offset: usize,
    size: u64,
) -> Result<&[u8], FrameError> {
    let len = usize::try_from(size).map_err(|_| FrameError::OutOfBounds {
        offset,
        len: usize::MAX,
        available: bytes.len(),
    })?;
    slice_at(bytes, offset.saturating_add(L::HEADER_LEN), len)
}

/// Validates that `len` fits the layout's size field.
pub fn checked_payload_len<L: FrameLayout>(len: usize) -> Result<u64, FrameError> {
    let len64 = len as u64;
    if len64 > L::MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len,
            max: L::MAX_PAYLOAD_LEN,
        });
    }
    Ok(len64)
}

fn slice_at(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8], FrameError> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(FrameError::OutOfBounds {
            offset,
            len,
            available: bytes.len(),
        })
}
