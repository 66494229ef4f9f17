use ringlog_frame::FrameError;
use std::{io, path::PathBuf};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("frame needs {frame_len} bytes but the ring holds {capacity}")]
    FrameTooLarge { frame_len: usize, capacity: usize },

    #[error("sequence number {0} is reserved as the end-of-data sentinel")]
    ReservedSequence(i64),

    #[error("capacity of {capacity} bytes is below the minimum of {min}")]
    CapacityTooSmall { capacity: usize, min: usize },

    #[error("'{}' is {actual} bytes, expected {expected}", .path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error on '{}'", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}
