//! Circular, sequence-numbered message stores.
//!
//! A store is a fixed number of bytes managed as a ring. One writer appends
//! framed messages; any number of threads look them up by sequence number by
//! walking each frame's backward link from the most recently published one.
//!
//! - [`HeapStore`]: transient, backed by a heap allocation.
//! - [`MappedStore`]: backed by a memory-mapped file and able to recover its
//!   write position when reopened.
//! - [`RingStore`]: either of the above, chosen from a [`StoreConfig`].
//!
//! # Thread Safety
//! Every store is `Send + Sync`. `insert` must only ever be called from one
//! thread at a time; this is not checked. A reader that races a wrapping
//! writer may decode a torn frame (a size from one message and bytes from
//! another). This is memory-safe: all shared bytes are atomics and every
//! offset is bounds-checked.

mod cells;
mod error;
mod heap;
mod listener;
mod mapped;
mod ring;
mod store;

pub use error::{Result, StoreError};
pub use heap::HeapStore;
pub use listener::{Handler, ListenerRegistry};
pub use mapped::MappedStore;
pub use ring::RingInfo;
pub use ringlog_config::StoreConfig;
pub use store::{MessageStore, RingStore};
