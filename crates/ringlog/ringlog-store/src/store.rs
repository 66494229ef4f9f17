use crate::error::Result;
use crate::heap::HeapStore;
use crate::mapped::MappedStore;
use crate::ring::RingInfo;
use ringlog_config::StoreConfig;

/// Operations shared by every ring store.
pub trait MessageStore: Send + Sync {
    /// Appends `payload` under `sequence`. Single writer only; sequence
    /// numbers are neither validated for order nor for uniqueness.
    fn insert(&self, payload: &[u8], sequence: i64) -> Result<()>;

    /// The payload stored under `sequence`, unless absent or overwritten.
    fn get(&self, sequence: i64) -> Option<Vec<u8>>;

    /// Adds a handler called after every subsequent insert.
    fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8], i64) + Send + Sync + 'static;

    /// Sequence number of the newest frame.
    fn last_number(&self) -> Option<i64>;

    fn capacity(&self) -> usize;
}

macro_rules! forward_store {
    ($ty:ty) => {
        impl MessageStore for $ty {
            #[inline]
            fn insert(&self, payload: &[u8], sequence: i64) -> Result<()> {
                <$ty>::insert(self, payload, sequence)
            }

            #[inline]
            fn get(&self, sequence: i64) -> Option<Vec<u8>> {
                <$ty>::get(self, sequence)
            }

            fn register_handler<F>(&self, handler: F)
            where
                F: Fn(&[u8], i64) + Send + Sync + 'static,
            {
                <$ty>::register_handler(self, handler)
            }

            fn last_number(&self) -> Option<i64> {
                <$ty>::last_number(self)
            }

            fn capacity(&self) -> usize {
                <$ty>::capacity(self)
            }
        }
    };
}

forward_store!(HeapStore);
forward_store!(MappedStore);

/// A store whose backend is picked at construction.
pub enum RingStore {
    Heap(HeapStore),
    Mapped(MappedStore),
}

impl RingStore {
    /// Builds the backend described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        match config {
            StoreConfig::Heap { capacity } => Ok(RingStore::Heap(HeapStore::new(*capacity))),
            StoreConfig::Mapped {
                capacity,
                path,
                name,
            } => Ok(RingStore::Mapped(MappedStore::open(*capacity, path, name)?)),
        }
    }

    pub fn info(&self) -> RingInfo {
        match self {
            RingStore::Heap(s) => s.info(),
            RingStore::Mapped(s) => s.info(),
        }
    }

    /// Flushes and releases a mapped backend; a no-op for the heap.
    pub fn close(self) -> Result<()> {
        match self {
            RingStore::Heap(_) => Ok(()),
            RingStore::Mapped(s) => s.close(),
        }
    }
}

impl MessageStore for RingStore {
    #[inline]
    fn insert(&self, payload: &[u8], sequence: i64) -> Result<()> {
        match self {
            RingStore::Heap(s) => s.insert(payload, sequence),
            RingStore::Mapped(s) => s.insert(payload, sequence),
        }
    }

    #[inline]
    fn get(&self, sequence: i64) -> Option<Vec<u8>> {
        match self {
            RingStore::Heap(s) => s.get(sequence),
            RingStore::Mapped(s) => s.get(sequence),
        }
    }

    fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&[u8], i64) + Send + Sync + 'static,
    {
        match self {
            RingStore::Heap(s) => s.register_handler(handler),
            RingStore::Mapped(s) => s.register_handler(handler),
        }
    }

    fn last_number(&self) -> Option<i64> {
        match self {
            RingStore::Heap(s) => s.last_number(),
            RingStore::Mapped(s) => s.last_number(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            RingStore::Heap(s) => s.capacity(),
            RingStore::Mapped(s) => s.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise<S: MessageStore>(store: &S) {
        assert_eq!(store.last_number(), None);
        store.insert(b"alpha", 1).unwrap();
        store.insert(b"beta", 2).unwrap();
        assert_eq!(store.get(1).as_deref(), Some(&b"alpha"[..]));
        assert_eq!(store.last_number(), Some(2));
    }

    #[test]
    fn heap_config_builds_heap_store() {
        let store = RingStore::open(&StoreConfig::Heap { capacity: 4096 }).unwrap();
        assert!(matches!(store, RingStore::Heap(_)));
        assert_eq!(store.capacity(), 4096);
        exercise(&store);
        store.close().unwrap();
    }

    #[test]
    fn mapped_config_builds_mapped_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Mapped {
            capacity: 4096,
            path: dir.path().join("ring.buf"),
            name: "cfg".into(),
        };
        let store = RingStore::open(&config).unwrap();
        assert!(matches!(store, RingStore::Mapped(_)));
        exercise(&store);
        assert_eq!(store.info().current_offset, Some(25));
        store.close().unwrap();

        let reopened = RingStore::open(&config).unwrap();
        assert_eq!(reopened.last_number(), Some(2));
        assert_eq!(reopened.get(2).as_deref(), Some(&b"beta"[..]));
    }
}
