use memmap2::MmapMut;
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};
use tempfile::NamedTempFile;

/// A read-write file mapping and the file handle backing it.
///
/// Fields drop in declaration order, so the mapping is always released
/// before the file it views.
pub struct MmapFileMut {
    mmap: MmapMut,
    _file: File,
}

/// Whether `open_or_create` found a file or had to make one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    Created,
    Existing,
}

impl MmapFileMut {
    /// Create a new file of `size_bytes` and map it read-write, replacing any
    /// file already at `path`.
    ///
    /// `init` sees the zeroed mapping before the file appears at `path`.
    pub fn create_rw<P, F>(path: P, size_bytes: u64, init: F) -> io::Result<Self>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut [u8]),
    {
        Self::build(path.as_ref(), size_bytes, init, true)
    }

    /// Map an existing file read-write, or create it at `size_bytes` if absent.
    ///
    /// An existing file is mapped at whatever length it has; callers that
    /// need a particular size compare against [`MmapFileMut::len`]. A new file
    /// is sized and handed to `init` under a temporary name in the same
    /// directory, flushed, and only then moved to `path`, so a crash never
    /// leaves an uninitialized file there.
    pub fn open_or_create<P, F>(path: P, size_bytes: u64, init: F) -> io::Result<(Self, Opened)>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut [u8]),
    {
        let path = path.as_ref();
        match Self::open_rw(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            existing => return existing.map(|mm| (mm, Opened::Existing)),
        }
        match Self::build(path, size_bytes, init, false) {
            Ok(mm) => Ok((mm, Opened::Created)),
            // Lost a race with another creator; theirs is initialized too.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Ok((Self::open_rw(path)?, Opened::Existing))
            }
            Err(e) => Err(e),
        }
    }

    fn open_rw(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::map(file)
    }

    fn build<F>(path: &Path, size_bytes: u64, init: F, replace: bool) -> io::Result<Self>
    where
        F: FnOnce(&mut [u8]),
    {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        tmp.as_file().set_len(size_bytes)?;

        // SAFETY: the temporary file is private to this call until persisted.
        let mut mmap = unsafe { MmapMut::map_mut(tmp.as_file())? };
        init(&mut mmap[..]);
        mmap.flush()?;

        let file = if replace {
            tmp.persist(path)
        } else {
            tmp.persist_noclobber(path)
        }
        .map_err(|e| e.error)?;
        Ok(Self { mmap, _file: file })
    }

    fn map(file: File) -> io::Result<Self> {
        // SAFETY: the mapping is only ever accessed through the owner of this
        // value; concurrent modification by other processes is unsupported.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { mmap, _file: file })
    }

    /// Return raw pointer to start of memory mapped file data
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Synchronously write dirty pages back to the file.
    pub fn flush(&self) -> io::Result<()> {
        self.mmap.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_init(_: &mut [u8]) {}

    #[test]
    fn open_or_create_reports_creation_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");

        let (mut mm, opened) = MmapFileMut::open_or_create(&path, 64, no_init).unwrap();
        assert_eq!(opened, Opened::Created);
        assert_eq!(mm.len(), 64);
        unsafe { *mm.as_mut_ptr().add(3) = 0x5A };
        mm.flush().unwrap();
        drop(mm);

        let (mut mm, opened) = MmapFileMut::open_or_create(&path, 64, no_init).unwrap();
        assert_eq!(opened, Opened::Existing);
        assert_eq!(unsafe { *mm.as_mut_ptr().add(3) }, 0x5A);
    }

    #[test]
    fn new_file_is_initialized_before_it_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");

        let (_mm, opened) = MmapFileMut::open_or_create(&path, 16, |bytes| {
            assert!(!path.exists());
            assert!(bytes.iter().all(|&b| b == 0));
            bytes[..4].copy_from_slice(b"init");
        })
        .unwrap();
        assert_eq!(opened, Opened::Created);

        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), 16);
        assert_eq!(&on_disk[..4], b"init");
        // Only the region itself is left in the directory.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn existing_file_is_not_reinitialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        std::fs::write(&path, [7u8; 8]).unwrap();

        let (mm, opened) = MmapFileMut::open_or_create(&path, 4096, |_| {
            panic!("existing file passed to init")
        })
        .unwrap();
        assert_eq!(opened, Opened::Existing);
        assert_eq!(mm.len(), 8);
    }

    #[test]
    fn create_rw_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        std::fs::write(&path, [7u8; 8]).unwrap();

        let mm = MmapFileMut::create_rw(&path, 32, no_init).unwrap();
        assert_eq!(mm.len(), 32);
        assert_eq!(std::fs::read(&path).unwrap(), vec![0u8; 32]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("region");
        assert!(MmapFileMut::open_or_create(&path, 64, no_init).is_err());
    }
}
