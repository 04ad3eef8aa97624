use std::collections::HashMap;
use std::fs;
use std::io::{self, prelude::*, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The file access the container readers need, abstracted so that a
/// container can be served from somewhere other than the local file system.
///
/// Every method takes the full path of a member file.
pub trait ContainerStorage {
    /// Read the entire contents of `path`
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Read `buf.len()` bytes starting at `offset`. Reading past the end of the
    /// file is an [`io::ErrorKind::UnexpectedEof`] error.
    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// The size of `path` in bytes
    fn len(&self, path: &Path) -> io::Result<u64>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Read the entire contents of `path` as text. Bytes that are not valid
    /// UTF-8 are replaced rather than treated as an error, instrument software
    /// writes whatever code page the workstation uses.
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let buf = self.read(path)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl<S: ContainerStorage + ?Sized> ContainerStorage for &S {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read(path)
    }

    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(path, offset, buf)
    }

    fn len(&self, path: &Path) -> io::Result<u64> {
        (**self).len(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        (**self).is_dir(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }
}

/// [`ContainerStorage`] backed by the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemStorage;

impl ContainerStorage for FileSystemStorage {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut handle = fs::File::open(path)?;
        handle.seek(SeekFrom::Start(offset))?;
        handle.read_exact(buf)
    }

    fn len(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// An in-memory [`ContainerStorage`] which counts how many times a member
/// file's contents were read.
///
/// Directories are implied by the paths of the files inserted.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: HashMap<PathBuf, Vec<u8>>,
    reads: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, content: Vec<u8>) -> Option<Vec<u8>> {
        self.files.insert(path.into(), content)
    }

    pub fn remove<P: AsRef<Path>>(&mut self, path: P) -> Option<Vec<u8>> {
        self.files.remove(path.as_ref())
    }

    /// The number of content reads served so far, whole-file or ranged
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn get(&self, path: &Path) -> io::Result<&Vec<u8>> {
        self.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

impl ContainerStorage for MemoryStorage {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let content = self.get(path)?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(content.clone())
    }

    fn read_at(&self, path: &Path, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let content = self.get(path)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(buf.len());
        match content.get(start..end) {
            Some(chunk) => {
                self.reads.fetch_add(1, Ordering::Relaxed);
                buf.copy_from_slice(chunk);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {} bytes at {offset} runs past the end of {}",
                    buf.len(),
                    path.display()
                ),
            )),
        }
    }

    fn len(&self, path: &Path) -> io::Result<u64> {
        Ok(self.get(path)?.len() as u64)
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .keys()
            .any(|k| k.parent().map(|p| p.starts_with(path)).unwrap_or_default())
    }
}
