//! File-system collaborator seam.
//!
//! The scanner only needs a size, a modification time, a path and a way to
//! read bytes. [`LocalFile`] backs these with `std::fs`; callers with other
//! sources (devices, archives, tests) implement [`FileHandle`] themselves.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A readable file owned by the caller's file-system abstraction.
pub trait FileHandle: Send + Sync + fmt::Debug {
    /// Full path. Used as the history fingerprint key.
    fn path(&self) -> &Path;

    /// Path relative to the scan root (or the bare file name for explicit lists).
    fn relative_path(&self) -> &Path;

    fn size(&self) -> u64;

    fn modified(&self) -> Option<SystemTime>;

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>>;
}

/// Decides whether a handle is a supported media file. Must be pure.
pub trait MediaTypePredicate: Send + Sync {
    fn is_media_type(&self, handle: &dyn FileHandle) -> bool;
}

impl<F> MediaTypePredicate for F
where
    F: Fn(&dyn FileHandle) -> bool + Send + Sync,
{
    fn is_media_type(&self, handle: &dyn FileHandle) -> bool {
        self(handle)
    }
}

/// Case-insensitive extension allow-list.
#[derive(Debug, Clone)]
pub struct ExtensionPredicate {
    extensions: Vec<String>,
}

impl ExtensionPredicate {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }
}

impl Default for ExtensionPredicate {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MEDIA_EXTENSIONS)
    }
}

impl MediaTypePredicate for ExtensionPredicate {
    fn is_media_type(&self, handle: &dyn FileHandle) -> bool {
        handle
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}

/// A file on the local file system, with metadata captured at enumeration.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    relative_path: PathBuf,
    size: u64,
    modified: Option<SystemTime>,
}

impl LocalFile {
    pub fn new(path: PathBuf, relative_path: PathBuf, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            path,
            relative_path,
            size,
            modified,
        }
    }

    /// Stat `path` and build a handle whose relative path is its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        let relative_path = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.clone());
        Ok(Self {
            relative_path,
            size: metadata.len(),
            modified: metadata.modified().ok(),
            path,
        })
    }
}

impl FileHandle for LocalFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// Byte buffer exposed as a file.
#[derive(Clone)]
pub struct InMemoryFile {
    path: PathBuf,
    data: Arc<[u8]>,
    modified: Option<SystemTime>,
}

impl InMemoryFile {
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            path: path.into(),
            data: Arc::from(data),
            modified: None,
        }
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }
}

impl fmt::Debug for InMemoryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFile")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FileHandle for InMemoryFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn relative_path(&self) -> &Path {
        &self.path
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(Cursor::new(&self.data[..])))
    }
}
