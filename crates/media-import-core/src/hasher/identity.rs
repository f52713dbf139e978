use crate::error::Error;
use crate::fs::FileHandle;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Content hash plus byte size. Two files with equal identities are
/// duplicates no matter where they live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentIdentity {
    digest: blake3::Hash,
    size: u64,
}

impl ContentIdentity {
    pub fn new(digest: blake3::Hash, size: u64) -> Self {
        Self { digest, size }
    }

    /// Identity of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::new(blake3::hash(data), data.len() as u64)
    }

    pub fn digest(&self) -> &blake3::Hash {
        &self.digest
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.digest.to_hex(), self.size)
    }
}

impl FromStr for ContentIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digest, size) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidIdentity(s.to_string()))?;
        let digest = blake3::Hash::from_hex(digest)
            .map_err(|e| Error::InvalidIdentity(format!("{}: {}", s, e)))?;
        let size = size
            .parse::<u64>()
            .map_err(|e| Error::InvalidIdentity(format!("{}: {}", s, e)))?;
        Ok(Self::new(digest, size))
    }
}

impl Serialize for ContentIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// (path, mtime, size) of a file at a point in time. An unchanged
/// fingerprint lets a history-mode scan reuse a recorded identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileFingerprint {
    pub path: PathBuf,
    /// Nanoseconds since the Unix epoch; sub-second precision avoids stale hits.
    pub modified_ns: i64,
    pub size: u64,
}

impl FileFingerprint {
    /// `None` when the handle has no usable modification time.
    pub fn of(handle: &dyn FileHandle) -> Option<Self> {
        let modified = handle.modified()?;
        Some(Self {
            path: handle.path().to_path_buf(),
            modified_ns: system_time_to_ns(modified)?,
            size: handle.size(),
        })
    }
}

fn system_time_to_ns(time: SystemTime) -> Option<i64> {
    let since_epoch = time.duration_since(UNIX_EPOCH).ok()?;
    i64::try_from(since_epoch.as_nanos()).ok()
}
