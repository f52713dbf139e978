//! Import history: the persisted record of content that has already been
//! imported. Scanning only reads it; whoever performs the import records.

mod sqlite;

pub use sqlite::SqliteImportHistory;

use crate::classify::Disposition;
use crate::entry::MediaEntry;
use crate::error::Error;
use crate::fs::FileHandle;
use crate::hasher::{ContentIdentity, FileFingerprint};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::PathBuf;

/// Where and when an identity was imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMetadata {
    pub source_path: PathBuf,
    pub modified_ns: Option<i64>,
    pub size: u64,
    pub imported_at: DateTime<Utc>,
}

impl ImportMetadata {
    pub fn from_fingerprint(fingerprint: FileFingerprint) -> Self {
        Self {
            source_path: fingerprint.path,
            modified_ns: Some(fingerprint.modified_ns),
            size: fingerprint.size,
            imported_at: Utc::now(),
        }
    }

    pub fn from_handle(handle: &dyn FileHandle) -> Self {
        match FileFingerprint::of(handle) {
            Some(fingerprint) => Self::from_fingerprint(fingerprint),
            None => Self {
                source_path: handle.path().to_path_buf(),
                modified_ns: None,
                size: handle.size(),
                imported_at: Utc::now(),
            },
        }
    }

    fn fingerprint(&self) -> Option<FileFingerprint> {
        self.modified_ns.map(|modified_ns| FileFingerprint {
            path: self.source_path.clone(),
            modified_ns,
            size: self.size,
        })
    }
}

/// Store of previously imported identities.
///
/// Implementations must tolerate concurrent reads from several scans and
/// serialize their own writes.
pub trait ImportHistory: Send + Sync {
    fn contains(&self, identity: &ContentIdentity) -> Result<bool, Error>;

    fn record(&self, identity: &ContentIdentity, metadata: &ImportMetadata) -> Result<(), Error>;

    /// Identity recorded for an unchanged file, used by history-mode scans.
    fn find_identity(&self, _fingerprint: &FileFingerprint) -> Result<Option<ContentIdentity>, Error> {
        Ok(None)
    }

    /// Number of distinct identities recorded.
    fn len(&self) -> Result<usize, Error>;

    fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }
}

/// Process-local history, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryImportHistory {
    identities: DashMap<ContentIdentity, ImportMetadata>,
    fingerprints: DashMap<FileFingerprint, ContentIdentity>,
}

impl InMemoryImportHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImportHistory for InMemoryImportHistory {
    fn contains(&self, identity: &ContentIdentity) -> Result<bool, Error> {
        Ok(self.identities.contains_key(identity))
    }

    fn record(&self, identity: &ContentIdentity, metadata: &ImportMetadata) -> Result<(), Error> {
        if let Some(fingerprint) = metadata.fingerprint() {
            self.fingerprints.insert(fingerprint, *identity);
        }
        self.identities.insert(*identity, metadata.clone());
        Ok(())
    }

    fn find_identity(&self, fingerprint: &FileFingerprint) -> Result<Option<ContentIdentity>, Error> {
        Ok(self.fingerprints.get(fingerprint).map(|entry| *entry.value()))
    }

    fn len(&self) -> Result<usize, Error> {
        Ok(self.identities.len())
    }
}

/// Record every original entry of a finished scan. Duplicates are skipped
/// since their identity is either already recorded or recorded by the
/// original of their group. Returns the number of entries recorded.
pub fn record_entries(history: &dyn ImportHistory, entries: &[MediaEntry]) -> Result<usize, Error> {
    let mut recorded = 0;
    for entry in entries
        .iter()
        .filter(|entry| entry.disposition() == Disposition::Original)
    {
        history.record(entry.identity(), &ImportMetadata::from_handle(entry.handle().as_ref()))?;
        recorded += 1;
    }
    Ok(recorded)
}
