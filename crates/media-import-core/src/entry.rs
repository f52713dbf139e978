use crate::classify::Disposition;
use crate::fs::FileHandle;
use crate::hasher::ContentIdentity;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A file that passed media-type filtering and awaits classification.
#[derive(Debug, Clone)]
pub struct Candidate {
    handle: Arc<dyn FileHandle>,
}

impl Candidate {
    pub fn new(handle: Arc<dyn FileHandle>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &Arc<dyn FileHandle> {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    pub fn size(&self) -> u64 {
        self.handle.size()
    }

    pub(crate) fn into_entry(self, identity: ContentIdentity, disposition: Disposition) -> MediaEntry {
        MediaEntry {
            size: self.handle.size(),
            handle: self.handle,
            identity,
            disposition,
        }
    }
}

/// A classified candidate. Immutable once created.
#[derive(Clone)]
pub struct MediaEntry {
    handle: Arc<dyn FileHandle>,
    size: u64,
    identity: ContentIdentity,
    disposition: Disposition,
}

impl MediaEntry {
    pub fn handle(&self) -> &Arc<dyn FileHandle> {
        &self.handle
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    pub fn relative_path(&self) -> &Path {
        self.handle.relative_path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn identity(&self) -> &ContentIdentity {
        &self.identity
    }

    pub fn disposition(&self) -> Disposition {
        self.disposition
    }
}

impl fmt::Debug for MediaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaEntry")
            .field("path", &self.path())
            .field("size", &self.size)
            .field("identity", &self.identity.to_string())
            .field("disposition", &self.disposition)
            .finish()
    }
}
