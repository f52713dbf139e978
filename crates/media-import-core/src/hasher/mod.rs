mod identity;

pub use identity::{ContentIdentity, FileFingerprint};

use crate::error::Error;
use crate::fs::FileHandle;
use crate::history::ImportHistory;
use serde::Serialize;
use std::io::{self, Read};
use tracing::{trace, warn};

const HASH_CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// How identities are obtained for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanMode {
    /// Always read and hash the full content.
    ContentHash,
    /// Reuse identities recorded in history for unchanged files.
    History,
}

/// Compute the identity of `handle`.
///
/// In [`ScanMode::History`] a matching (path, mtime, size) fingerprint in
/// `history` short-circuits hashing. Any miss or lookup failure falls back to
/// reading the whole file.
pub fn compute_identity(
    handle: &dyn FileHandle,
    mode: ScanMode,
    history: &dyn ImportHistory,
) -> Result<ContentIdentity, Error> {
    if mode == ScanMode::History {
        if let Some(fingerprint) = FileFingerprint::of(handle) {
            match history.find_identity(&fingerprint) {
                Ok(Some(identity)) if identity.size() == fingerprint.size => {
                    trace!("Reusing recorded identity for {}", handle.path().display());
                    return Ok(identity);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "History fingerprint lookup failed for {}, hashing instead: {}",
                        handle.path().display(),
                        e
                    );
                }
            }
        }
    }
    hash_content(handle)
}

/// Stream the full content through BLAKE3 in fixed-size chunks.
pub fn hash_content(handle: &dyn FileHandle) -> Result<ContentIdentity, Error> {
    let mut reader = handle.open()?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    trace!("Hashed {} ({} bytes)", handle.path().display(), size);
    Ok(ContentIdentity::new(hasher.finalize(), size))
}
