use super::Enumerated;
use crate::entry::Candidate;
use crate::fs::{LocalFile, MediaTypePredicate};
use crate::observer::ScanWarning;
use crate::result::CancelToken;
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Depth-first directory traversal, sorted by file name so a fixed tree
/// always yields candidates in the same order.
///
/// Unreadable directories and entries become [`Enumerated::Warning`] items
/// and the walk carries on with the next sibling.
pub struct DirectoryWalk {
    root: PathBuf,
    inner: walkdir::IntoIter,
    ignore_patterns: Vec<Pattern>,
    predicate: Arc<dyn MediaTypePredicate>,
    cancel: CancelToken,
    finished: bool,
}

impl DirectoryWalk {
    pub(crate) fn new(
        root: &Path,
        recursive: bool,
        follow_links: bool,
        ignore_patterns: Vec<Pattern>,
        predicate: Arc<dyn MediaTypePredicate>,
        cancel: CancelToken,
    ) -> Self {
        let mut walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(follow_links)
            .sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        Self {
            root: root.to_path_buf(),
            inner: walker.into_iter(),
            ignore_patterns,
            predicate,
            cancel,
            finished: false,
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

impl Iterator for DirectoryWalk {
    type Item = Enumerated;

    fn next(&mut self) -> Option<Enumerated> {
        loop {
            if self.finished {
                return None;
            }
            if self.cancel.is_canceled() {
                debug!("Enumeration of {} canceled", self.root.display());
                self.finished = true;
                return None;
            }

            let entry = match self.inner.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    let path = err.path().map(Path::to_path_buf);
                    warn!("Error walking {}: {}", self.root.display(), err);
                    return Some(Enumerated::Warning(ScanWarning::new(path, err.to_string())));
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if self.is_ignored(path) {
                trace!("Ignoring {}", path.display());
                if file_type.is_dir() {
                    self.inner.skip_current_dir();
                }
                continue;
            }

            // Directories are descended into by walkdir; links that were not
            // followed and special files are never candidates.
            if !file_type.is_file() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("Error getting metadata for {}: {}", path.display(), err);
                    return Some(Enumerated::Warning(ScanWarning::new(
                        Some(path.to_path_buf()),
                        err.to_string(),
                    )));
                }
            };

            let relative_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_path_buf();
            let file = LocalFile::new(
                path.to_path_buf(),
                relative_path,
                metadata.len(),
                metadata.modified().ok(),
            );

            if !self.predicate.is_media_type(&file) {
                trace!("Skipping non-media file {}", path.display());
                continue;
            }

            return Some(Enumerated::Candidate(Candidate::new(Arc::new(file))));
        }
    }
}
