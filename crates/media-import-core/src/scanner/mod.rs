mod walk;

pub use walk::DirectoryWalk;

use crate::config::ScannerConfig;
use crate::entry::Candidate;
use crate::fs::{ExtensionPredicate, FileHandle, MediaTypePredicate};
use crate::observer::ScanWarning;
use crate::result::CancelToken;
use glob::Pattern;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// One step of an enumeration.
#[derive(Debug)]
pub enum Enumerated {
    Candidate(Candidate),
    /// A subtree or entry could not be read. Enumeration continues.
    Warning(ScanWarning),
}

/// Produces lazy candidate sequences from a directory or an explicit list,
/// keeping only handles accepted by the media-type predicate.
#[derive(Clone)]
pub struct CandidateEnumerator {
    predicate: Arc<dyn MediaTypePredicate>,
    ignore_patterns: Vec<Pattern>,
    follow_links: bool,
}

impl CandidateEnumerator {
    pub fn new(predicate: Arc<dyn MediaTypePredicate>) -> Self {
        Self {
            predicate,
            ignore_patterns: Vec::new(),
            follow_links: false,
        }
    }

    /// Extension predicate, ignore globs and link policy taken from `config`.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(Arc::new(ExtensionPredicate::new(&config.media_extensions)))
            .with_ignore_patterns(&config.ignore_patterns)
            .follow_links(config.follow_links)
    }

    /// Invalid globs are logged and dropped.
    pub fn with_ignore_patterns<S: AsRef<str>>(mut self, globs: &[S]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob.as_ref()) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob.as_ref(), e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn MediaTypePredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn is_media_type(&self, handle: &dyn FileHandle) -> bool {
        self.predicate.is_media_type(handle)
    }

    pub fn enumerate_directory(&self, root: &Path, recursive: bool, cancel: CancelToken) -> DirectoryWalk {
        DirectoryWalk::new(
            root,
            recursive,
            self.follow_links,
            self.ignore_patterns.clone(),
            Arc::clone(&self.predicate),
            cancel,
        )
    }

    /// Explicit-list form. Order is the caller's order.
    pub fn enumerate_handles(
        &self,
        handles: Vec<Arc<dyn FileHandle>>,
        cancel: CancelToken,
    ) -> impl Iterator<Item = Enumerated> + Send {
        let predicate = Arc::clone(&self.predicate);
        handles
            .into_iter()
            .take_while(move |_| !cancel.is_canceled())
            .filter(move |handle| predicate.is_media_type(handle.as_ref()))
            .map(|handle| Enumerated::Candidate(Candidate::new(handle)))
    }
}
