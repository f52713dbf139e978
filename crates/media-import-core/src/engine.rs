use crate::classify::DispositionClassifier;
use crate::config::ScannerConfig;
use crate::entry::Candidate;
use crate::error::Error;
use crate::fs::{FileHandle, MediaTypePredicate};
use crate::hasher::{self, ScanMode};
use crate::history::ImportHistory;
use crate::observer::{ObserverId, ObserverRegistry, ScanObserver, ScanWarning};
use crate::result::ScanResult;
use crate::scanner::{CandidateEnumerator, Enumerated};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Entry point for scans. Each call to [`scan_directory`](Self::scan_directory)
/// or [`scan_files`](Self::scan_files) returns a fresh [`ScanResult`] right
/// away and does the work on a background thread.
pub struct MediaScanner {
    history: Arc<dyn ImportHistory>,
    enumerator: CandidateEnumerator,
    observers: ObserverRegistry,
    pool: Arc<ThreadPool>,
    recursive: bool,
    batch_size: usize,
}

impl MediaScanner {
    pub fn new(config: &ScannerConfig, history: Arc<dyn ImportHistory>) -> Result<Self, Error> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.hash_workers)
            .thread_name(|i| format!("media-hash-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("Failed to build hashing pool: {}", e)))?;

        Ok(Self {
            history,
            enumerator: CandidateEnumerator::from_config(config),
            observers: ObserverRegistry::new(),
            pool: Arc::new(pool),
            recursive: config.recursive,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Replace the extension-based media test.
    pub fn with_predicate(mut self, predicate: Arc<dyn MediaTypePredicate>) -> Self {
        self.enumerator = self.enumerator.with_predicate(predicate);
        self
    }

    pub fn history(&self) -> &Arc<dyn ImportHistory> {
        &self.history
    }

    /// Observers see events from every scan started by this scanner,
    /// including scans already running.
    pub fn add_observer(&self, observer: Arc<dyn ScanObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn scan_directory(&self, directory: &Path, mode: ScanMode) -> Result<ScanResult, Error> {
        if !directory.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "{} is not a directory",
                directory.display()
            )));
        }

        let result = ScanResult::new(mode, self.observers.clone());
        info!(
            "Scan {} of {} started ({:?})",
            result.id(),
            directory.display(),
            mode
        );
        let source = self
            .enumerator
            .enumerate_directory(directory, self.recursive, result.cancel_token());
        self.spawn(result.clone(), source)?;
        Ok(result)
    }

    /// Scan an explicit list. Every handle must be a supported media file.
    pub fn scan_files(&self, entries: Vec<Arc<dyn FileHandle>>, mode: ScanMode) -> Result<ScanResult, Error> {
        if entries.is_empty() {
            return Err(Error::InvalidArgument("no files to scan".to_string()));
        }
        if let Some(unsupported) = entries
            .iter()
            .find(|handle| !self.enumerator.is_media_type(handle.as_ref()))
        {
            return Err(Error::InvalidArgument(format!(
                "{} is not a supported media file",
                unsupported.path().display()
            )));
        }

        let result = ScanResult::new(mode, self.observers.clone());
        info!(
            "Scan {} of {} files started ({:?})",
            result.id(),
            entries.len(),
            mode
        );
        let source = self.enumerator.enumerate_handles(entries, result.cancel_token());
        self.spawn(result.clone(), source)?;
        Ok(result)
    }

    fn spawn<I>(&self, result: ScanResult, source: I) -> Result<(), Error>
    where
        I: Iterator<Item = Enumerated> + Send + 'static,
    {
        let job = ScanJob {
            result: result.clone(),
            history: Arc::clone(&self.history),
            pool: Arc::clone(&self.pool),
            batch_size: self.batch_size,
        };

        thread::Builder::new()
            .name(format!("media-scan-{}", result.id()))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.run(source)));
                if outcome.is_err() {
                    error!("Scan {} pipeline panicked, finalizing early", result.id());
                    result.finalize();
                }
            })?;
        Ok(())
    }
}

/// The per-scan pipeline: enumerate, hash in parallel, classify in order.
struct ScanJob {
    result: ScanResult,
    history: Arc<dyn ImportHistory>,
    pool: Arc<ThreadPool>,
    batch_size: usize,
}

impl ScanJob {
    fn run(&self, source: impl Iterator<Item = Enumerated>) {
        let id = self.result.id();

        // Phase 1: enumerate
        let enumerate_start = Instant::now();
        let candidates = self.enumerate(source);
        debug!(
            "Scan {} enumerated {} candidates in {:.2}s",
            id,
            candidates.len(),
            enumerate_start.elapsed().as_secs_f64()
        );

        // Phase 2: hash and classify
        if !self.result.is_canceled() {
            self.result.set_candidate_count(candidates.len());
            let classify_start = Instant::now();
            self.classify(candidates);
            debug!(
                "Scan {} classified in {:.2}s",
                id,
                classify_start.elapsed().as_secs_f64()
            );
        }

        self.result.finalize();
        let stats = self.result.statistics();
        info!(
            "Scan {} {}: {} new, {:?} duplicates, {} failed, {} bytes new",
            id,
            if self.result.is_canceled() { "canceled" } else { "finished" },
            stats.new_file_count,
            stats.duplicates,
            stats.candidates.failed,
            stats.total_size_bytes,
        );
    }

    fn enumerate(&self, source: impl Iterator<Item = Enumerated>) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for item in source {
            match item {
                Enumerated::Candidate(candidate) => {
                    if candidates.is_empty() {
                        self.result.mark_started();
                    }
                    candidates.push(candidate);
                }
                Enumerated::Warning(warning) => self.result.report_warning(warning),
            }
        }
        candidates
    }

    /// Batches are hashed on the pool; `collect` keeps enumeration order, so
    /// the first-seen entry of an identity group is always the earliest one.
    fn classify(&self, candidates: Vec<Candidate>) {
        let mode = self.result.mode();
        let history = self.history.as_ref();
        let cancel = self.result.cancel_token();
        let mut classifier = DispositionClassifier::new(history);
        let mut remaining = candidates.into_iter().peekable();

        while remaining.peek().is_some() {
            if cancel.is_canceled() {
                break;
            }
            let batch: Vec<Candidate> = remaining.by_ref().take(self.batch_size).collect();

            let identities: Vec<Option<Result<_, Error>>> = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|candidate| {
                        if cancel.is_canceled() {
                            return None;
                        }
                        Some(hasher::compute_identity(
                            candidate.handle().as_ref(),
                            mode,
                            history,
                        ))
                    })
                    .collect()
            });

            for (candidate, identity) in batch.into_iter().zip(identities) {
                if cancel.is_canceled() {
                    return;
                }
                let identity = match identity {
                    Some(Ok(identity)) => identity,
                    Some(Err(e)) => {
                        warn!("Error hashing {}: {}", candidate.path().display(), e);
                        self.result.on_candidate_failed(ScanWarning::new(
                            Some(candidate.path().to_path_buf()),
                            e.to_string(),
                        ));
                        continue;
                    }
                    None => return,
                };

                let classification = classifier.classify(&identity);
                if let Some(e) = classification.history_error {
                    self.result.report_warning(ScanWarning::new(
                        Some(candidate.path().to_path_buf()),
                        e.to_string(),
                    ));
                }
                self.result
                    .on_candidates_processed([candidate.into_entry(identity, classification.disposition)]);
            }
        }
    }
}
