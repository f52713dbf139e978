use crate::classify::Disposition;
use crate::entry::MediaEntry;
use crate::hasher::ScanMode;
use crate::observer::{ObserverRegistry, ScanEvent, ScanWarning};
use parking_lot::{ReentrantMutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

static NEXT_SCAN_ID: AtomicU64 = AtomicU64::new(1);

/// Cooperative cancellation flag shared by a result and its pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateCounts {
    /// `None` until enumeration has finished.
    pub total: Option<usize>,
    pub processed: usize,
    /// Candidates whose content could not be read.
    pub failed: usize,
}

/// Point-in-time view derived from a result's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatistics {
    pub scan_duration_ms: u64,
    pub new_file_count: usize,
    /// Only dispositions that occurred are present.
    pub duplicates: BTreeMap<Disposition, usize>,
    /// Sum of the sizes of original entries.
    pub total_size_bytes: u64,
    pub candidates: CandidateCounts,
    pub progress: f64,
}

#[derive(Default)]
struct ScanState {
    file_entries: Vec<MediaEntry>,
    duplicate_entries: Vec<MediaEntry>,
    candidate_count: Option<usize>,
    failed_count: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

struct Inner {
    id: u64,
    mode: ScanMode,
    state: RwLock<ScanState>,
    /// Held while the canceled and final transitions are applied and
    /// announced, so `Canceled` can never be delivered after `Finalized`.
    /// Reentrant because observers may call `cancel()` from a callback.
    transitions: ReentrantMutex<()>,
    cancel: CancelToken,
    is_final: AtomicBool,
    final_tx: watch::Sender<bool>,
    observers: ObserverRegistry,
}

/// Session object for one scan.
///
/// Cheap to clone; clones share state. Only the scan's own pipeline writes to
/// it. Once final, entries and counters never change again.
#[derive(Clone)]
pub struct ScanResult {
    inner: Arc<Inner>,
}

impl ScanResult {
    pub(crate) fn new(mode: ScanMode, observers: ObserverRegistry) -> Self {
        let (final_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                id: NEXT_SCAN_ID.fetch_add(1, Ordering::Relaxed),
                mode,
                state: RwLock::new(ScanState::default()),
                transitions: ReentrantMutex::new(()),
                cancel: CancelToken::new(),
                is_final: AtomicBool::new(false),
                final_tx,
                observers,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn mode(&self) -> ScanMode {
        self.inner.mode
    }

    pub fn is_final(&self) -> bool {
        self.inner.is_final.load(Ordering::Acquire)
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.cancel.is_canceled()
    }

    pub(crate) fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }

    /// Ask the pipeline to stop. Idempotent and a no-op once final.
    ///
    /// The result still finalizes normally, once the file currently being
    /// hashed completes. Returns `true` if this call initiated cancellation.
    pub fn cancel(&self) -> bool {
        let _transition = self.inner.transitions.lock();
        let initiated = !self.is_final() && self.inner.cancel.cancel();
        if initiated {
            info!("Scan {} canceled", self.id());
            self.notify(&ScanEvent::Canceled);
        }
        initiated
    }

    /// Record the candidate total. Only the first call has an effect.
    pub fn set_candidate_count(&self, count: usize) {
        {
            let mut state = self.inner.state.write();
            if self.is_final() {
                return;
            }
            if let Some(existing) = state.candidate_count {
                debug!(
                    "Scan {} candidate count already set to {}, ignoring {}",
                    self.id(),
                    existing,
                    count
                );
                return;
            }
            state.candidate_count = Some(count);
        }
        self.notify(&ScanEvent::CandidatesCounted { total: count });
    }

    pub(crate) fn mark_started(&self) {
        let mut state = self.inner.state.write();
        if state.started_at.is_none() {
            state.started_at = Some(Instant::now());
        }
    }

    /// Append classified entries in order. Each entry is visible to readers
    /// before its events are delivered.
    pub(crate) fn on_candidates_processed(&self, entries: impl IntoIterator<Item = MediaEntry>) {
        for entry in entries {
            {
                let mut state = self.inner.state.write();
                if self.is_final() {
                    warn!("Scan {} is final, dropping {}", self.id(), entry.path().display());
                    return;
                }
                if entry.disposition().is_duplicate() {
                    state.duplicate_entries.push(entry.clone());
                } else {
                    state.file_entries.push(entry.clone());
                }
            }
            if entry.disposition().is_duplicate() {
                self.notify(&ScanEvent::DuplicateFound {
                    entry: entry.clone(),
                });
            }
            self.notify(&ScanEvent::Processed { entry });
        }
    }

    /// A candidate was dropped because its content could not be read.
    pub(crate) fn on_candidate_failed(&self, warning: ScanWarning) {
        {
            let mut state = self.inner.state.write();
            if self.is_final() {
                return;
            }
            state.failed_count += 1;
        }
        self.notify(&ScanEvent::Warning(warning));
    }

    pub(crate) fn report_warning(&self, warning: ScanWarning) {
        if !self.is_final() {
            self.notify(&ScanEvent::Warning(warning));
        }
    }

    /// One-way transition to the final state. Later calls do nothing.
    ///
    /// Observers see `Finalized` before `when_final()` waiters wake up.
    pub(crate) fn finalize(&self) {
        let _transition = self.inner.transitions.lock();
        {
            let mut state = self.inner.state.write();
            if self.is_final() {
                return;
            }
            state.finished_at = Some(Instant::now());
            self.inner.is_final.store(true, Ordering::Release);
        }
        self.notify(&ScanEvent::Finalized);
        self.inner.final_tx.send_replace(true);
    }

    /// Original entries in enumeration order. Partial until final.
    pub fn file_entries(&self) -> Vec<MediaEntry> {
        self.inner.state.read().file_entries.clone()
    }

    /// Scan and history duplicates in enumeration order. Partial until final.
    pub fn duplicate_entries(&self) -> Vec<MediaEntry> {
        self.inner.state.read().duplicate_entries.clone()
    }

    pub fn candidate_count(&self) -> Option<usize> {
        self.inner.state.read().candidate_count
    }

    pub fn processed_count(&self) -> usize {
        let state = self.inner.state.read();
        state.file_entries.len() + state.duplicate_entries.len()
    }

    pub fn failed_count(&self) -> usize {
        self.inner.state.read().failed_count
    }

    pub fn statistics(&self) -> ScanStatistics {
        let state = self.inner.state.read();
        let is_final = self.is_final();

        let mut duplicates = BTreeMap::new();
        for entry in &state.duplicate_entries {
            *duplicates.entry(entry.disposition()).or_insert(0) += 1;
        }

        let processed = state.file_entries.len() + state.duplicate_entries.len();
        let progress = if is_final {
            1.0
        } else {
            match state.candidate_count {
                Some(total) if total > 0 => {
                    ((processed + state.failed_count) as f64 / total as f64).min(1.0)
                }
                _ => 0.0,
            }
        };

        let scan_duration_ms = match (state.started_at, state.finished_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).as_millis() as u64,
            (Some(start), None) => start.elapsed().as_millis() as u64,
            (None, _) => 0,
        };

        ScanStatistics {
            scan_duration_ms,
            new_file_count: state.file_entries.len(),
            duplicates,
            total_size_bytes: state.file_entries.iter().map(MediaEntry::size).sum(),
            candidates: CandidateCounts {
                total: state.candidate_count,
                processed,
                failed: state.failed_count,
            },
            progress,
        }
    }

    /// Resolves once the result is final. A scan that is neither canceled nor
    /// allowed to finish never resolves.
    pub async fn when_final(&self) -> ScanResult {
        let mut rx = self.inner.final_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|is_final| *is_final).await;
        self.clone()
    }

    fn notify(&self, event: &ScanEvent) {
        self.inner.observers.notify(event, self);
    }
}

impl fmt::Debug for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("ScanResult")
            .field("id", &self.inner.id)
            .field("mode", &self.inner.mode)
            .field("file_entries", &state.file_entries.len())
            .field("duplicate_entries", &state.duplicate_entries.len())
            .field("candidate_count", &state.candidate_count)
            .field("canceled", &self.is_canceled())
            .field("final", &self.is_final())
            .finish()
    }
}
