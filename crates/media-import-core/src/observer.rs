use crate::entry::MediaEntry;
use crate::result::ScanResult;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// A non-fatal problem surfaced during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanWarning {
    pub fn new(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {}", path.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Progress notifications delivered to observers, in pipeline order.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Enumeration finished and the candidate total is now known.
    CandidatesCounted { total: usize },
    /// Emitted for a duplicate right before its `Processed` event.
    DuplicateFound { entry: MediaEntry },
    /// One candidate was classified and added to the result.
    Processed { entry: MediaEntry },
    Warning(ScanWarning),
    Finalized,
    Canceled,
}

impl ScanEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::CandidatesCounted { .. } => "candidates-counted",
            ScanEvent::DuplicateFound { .. } => "duplicate-found",
            ScanEvent::Processed { .. } => "processed",
            ScanEvent::Warning(_) => "warning",
            ScanEvent::Finalized => "finalized",
            ScanEvent::Canceled => "canceled",
        }
    }
}

/// Receives scan events. Called synchronously on the thread that produced
/// the event, so implementations should return quickly.
pub trait ScanObserver: Send + Sync {
    fn on_scan_event(&self, event: &ScanEvent, result: &ScanResult);
}

impl<F> ScanObserver for F
where
    F: Fn(&ScanEvent, &ScanResult) + Send + Sync,
{
    fn on_scan_event(&self, event: &ScanEvent, result: &ScanResult) {
        self(event, result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered observer list shared between a scanner and the results it creates.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Arc<RwLock<Vec<(ObserverId, Arc<dyn ScanObserver>)>>>,
    next_id: Arc<AtomicU64>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, observer: Arc<dyn ScanObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer in registration order. A panicking
    /// observer is logged and skipped.
    pub(crate) fn notify(&self, event: &ScanEvent, result: &ScanResult) {
        // Snapshot so observers may (un)register from inside a callback.
        let observers: Vec<_> = self.observers.read().clone();
        for (id, observer) in observers {
            let delivered =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_scan_event(event, result)));
            if let Err(payload) = delivered {
                error!(
                    "Observer {:?} panicked handling '{}' event: {}",
                    id,
                    event.name(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
