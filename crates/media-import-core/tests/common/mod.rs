#![allow(dead_code)]

use media_import_core::{
    ContentIdentity, Error, FileHandle, ImportHistory, ImportMetadata, ScanEvent, ScanObserver,
    ScanResult,
};
use parking_lot::Mutex;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::timeout;

/// A handle whose content can never be read.
#[derive(Debug)]
pub struct FailingFile {
    path: PathBuf,
}

impl FailingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileHandle for FailingFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn relative_path(&self) -> &Path {
        &self.path
    }

    fn size(&self) -> u64 {
        1024
    }

    fn modified(&self) -> Option<SystemTime> {
        None
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "card removed"))
    }
}

/// A history whose store is unreachable: every lookup fails.
#[derive(Debug, Default)]
pub struct UnavailableHistory;

impl ImportHistory for UnavailableHistory {
    fn contains(&self, _identity: &ContentIdentity) -> Result<bool, Error> {
        Err(Error::HistoryLookup("database is locked".to_string()))
    }

    fn record(&self, _identity: &ContentIdentity, _metadata: &ImportMetadata) -> Result<(), Error> {
        Err(Error::HistoryLookup("database is locked".to_string()))
    }

    fn len(&self) -> Result<usize, Error> {
        Err(Error::HistoryLookup("database is locked".to_string()))
    }
}

/// Records the name of every event it sees.
#[derive(Default)]
pub struct EventRecorder {
    events: Mutex<Vec<&'static str>>,
}

impl EventRecorder {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|event| **event == name).count()
    }
}

impl ScanObserver for EventRecorder {
    fn on_scan_event(&self, event: &ScanEvent, _result: &ScanResult) {
        self.events.lock().push(event.name());
    }
}

pub async fn wait_final(result: &ScanResult) -> ScanResult {
    timeout(Duration::from_secs(30), result.when_final())
        .await
        .expect("scan did not finish in time")
}

pub fn file_names(entries: &[media_import_core::MediaEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.relative_path().to_string_lossy().into_owned())
        .collect()
}

pub fn recorder() -> Arc<EventRecorder> {
    Arc::new(EventRecorder::default())
}
