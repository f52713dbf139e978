pub mod classify;
pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod fs;
pub mod hasher;
pub mod history;
pub mod observer;
pub mod result;
pub mod scanner;

pub use classify::Disposition;
pub use config::ScannerConfig;
pub use engine::MediaScanner;
pub use entry::MediaEntry;
pub use error::Error;
pub use fs::{ExtensionPredicate, FileHandle, InMemoryFile, LocalFile, MediaTypePredicate};
pub use hasher::{ContentIdentity, FileFingerprint, ScanMode};
pub use history::{ImportHistory, ImportMetadata, InMemoryImportHistory, SqliteImportHistory};
pub use observer::{ObserverId, ScanEvent, ScanObserver, ScanWarning};
pub use result::{CancelToken, CandidateCounts, ScanResult, ScanStatistics};
