use crate::error::Error;
use crate::hasher::ContentIdentity;
use crate::history::ImportHistory;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Outcome of classifying one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// New content, first of its kind in this scan and absent from history.
    Original,
    /// Same content as an entry seen earlier in this scan.
    ScanDuplicate,
    /// Content already recorded in the import history.
    HistoryDuplicate,
}

impl Disposition {
    pub fn is_duplicate(self) -> bool {
        !matches!(self, Disposition::Original)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Disposition::Original => "ORIGINAL",
            Disposition::ScanDuplicate => "SCAN_DUPLICATE",
            Disposition::HistoryDuplicate => "HISTORY_DUPLICATE",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Classification {
    pub disposition: Disposition,
    /// Set when the history could not be consulted; the entry then counts as
    /// original.
    pub history_error: Option<Error>,
}

/// Assigns dispositions in enumeration order for one scan.
///
/// The first entry seen for an identity is canonical: it is `Original`, or
/// `HistoryDuplicate` when history already knows the content. Every later
/// entry with that identity is a `ScanDuplicate`.
pub struct DispositionClassifier<'a> {
    history: &'a dyn ImportHistory,
    seen: HashSet<ContentIdentity>,
}

impl<'a> DispositionClassifier<'a> {
    pub fn new(history: &'a dyn ImportHistory) -> Self {
        Self {
            history,
            seen: HashSet::new(),
        }
    }

    pub fn classify(&mut self, identity: &ContentIdentity) -> Classification {
        if self.seen.contains(identity) {
            return Classification {
                disposition: Disposition::ScanDuplicate,
                history_error: None,
            };
        }
        self.seen.insert(*identity);

        match self.history.contains(identity) {
            Ok(true) => Classification {
                disposition: Disposition::HistoryDuplicate,
                history_error: None,
            },
            Ok(false) => Classification {
                disposition: Disposition::Original,
                history_error: None,
            },
            Err(e) => {
                warn!("History lookup failed for {}, treating as new: {}", identity, e);
                let message = match e {
                    Error::HistoryLookup(message) => message,
                    other => other.to_string(),
                };
                Classification {
                    disposition: Disposition::Original,
                    history_error: Some(Error::HistoryLookup(message)),
                }
            }
        }
    }

    /// Distinct identities seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
