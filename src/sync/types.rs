use serde::Serialize;

/// Envelope caps: a large feed can produce hundreds of item errors,
/// callers only need a sample to diagnose.
const ERROR_DETAIL_CAP: usize = 10;
const SYNCED_GUID_CAP: usize = 5;

/// Fatal sync failures. Anything here aborts the run before or during
/// setup; per-item trouble is reported through `ItemError` instead.
#[derive(Debug)]
pub enum SyncError {
    FeedUnavailable(String),
    StoreUnavailable(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::FeedUnavailable(why) => write!(f, "feed unavailable: {why}"),
            SyncError::StoreUnavailable(why) => write!(f, "store unavailable: {why}"),
        }
    }
}

impl std::error::Error for SyncError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemErrorKind {
    /// A required field was empty or absent after extraction.
    MissingField(&'static str),
    /// No stable identity could be derived; the item was not written
    /// because a random key would duplicate it on every sync.
    DegenerateGuid,
    /// The store rejected the write.
    Persistence(String),
}

impl std::fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemErrorKind::MissingField(field) => write!(f, "missing {field}"),
            ItemErrorKind::DegenerateGuid => write!(f, "no stable identifier could be derived"),
            ItemErrorKind::Persistence(why) => write!(f, "storage failure: {why}"),
        }
    }
}

/// One failed feed item. `guid` falls back to the item title when the
/// failure is about the identity itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemError {
    pub guid: String,
    pub kind: ItemErrorKind,
}

impl std::fmt::Display for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.guid, self.kind)
    }
}

impl std::error::Error for ItemError {}

/// Full outcome of one sync run. Invariant: every processed item lands
/// in exactly one of `synced` or `errors`, so
/// `synced.len() + errors.len() == total`.
#[derive(Debug)]
pub struct SyncReport {
    pub total: usize,
    pub synced: Vec<String>,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<ItemError>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub guid: String,
    pub error: String,
}

/// Caller-facing result envelope; detail lists are capped samples.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    pub success: bool,
    pub total: usize,
    pub synced: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub message: String,
    pub error_details: Vec<ErrorDetail>,
    pub synced_guids: Vec<String>,
}

impl SyncSummary {
    pub fn from_report(report: &SyncReport) -> Self {
        // A run counts as a success as soon as anything landed; a run
        // where every item failed reports failure even though the loop
        // itself completed.
        let success = !report.synced.is_empty();
        let message = if success {
            format!(
                "Synced {} of {} episodes ({} errors)",
                report.synced.len(),
                report.total,
                report.errors.len()
            )
        } else {
            format!(
                "Failed to sync: {} errors out of {} items",
                report.errors.len(),
                report.total
            )
        };
        SyncSummary {
            success,
            total: report.total,
            synced: report.synced.len(),
            created: report.created,
            updated: report.updated,
            errors: report.errors.len(),
            message,
            error_details: report
                .errors
                .iter()
                .take(ERROR_DETAIL_CAP)
                .map(|e| ErrorDetail { guid: e.guid.clone(), error: e.kind.to_string() })
                .collect(),
            synced_guids: report.synced.iter().take(SYNCED_GUID_CAP).cloned().collect(),
        }
    }
}

/// Structured plan payload for `sync` without `--apply`.
#[derive(Serialize)]
pub struct SyncPlan {
    pub feed_url: String,
    pub limit: Option<usize>,
    pub episodes_on_record: i64,
}
