//! Pass/fail reporting for gesture and discovery operations.
//!
//! Every public operation on [`TouchActions`](crate::touch::TouchActions)
//! ends with exactly one call to an [`ActionReporter`], success or failure.
//! Evidence (screenshots, reference images) travels with that call as
//! [`Attachment`]s; the reporter takes ownership of them.
//!
//! Two reporters ship with the crate:
//!
//! - [`ReportLog`] keeps a bounded in-memory history and broadcasts each
//!   entry to subscribers, for test harnesses and live viewers.
//! - [`TracingReporter`] turns each report into a `tracing` event.
//!
//! # Example
//!
//! ```
//! use scrollhound_core::report::{ActionReporter, Attachment, ReportLog};
//!
//! let log = ReportLog::new();
//! let mut rx = log.subscribe();
//! log.report_success("tap", "Tapped (10, 20)", vec![Attachment::text("note", "ok")]);
//!
//! let entry = rx.try_recv().unwrap();
//! assert_eq!(entry.action, "tap");
//! assert!(entry.passed());
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::TouchError;

/// Maximum number of entries retained by a [`ReportLog`].
const MAX_REPORT_LOG_SIZE: usize = 1000;

/// Content type of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Text,
}

/// A named blob of evidence attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub kind: AttachmentKind,
    /// Raw bytes, base64-encoded when serialized.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    /// A PNG image attachment.
    pub fn image(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind: AttachmentKind::Image,
            data,
        }
    }

    /// A UTF-8 text attachment.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttachmentKind::Text,
            data: text.into().into_bytes(),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// Receives the terminal outcome of each public operation.
pub trait ActionReporter: Send + Sync {
    /// Record a passed action.
    fn report_success(&self, action: &str, detail: &str, attachments: Vec<Attachment>);

    /// Record a failed action, with the error that caused it when there is one.
    fn report_failure(
        &self,
        action: &str,
        detail: &str,
        attachments: Vec<Attachment>,
        cause: Option<&TouchError>,
    );
}

/// Outcome recorded in a [`ReportEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportOutcome {
    Passed,
    /// The action failed; carries the cause's message, or the detail when
    /// there was no underlying error.
    Failed(String),
}

/// A single recorded report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub outcome: ReportOutcome,
    pub detail: String,
    pub attachments: Vec<Attachment>,
}

impl ReportEntry {
    fn new(action: &str, outcome: ReportOutcome, detail: &str, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: action.to_string(),
            outcome,
            detail: detail.to_string(),
            attachments,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == ReportOutcome::Passed
    }
}

/// In-memory report history with live broadcast.
///
/// The history is a ring buffer; once it holds 1000 entries the oldest is
/// dropped for each new one. Subscribers that lag behind the broadcast
/// channel miss entries but can still read [`entries`](Self::entries).
pub struct ReportLog {
    entries: Mutex<VecDeque<ReportEntry>>,
    event_tx: broadcast::Sender<ReportEntry>,
}

impl ReportLog {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(64)),
            event_tx,
        }
    }

    /// Subscribe to entries recorded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEntry> {
        self.event_tx.subscribe()
    }

    /// A snapshot of the retained entries, oldest first.
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ReportEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, entry: ReportEntry) {
        {
            let mut entries = self.lock();
            if entries.len() >= MAX_REPORT_LOG_SIZE {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        // No subscribers is fine.
        let _ = self.event_tx.send(entry);
    }
}

impl Default for ReportLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionReporter for ReportLog {
    fn report_success(&self, action: &str, detail: &str, attachments: Vec<Attachment>) {
        self.record(ReportEntry::new(action, ReportOutcome::Passed, detail, attachments));
    }

    fn report_failure(
        &self,
        action: &str,
        detail: &str,
        attachments: Vec<Attachment>,
        cause: Option<&TouchError>,
    ) {
        let reason = cause.map_or_else(|| detail.to_string(), |e| e.to_string());
        self.record(ReportEntry::new(
            action,
            ReportOutcome::Failed(reason),
            detail,
            attachments,
        ));
    }
}

/// Emits reports as `tracing` events and drops the attachments.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ActionReporter for TracingReporter {
    fn report_success(&self, action: &str, detail: &str, attachments: Vec<Attachment>) {
        info!(action, attachments = attachments.len(), "{detail}");
    }

    fn report_failure(
        &self,
        action: &str,
        detail: &str,
        attachments: Vec<Attachment>,
        cause: Option<&TouchError>,
    ) {
        match cause {
            Some(err) => warn!(action, attachments = attachments.len(), error = %err, "{detail}"),
            None => warn!(action, attachments = attachments.len(), "{detail}"),
        }
    }
}
