//! Source and sink trait definitions for autoimply
//!
//! These traits define the collaborators around the inference core:
//! - `TagSource`: candidate tags of a series (by pattern, id, name, prefix)
//! - `HistorySource`: prior change requests, ascending by update time
//! - `SubmissionSink`: accepts finished batches for review
//!
//! All traits are async and backend-agnostic. In-memory implementations are
//! provided in the `memory` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::schema::{ChangeRequestRecord, TagRecord, WikiPageRecord};

/// Result type for source/sink operations
pub type StateResult<T> = std::result::Result<T, StateError>;

// ---------------------------------------------------------------------------
// TagSource
// ---------------------------------------------------------------------------

/// Read-only access to the tag catalog.
///
/// Name patterns use `*` as the only wildcard and match case-insensitively.
#[async_trait]
pub trait TagSource: Send + Sync {
    /// Tags whose name matches `pattern` (e.g. `*_(summer)`), ordered by id.
    async fn tags_matching(&self, pattern: &str) -> StateResult<Vec<TagRecord>>;

    /// Tags with the given ids, ordered by id. Unknown ids are skipped.
    async fn tags_by_ids(&self, ids: &[u64]) -> StateResult<Vec<TagRecord>>;

    /// Tags with the given names, ordered by id. Unknown names are skipped.
    async fn tags_by_names(&self, names: &[String]) -> StateResult<Vec<TagRecord>>;

    /// Tags whose name starts with any of `prefixes`, ordered by id.
    async fn tags_with_prefix(&self, prefixes: &[String]) -> StateResult<Vec<TagRecord>>;

    /// Wiki pages with the given ids.
    async fn wiki_pages(&self, ids: &[u64]) -> StateResult<Vec<WikiPageRecord>>;

    /// Copyright tags the catalog associates with `tag_name`.
    async fn related_copyrights(&self, tag_name: &str) -> StateResult<Vec<String>>;
}

// ---------------------------------------------------------------------------
// HistorySource
// ---------------------------------------------------------------------------

/// Access to previously filed change requests.
///
/// Guarantees: results are ordered by `updated_at` ascending, then by id.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// All requests updated strictly after `checkpoint` (everything when `None`).
    async fn requests_since(
        &self,
        checkpoint: Option<DateTime<Utc>>,
    ) -> StateResult<Vec<ChangeRequestRecord>>;

    /// All requests filed in the given topic.
    async fn requests_for_topic(&self, topic_id: u64) -> StateResult<Vec<ChangeRequestRecord>>;
}

// ---------------------------------------------------------------------------
// SubmissionSink
// ---------------------------------------------------------------------------

/// A finished batch ready for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmission {
    pub script: String,
    pub topic_id: u64,
    /// Human-readable justification attached to the request
    pub reason: String,
}

/// Acknowledgement returned by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Identifier assigned by the remote side, when it reports one
    pub request_id: Option<u64>,
}

/// Destination for finished batches.
///
/// Callers treat every submission as fire-and-forget: a failure is reported
/// back but never retried.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, submission: BatchSubmission) -> StateResult<SubmissionReceipt>;
}
