//! In-memory sources and sinks
//!
//! Provides `MemoryTagSource`, `MemoryHistorySource`, and `RecordingSink`
//! that satisfy the trait contracts without any external dependencies. The
//! snapshot loader builds its sources on top of these.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tokio::sync::Mutex;

use crate::error::StateError;
use crate::schema::{ChangeRequestRecord, TagRecord, WikiPageRecord};
use crate::storage_traits::*;

/// Compile a `*`-wildcard name pattern into an anchored, case-insensitive regex.
pub fn glob_to_regex(pattern: &str) -> StateResult<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i)^{body}$")).map_err(|e| StateError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// MemoryTagSource
// ---------------------------------------------------------------------------

/// Tag source backed by vectors kept sorted by id.
#[derive(Debug, Default)]
pub struct MemoryTagSource {
    tags: Vec<TagRecord>,
    wiki_pages: Vec<WikiPageRecord>,
    copyrights: HashMap<String, Vec<String>>,
}

impl MemoryTagSource {
    pub fn new(tags: Vec<TagRecord>) -> Self {
        let mut tags = tags;
        tags.sort_by_key(|t| t.id);
        Self {
            tags,
            ..Self::default()
        }
    }

    pub fn with_wiki_pages(mut self, pages: Vec<WikiPageRecord>) -> Self {
        self.wiki_pages = pages;
        self
    }

    pub fn with_copyrights(mut self, copyrights: HashMap<String, Vec<String>>) -> Self {
        self.copyrights = copyrights;
        self
    }

    fn filtered(&self, keep: impl Fn(&TagRecord) -> bool) -> Vec<TagRecord> {
        self.tags.iter().filter(|t| keep(t)).cloned().collect()
    }
}

#[async_trait]
impl TagSource for MemoryTagSource {
    async fn tags_matching(&self, pattern: &str) -> StateResult<Vec<TagRecord>> {
        let re = glob_to_regex(pattern)?;
        Ok(self.filtered(|t| re.is_match(&t.name)))
    }

    async fn tags_by_ids(&self, ids: &[u64]) -> StateResult<Vec<TagRecord>> {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        Ok(self.filtered(|t| wanted.contains(&t.id)))
    }

    async fn tags_by_names(&self, names: &[String]) -> StateResult<Vec<TagRecord>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self.filtered(|t| wanted.contains(t.name.as_str())))
    }

    async fn tags_with_prefix(&self, prefixes: &[String]) -> StateResult<Vec<TagRecord>> {
        Ok(self.filtered(|t| prefixes.iter().any(|p| t.name.starts_with(p.as_str()))))
    }

    async fn wiki_pages(&self, ids: &[u64]) -> StateResult<Vec<WikiPageRecord>> {
        Ok(self
            .wiki_pages
            .iter()
            .filter(|w| ids.contains(&w.id))
            .cloned()
            .collect())
    }

    async fn related_copyrights(&self, tag_name: &str) -> StateResult<Vec<String>> {
        Ok(self.copyrights.get(tag_name).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryHistorySource
// ---------------------------------------------------------------------------

/// History source backed by a vector ordered by `(updated_at, id)`.
#[derive(Debug, Default)]
pub struct MemoryHistorySource {
    requests: Vec<ChangeRequestRecord>,
}

impl MemoryHistorySource {
    pub fn new(requests: Vec<ChangeRequestRecord>) -> Self {
        let mut requests = requests;
        requests.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        Self { requests }
    }
}

#[async_trait]
impl HistorySource for MemoryHistorySource {
    async fn requests_since(
        &self,
        checkpoint: Option<DateTime<Utc>>,
    ) -> StateResult<Vec<ChangeRequestRecord>> {
        Ok(self
            .requests
            .iter()
            .filter(|r| checkpoint.map(|c| r.updated_at > c).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn requests_for_topic(&self, topic_id: u64) -> StateResult<Vec<ChangeRequestRecord>> {
        Ok(self
            .requests
            .iter()
            .filter(|r| r.topic_id == topic_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Sink that keeps every submission in memory.
///
/// `failing()` builds a sink that rejects everything, for exercising the
/// no-retry path.
#[derive(Debug, Default)]
pub struct RecordingSink {
    submitted: Mutex<Vec<BatchSubmission>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Submissions accepted so far, in order.
    pub async fn submissions(&self) -> Vec<BatchSubmission> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit(&self, submission: BatchSubmission) -> StateResult<SubmissionReceipt> {
        if self.fail {
            return Err(StateError::Rejected {
                status: 503,
                body: "sink configured to fail".to_string(),
            });
        }
        let mut submitted = self.submitted.lock().await;
        submitted.push(submission);
        Ok(SubmissionReceipt {
            request_id: Some(submitted.len() as u64),
        })
    }
}
