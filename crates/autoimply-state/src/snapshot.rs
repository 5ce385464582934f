//! JSON snapshot of the catalog and request history.
//!
//! A snapshot is the hand-off point from the replication jobs: one JSON
//! document holding tags, wiki pages, related copyrights and change requests.
//! It is loaded once per run and never written back.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StateError;
use crate::memory::{MemoryHistorySource, MemoryTagSource};
use crate::schema::{ChangeRequestRecord, TagRecord, WikiPageRecord};
use crate::storage_traits::StateResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub wiki_pages: Vec<WikiPageRecord>,
    /// tag name -> related copyright tag names
    #[serde(default)]
    pub related_copyrights: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub change_requests: Vec<ChangeRequestRecord>,
}

impl Snapshot {
    /// Read and decode a snapshot file.
    pub fn load(path: &Path) -> StateResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            tags = snapshot.tags.len(),
            change_requests = snapshot.change_requests.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_json(raw: &str) -> StateResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Split the snapshot into a tag source and a history source.
    pub fn into_sources(self) -> (MemoryTagSource, MemoryHistorySource) {
        let tags = MemoryTagSource::new(self.tags)
            .with_wiki_pages(self.wiki_pages)
            .with_copyrights(self.related_copyrights);
        let history = MemoryHistorySource::new(self.change_requests);
        (tags, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_traits::{HistorySource, TagSource};

    const SNAPSHOT: &str = r#"{
        "tags": [
            {"id": 2, "name": "alice_(swimsuit)", "has_wiki_page": true},
            {"id": 1, "name": "alice", "post_count": 120}
        ],
        "change_requests": [
            {"id": 9, "topic_id": 5, "script": "imply a -> b", "status": "pending",
             "updated_at": "2024-01-02T00:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn snapshot_splits_into_sources() {
        let (tags, history) = Snapshot::from_json(SNAPSHOT).unwrap().into_sources();

        let found = tags.tags_matching("alice*").await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "alice");

        let requests = history.requests_for_topic(5).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].status.is_pending());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Snapshot::load(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.tags.len(), 2);
        assert_eq!(snapshot.change_requests.len(), 1);
    }
}
