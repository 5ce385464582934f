//! Record schema shared by the sources and the inference core.
//!
//! Records:
//! - `TagRecord`: one catalog tag with the flags the resolver needs
//! - `ChangeRequestRecord`: one historical change request (script + status)
//! - `WikiPageRecord`: a wiki page and the tag names it links to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog tag as supplied by a tag source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: u64,
    pub name: String,
    /// Popularity (number of posts carrying the tag)
    #[serde(default)]
    pub post_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deprecated: bool,
    /// Whether the tag already implies something
    #[serde(default)]
    pub has_antecedent_implication: bool,
    #[serde(default)]
    pub has_wiki_page: bool,
}

impl TagRecord {
    /// Create a live, documented tag with no existing implication.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            post_count: 0,
            created_at: now,
            updated_at: now,
            is_deprecated: false,
            has_antecedent_implication: false,
            has_wiki_page: true,
        }
    }

    pub fn with_post_count(mut self, post_count: u64) -> Self {
        self.post_count = post_count;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.is_deprecated = true;
        self
    }

    pub fn without_wiki(mut self) -> Self {
        self.has_wiki_page = false;
        self
    }

    pub fn with_antecedent_implication(mut self) -> Self {
        self.has_antecedent_implication = true;
        self
    }
}

/// Review status of a change request.
///
/// Unknown statuses are preserved verbatim so that history from newer
/// deployments still loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Failed,
    Processing,
    Queued,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Failed => "failed",
            RequestStatus::Processing => "processing",
            RequestStatus::Queued => "queued",
            RequestStatus::Other(s) => s,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestStatus::Pending)
    }
}

impl From<&str> for RequestStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => RequestStatus::Pending,
            "approved" => RequestStatus::Approved,
            "rejected" => RequestStatus::Rejected,
            "failed" => RequestStatus::Failed,
            "processing" => RequestStatus::Processing,
            "queued" => RequestStatus::Queued,
            other => RequestStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(s: String) -> Self {
        RequestStatus::from(s.as_str())
    }
}

impl From<RequestStatus> for String {
    fn from(status: RequestStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A historical change request, as recovered from the history source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestRecord {
    pub id: u64,
    /// Forum topic the request was filed in
    pub topic_id: u64,
    /// Raw script text, one directive per line
    pub script: String,
    pub status: RequestStatus,
    pub updated_at: DateTime<Utc>,
}

/// A wiki page listing member tags of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPageRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub linked_tags: Vec<String>,
}
