//! HTTP submission sink
//!
//! Posts finished batches to the catalog's bulk-update-request endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::StateError;
use crate::storage_traits::{BatchSubmission, StateResult, SubmissionReceipt, SubmissionSink};

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the catalog, e.g. `https://danbooru.donmai.us`
    pub base_url: String,
    pub login: Option<String>,
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: std::env::var("AUTOIMPLY_API_URL")
                .unwrap_or_else(|_| "https://danbooru.donmai.us".to_string()),
            login: std::env::var("AUTOIMPLY_API_LOGIN").ok(),
            api_key: std::env::var("AUTOIMPLY_API_KEY").ok(),
        }
    }
}

impl ApiConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(base_url: &str) -> Self {
        ApiConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            login: None,
            api_key: None,
        }
    }

    pub fn with_credentials(mut self, login: &str, api_key: &str) -> Self {
        self.login = Some(login.to_string());
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Link to a forum topic on this catalog.
    pub fn topic_url(&self, topic_id: u64) -> String {
        format!("{}/forum_topics/{}", self.base_url, topic_id)
    }
}

/// Sink that files each batch as a bulk update request.
pub struct HttpSubmissionSink {
    config: ApiConfig,
    http_client: reqwest::Client,
}

impl HttpSubmissionSink {
    /// Create a sink. Credentials are required because filing is authenticated.
    pub fn new(config: ApiConfig) -> StateResult<Self> {
        if config.login.is_none() || config.api_key.is_none() {
            return Err(StateError::MissingCredentials(
                "both login and api key must be set to submit".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("autoimply/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpSubmissionSink {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bulk_update_requests.json", self.config.base_url)
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, submission: BatchSubmission) -> StateResult<SubmissionReceipt> {
        let body = json!({
            "bulk_update_request": {
                "script": submission.script,
                "forum_topic_id": submission.topic_id,
                "reason": submission.reason,
            }
        });

        debug!(endpoint = %self.endpoint(), topic_id = submission.topic_id, "posting batch");

        let response = self
            .http_client
            .post(self.endpoint())
            .basic_auth(
                self.config.login.as_deref().unwrap_or_default(),
                self.config.api_key.as_deref(),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StateError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let request_id = payload.get("id").and_then(|v| v.as_u64());
        info!(?request_id, topic_id = submission.topic_id, "batch submitted");

        Ok(SubmissionReceipt { request_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_requires_credentials() {
        let result = HttpSubmissionSink::new(ApiConfig::new("https://example.test"));
        assert!(matches!(result, Err(StateError::MissingCredentials(_))));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let config = ApiConfig::new("https://example.test/").with_credentials("bot", "secret");
        let sink = HttpSubmissionSink::new(config).unwrap();
        assert_eq!(
            sink.endpoint(),
            "https://example.test/bulk_update_requests.json"
        );
    }

    #[test]
    fn topic_url_points_at_forum() {
        let config = ApiConfig::new("https://example.test");
        assert_eq!(config.topic_url(42), "https://example.test/forum_topics/42");
    }
}
