//! One inference pass over a set of series.
//!
//! [`Runner`] wires the collaborators to the core: it collects each series'
//! tags, builds the ledger once for the whole pass, resolves and clusters
//! groups, schedules batches under the topic quota and hands them to the
//! sink. Quota exhaustion stops only the series it happened in.

use std::sync::Arc;

use autoimply_state::{
    BatchSubmission, HistorySource, SubmissionSink, TagRecord, TagSource,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::collect::collect_series_tags;
use crate::context::RunContext;
use crate::error::Result;
use crate::groups::{build_groups, cluster_by_qualifier, standalone_clusters};
use crate::ledger::Ledger;
use crate::report::{justification, render_batches};
use crate::scheduler::{Batch, BatchScheduler};
use crate::series::Series;

/// Knobs supplied by the caller for a whole pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    pub max_lines_per_batch: usize,
    /// Overrides every series' `autopost` toggle when set.
    pub autopost: Option<bool>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_lines_per_batch: 1,
            autopost: None,
        }
    }
}

/// What happened to one series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReport {
    pub series: String,
    pub topic_id: u64,
    pub groups: usize,
    pub batches: Vec<Batch>,
    /// Batches the sink accepted.
    pub submitted: usize,
    /// Batches the sink rejected. Not retried.
    pub failed_submissions: usize,
    pub children_without_wiki: Vec<TagRecord>,
    pub justification: String,
    pub quota_exhausted: bool,
    pub autopost: bool,
}

pub struct Runner {
    tags: Arc<dyn TagSource>,
    history: Arc<dyn HistorySource>,
    sink: Arc<dyn SubmissionSink>,
}

impl Runner {
    pub fn new(
        tags: Arc<dyn TagSource>,
        history: Arc<dyn HistorySource>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        Self {
            tags,
            history,
            sink,
        }
    }

    /// Build the ledger from the full request history.
    pub async fn load_ledger(&self) -> Result<Ledger> {
        let requests = self.history.requests_since(None).await?;
        let ledger = Ledger::from_requests(&requests)?;
        info!(
            requests = requests.len(),
            antecedents = ledger.len(),
            "built implication ledger"
        );
        Ok(ledger)
    }

    /// Batches the topic can still take before the quota is spent.
    pub async fn remaining_quota(&self, series: &Series) -> Result<i64> {
        let max = i64::from(series.max_batches_per_topic);
        let pending = self
            .history
            .requests_for_topic(series.topic_id)
            .await?
            .iter()
            .filter(|r| r.status.is_pending())
            .count() as i64;
        Ok(max - pending.min(max))
    }

    pub async fn run_series(
        &self,
        series: &Series,
        ledger: &Ledger,
        options: &RunOptions,
    ) -> Result<SeriesReport> {
        info!(series = %series.name, topic_id = series.topic_id, "processing series");

        let tags = collect_series_tags(self.tags.as_ref(), series).await?;
        let groups = build_groups(RunContext::new(&tags, ledger), series);
        let group_count = groups.len();

        let mut without_wiki: Vec<TagRecord> = groups
            .iter()
            .flat_map(|g| g.children_without_wiki())
            .cloned()
            .collect();
        without_wiki.sort_by(|a, b| a.name.cmp(&b.name));
        let reason = justification(&without_wiki);

        let clusters = if series.group_by_qualifier {
            cluster_by_qualifier(groups, series)?
        } else {
            standalone_clusters(groups)
        };

        let quota = self.remaining_quota(series).await?;
        info!(
            groups = group_count,
            max_lines_per_batch = options.max_lines_per_batch,
            quota,
            "scheduling batches"
        );

        let (schedule, quota_exhausted) =
            match BatchScheduler::new(options.max_lines_per_batch, quota).schedule(&clusters) {
                Ok(schedule) => (schedule, false),
                Err(exceeded) => {
                    error!(
                        series = %series.name,
                        topic_id = series.topic_id,
                        "too many open batches in topic, stopping this series"
                    );
                    (exceeded.partial, true)
                }
            };

        let autopost = options.autopost.unwrap_or(series.autopost);
        let mut submitted = 0;
        let mut failed_submissions = 0;
        for batch in &schedule.batches {
            info!(script = %batch.script, "submitting implications");
            if !autopost {
                continue;
            }
            let submission = BatchSubmission {
                script: batch.script.clone(),
                topic_id: series.topic_id,
                reason: reason.clone(),
            };
            match self.sink.submit(submission).await {
                Ok(receipt) => {
                    submitted += 1;
                    info!(request_id = ?receipt.request_id, "batch accepted");
                }
                Err(e) => {
                    failed_submissions += 1;
                    warn!(error = %e, "batch submission failed");
                }
            }
        }

        info!(
            batches = schedule.batches.len(),
            dry_run = !autopost,
            "{} batches {}submitted",
            schedule.batches.len(),
            if autopost { "" } else { "would have been " }
        );
        if !schedule.batches.is_empty() {
            info!("\n\n{}", render_batches(&schedule.batches));
        }

        Ok(SeriesReport {
            series: series.name.clone(),
            topic_id: series.topic_id,
            groups: group_count,
            batches: schedule.batches,
            submitted,
            failed_submissions,
            children_without_wiki: without_wiki,
            justification: reason,
            quota_exhausted,
            autopost,
        })
    }

    /// Run every series in order against one shared ledger.
    pub async fn run_all(&self, series: &[Series], options: &RunOptions) -> Result<Vec<SeriesReport>> {
        let ledger = self.load_ledger().await?;
        let mut reports = Vec::with_capacity(series.len());
        for s in series {
            reports.push(self.run_series(s, &ledger, options).await?);
        }
        Ok(reports)
    }
}
