//! Batch scheduling.
//!
//! Walks the clusters in order, accumulating implication lines against a
//! per-batch line budget. A batch is cut only once a whole cluster has been
//! added, so a cluster larger than the budget yields one oversized batch
//! instead of being split. Every cut consumes one unit of the destination's
//! quota; running out stops the series.

use autoimply_state::TagRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::groups::QualifierCluster;

/// One ready-to-submit change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// `imply` lines, sorted, newline separated.
    pub script: String,
    /// Children met while filling this batch that have no wiki page and were
    /// therefore left out of the script. The last batch also takes those met
    /// after it was cut.
    pub children_without_wiki: Vec<TagRecord>,
}

impl Batch {
    pub fn line_count(&self) -> usize {
        self.script.lines().count()
    }
}

/// Output of a scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub batches: Vec<Batch>,
    /// Every undocumented child seen, in encounter order.
    pub children_without_wiki: Vec<TagRecord>,
    /// Quota left after the last flush.
    pub quota_remaining: i64,
}

/// The destination ran out of quota. `partial` holds the batches flushed
/// before the failing cut; they stay valid.
#[derive(Debug, Clone, thiserror::Error)]
#[error("submission quota exhausted after {} batch(es)", partial.batches.len())]
pub struct QuotaExceeded {
    pub partial: Schedule,
}

/// Cuts clusters into batches under a line budget and a quota.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    max_lines_per_batch: usize,
    quota_remaining: i64,
}

impl BatchScheduler {
    pub fn new(max_lines_per_batch: usize, quota_remaining: i64) -> Self {
        Self {
            max_lines_per_batch: max_lines_per_batch.max(1),
            quota_remaining,
        }
    }

    pub fn schedule(self, clusters: &[QualifierCluster]) -> Result<Schedule, QuotaExceeded> {
        let budget = self.max_lines_per_batch as i64;
        let mut schedule = Schedule {
            quota_remaining: self.quota_remaining,
            ..Schedule::default()
        };
        let mut counter = budget;
        let mut lines: Vec<String> = Vec::new();
        let mut pending_without_wiki: Vec<TagRecord> = Vec::new();

        for cluster in clusters {
            for group in &cluster.groups {
                debug!(
                    parent = %group.parent.name,
                    children = group.children.len(),
                    "found implication group"
                );

                let without_wiki: Vec<TagRecord> = group.children_without_wiki().cloned().collect();
                if !without_wiki.is_empty() {
                    debug!(count = without_wiki.len(), "children without a wiki page");
                    schedule.children_without_wiki.extend(without_wiki.iter().cloned());
                    pending_without_wiki.extend(without_wiki);
                }

                let group_lines = group.script_lines();
                if group_lines.is_empty() {
                    debug!(parent = %group.parent.name, "no documented children, moving on");
                    continue;
                }
                counter -= group_lines.len() as i64;
                lines.extend(group_lines);
            }

            if counter <= 0 {
                flush(&mut schedule, &mut lines, &mut pending_without_wiki)?;
                counter = budget;
            }
        }

        if !lines.is_empty() {
            flush(&mut schedule, &mut lines, &mut pending_without_wiki)?;
        }
        // trailing clusters with no documented children produce no flush
        if let Some(last) = schedule.batches.last_mut() {
            last.children_without_wiki.append(&mut pending_without_wiki);
        }

        info!(
            batches = schedule.batches.len(),
            quota_remaining = schedule.quota_remaining,
            "scheduling finished"
        );
        Ok(schedule)
    }
}

fn flush(
    schedule: &mut Schedule,
    lines: &mut Vec<String>,
    without_wiki: &mut Vec<TagRecord>,
) -> Result<(), QuotaExceeded> {
    if schedule.quota_remaining <= 0 {
        return Err(QuotaExceeded {
            partial: std::mem::take(schedule),
        });
    }
    schedule.quota_remaining -= 1;

    let mut sorted = std::mem::take(lines);
    sorted.sort();
    schedule.batches.push(Batch {
        script: sorted.join("\n"),
        children_without_wiki: std::mem::take(without_wiki),
    });
    Ok(())
}
