//! Desired episodes vs. remote list membership.
//!
//! Reconciliation is split in two:
//!
//! - [`plan`] partitions match results against the list snapshot without any
//!   I/O: matched and already present → skipped, matched and absent → pending
//!   add, unmatched → failed.
//! - [`ListReconciler::apply`] submits pending adds in fixed-size batches
//!   through a [`ListWriter`], retrying throttled batches with exponential
//!   backoff. A batch either lands as a whole or fails as a whole.
//!
//! Because pending adds are filtered against the snapshot, running the same
//! reconciliation again against the updated list adds nothing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::matching::EpisodeMatcher;
use crate::models::{
    ListSnapshot, MatchResult, ReconciliationReport, RemoteId, ScrapedEpisode, SyncConfig,
};
use crate::pipeline::index::CatalogIndex;

/// Outcome of one batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResponse {
    Accepted,
    /// Rate limited; the same batch may be retried later
    Throttled,
    Rejected { status: u16, message: String },
}

/// Destination list that accepts batches of episode ids.
#[async_trait]
pub trait ListWriter: Send + Sync {
    async fn add_episodes(&self, ids: &[RemoteId]) -> Result<BatchResponse>;
}

/// Batching and retry settings.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub batch_size: usize,
    /// Total submissions per batch, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Pause between successful batches
    pub batch_pause: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            batch_pause: Duration::from_millis(500),
        }
    }
}

impl From<&SyncConfig> for ReconcileOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            batch_pause: config.batch_pause(),
        }
    }
}

impl ReconcileOptions {
    /// Sleep before retry number `attempt` (1-based count of failed attempts).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// One remote id waiting to be added, with every episode that matched it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAdd {
    pub remote_id: RemoteId,
    pub episodes: Vec<ScrapedEpisode>,
}

impl PendingAdd {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.episodes.iter().map(|e| e.name.as_str())
    }
}

/// Result of [`plan`]: what would be submitted, skipped and reported failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    /// In discovery order
    pub pending: Vec<PendingAdd>,
    pub skipped: Vec<String>,
    pub failed: Vec<ScrapedEpisode>,
    pub failure_notes: Vec<String>,
}

impl ReconcilePlan {
    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(|p| p.episodes.len()).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.pending.is_empty()
    }

    /// Report for a run that submits nothing.
    pub fn into_dry_run_report(self) -> ReconciliationReport {
        ReconciliationReport {
            added: Vec::new(),
            skipped: self.skipped,
            failed: self.failed,
            failure_notes: self.failure_notes,
        }
    }
}

/// Partition match results against the list snapshot.
///
/// Episodes resolving to the same remote id are coalesced into one pending
/// add, so an id is never both added and skipped.
pub fn plan(results: Vec<MatchResult>, snapshot: &ListSnapshot) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let mut positions: HashMap<RemoteId, usize> = HashMap::new();

    for result in results {
        let Some(remote_id) = result.remote_id else {
            plan.failure_notes.push(format!(
                "Failed to find match for {}",
                result.episode.name.to_lowercase()
            ));
            plan.failed.push(result.episode);
            continue;
        };

        if snapshot.contains(remote_id) {
            plan.skipped.push(result.skip_identifier());
            continue;
        }

        match positions.get(&remote_id) {
            Some(&position) => plan.pending[position].episodes.push(result.episode),
            None => {
                positions.insert(remote_id, plan.pending.len());
                plan.pending.push(PendingAdd {
                    remote_id,
                    episodes: vec![result.episode],
                });
            }
        }
    }

    plan
}

enum BatchOutcome {
    Added,
    Failed(String),
}

/// Applies reconciliation plans to one remote list.
pub struct ListReconciler<'a, W: ListWriter + ?Sized> {
    writer: &'a W,
    options: ReconcileOptions,
}

impl<'a, W: ListWriter + ?Sized> ListReconciler<'a, W> {
    pub fn new(writer: &'a W, options: ReconcileOptions) -> Self {
        Self { writer, options }
    }

    /// Match, partition and submit in one go.
    pub async fn reconcile(
        &self,
        desired: &[ScrapedEpisode],
        snapshot: &ListSnapshot,
        index: &CatalogIndex,
        matcher: &EpisodeMatcher<'_>,
    ) -> ReconciliationReport {
        let results = matcher.match_all(desired, index);
        self.apply(plan(results, snapshot)).await
    }

    /// Submit every pending add in batches and assemble the report.
    pub async fn apply(&self, plan: ReconcilePlan) -> ReconciliationReport {
        let ReconcilePlan {
            pending,
            skipped,
            failed,
            failure_notes,
        } = plan;

        let mut report = ReconciliationReport {
            added: Vec::new(),
            skipped,
            failed,
            failure_notes,
        };

        if pending.is_empty() {
            log::info!("Nothing to add");
            return report;
        }

        let batches: Vec<&[PendingAdd]> = pending.chunks(self.options.batch_size.max(1)).collect();
        let total = batches.len();
        log::info!(
            "Adding {} episodes in {} batch(es)",
            pending.iter().map(|p| p.episodes.len()).sum::<usize>(),
            total
        );

        for (i, batch) in batches.into_iter().enumerate() {
            let ids: Vec<RemoteId> = batch.iter().map(|p| p.remote_id).collect();

            match self.submit(&ids).await {
                BatchOutcome::Added => {
                    log::info!("Batch {}/{}: added {} item(s)", i + 1, total, ids.len());
                    report
                        .added
                        .extend(batch.iter().flat_map(|p| p.names().map(String::from)));

                    if i + 1 < total && !self.options.batch_pause.is_zero() {
                        tokio::time::sleep(self.options.batch_pause).await;
                    }
                }
                BatchOutcome::Failed(note) => {
                    log::warn!("Batch {}/{} failed: {}", i + 1, total, note);
                    report
                        .failed
                        .extend(batch.iter().flat_map(|p| p.episodes.iter().cloned()));
                    report.failure_notes.push(note);
                }
            }
        }

        report
    }

    async fn submit(&self, ids: &[RemoteId]) -> BatchOutcome {
        let max_attempts = self.options.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let retry_reason = match self.writer.add_episodes(ids).await {
                Ok(BatchResponse::Accepted) => return BatchOutcome::Added,
                Ok(BatchResponse::Rejected { status, message }) => {
                    return BatchOutcome::Failed(format!(
                        "Batch rejected with status {status}: {message}"
                    ));
                }
                Ok(BatchResponse::Throttled) => {
                    last_error = None;
                    "rate limited".to_string()
                }
                Err(e) if e.is_transient() => {
                    let reason = e.to_string();
                    last_error = Some(reason.clone());
                    reason
                }
                Err(e) => return BatchOutcome::Failed(format!("Batch submission failed: {e}")),
            };

            if attempt == max_attempts {
                break;
            }

            let delay = self.options.backoff(attempt);
            log::warn!(
                "Batch attempt {}/{} {}; retrying in {:?}",
                attempt,
                max_attempts,
                retry_reason,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        BatchOutcome::Failed(match last_error {
            Some(error) => format!("Retries exhausted after transport error: {error}"),
            None => "Rate limit retries exhausted".to_string(),
        })
    }
}
