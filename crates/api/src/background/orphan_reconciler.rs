//! Periodic removal of stories whose owners no longer exist.
//!
//! Each cycle asks the identity service about every distinct story owner.
//! Owners confirmed missing (404) lose their stories and content, and are
//! pulled out of every other story's collaborator list. Owners whose lookup
//! is inconclusive are left untouched until a later cycle.
//!
//! Runs once at startup and then on a fixed interval. Cycles never overlap:
//! the loop awaits each cycle before waiting for the next tick.

use std::sync::Arc;
use std::time::Duration;

use storyhub_core::types::ObjectId;
use storyhub_db::error::StoreError;
use storyhub_db::repositories::StoryRepository;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SweepConfig;
use crate::identity::{AccountLookup, IdentityDirectory};

/// Outcome counters of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub owners_checked: usize,
    pub orphaned: usize,
    /// Owners whose lookup was inconclusive.
    pub skipped: usize,
    pub stories_deleted: u64,
    pub contents_deleted: u64,
    /// Stories that had an orphaned account removed from their collaborators.
    pub stories_scrubbed: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("reconciliation cycle exceeded {0:?}")]
    TimedOut(Duration),
}

pub struct OrphanReconciler {
    stories: Arc<dyn StoryRepository>,
    identity: Arc<dyn IdentityDirectory>,
    interval: Duration,
    cycle_timeout: Duration,
}

impl OrphanReconciler {
    pub fn new(
        stories: Arc<dyn StoryRepository>,
        identity: Arc<dyn IdentityDirectory>,
        config: &SweepConfig,
    ) -> Self {
        Self {
            stories,
            identity,
            interval: config.interval(),
            cycle_timeout: config.timeout(),
        }
    }

    /// Run the reconciliation loop until `cancel` is triggered.
    ///
    /// Cancellation is observed between cycles only.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            cycle_timeout_secs = self.cycle_timeout.as_secs(),
            "Orphan reconciler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Orphan reconciler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => tracing::info!(
                            owners_checked = report.owners_checked,
                            orphaned = report.orphaned,
                            skipped = report.skipped,
                            stories_deleted = report.stories_deleted,
                            contents_deleted = report.contents_deleted,
                            stories_scrubbed = report.stories_scrubbed,
                            "Orphan sweep complete",
                        ),
                        Err(e) => tracing::error!(error = %e, "Orphan sweep aborted"),
                    }
                }
            }
        }
    }

    /// Run a single cycle, bounded by the cycle timeout.
    pub async fn run_cycle(&self) -> Result<SweepReport, SweepError> {
        tokio::time::timeout(self.cycle_timeout, self.sweep())
            .await
            .map_err(|_| SweepError::TimedOut(self.cycle_timeout))?
    }

    async fn sweep(&self) -> Result<SweepReport, SweepError> {
        let owners = self.stories.distinct_owners().await?;
        let mut report = SweepReport {
            owners_checked: owners.len(),
            ..SweepReport::default()
        };

        let mut orphans: Vec<ObjectId> = Vec::new();
        for owner in owners {
            match self.identity.lookup(owner).await {
                Ok(AccountLookup::Exists) => {}
                Ok(AccountLookup::Missing) => orphans.push(owner),
                Err(e) => {
                    tracing::warn!(
                        owner_id = %owner,
                        error = %e,
                        "Owner lookup inconclusive, skipping",
                    );
                    report.skipped += 1;
                }
            }
        }
        report.orphaned = orphans.len();

        if orphans.is_empty() {
            return Ok(report);
        }

        let story_ids = self.stories.story_ids_by_owners(&orphans).await?;
        report.stories_deleted = self.stories.delete_details_by_owners(&orphans).await?;
        report.contents_deleted = self.stories.delete_content_by_story_ids(&story_ids).await?;
        report.stories_scrubbed = self.stories.pull_collaborators(&orphans).await?;

        Ok(report)
    }
}
