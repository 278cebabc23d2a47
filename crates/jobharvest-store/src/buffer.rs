//! Capped, append-only buffer of scraped jobs.
//!
//! The buffer lets results survive a restart within a session. It is not
//! authoritative storage: on a quota failure it is cleared once and only the
//! current run's records are written.

use crate::error::{Result, StoreError};
use crate::kv::KvStore;
use jobharvest_core::{Job, Timestamp};
use serde_json::Value;

/// Key holding the buffered job list.
pub const JOBS_KEY: &str = "scrapedJobs";

/// Key holding the RFC3339 time of the last append.
pub const LAST_RUN_KEY: &str = "lastScrapeTime";

/// Default number of records kept.
pub const DEFAULT_CAP: usize = 1000;

/// What an append did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Records were added after the existing ones.
    Appended {
        /// Records now in the buffer
        stored: usize,
    },
    /// The store ran out of room; the buffer was cleared and now holds only
    /// this run's records.
    Reset {
        /// Records now in the buffer
        stored: usize,
    },
}

impl AppendOutcome {
    /// Records now in the buffer.
    #[must_use]
    pub fn stored(&self) -> usize {
        match self {
            AppendOutcome::Appended { stored } | AppendOutcome::Reset { stored } => *stored,
        }
    }
}

/// Append-with-cap job buffer over a [`KvStore`].
pub struct ResultBuffer<S> {
    store: S,
    cap: usize,
}

impl<S: KvStore> ResultBuffer<S> {
    /// Buffer keeping at most `cap` records (at least one).
    pub fn new(store: S, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
        }
    }

    /// Maximum number of records kept.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Append `jobs` after the buffered ones, keeping the most recent `cap`
    /// in insertion order, and stamp the last-run time when the store has
    /// room for it.
    pub async fn append(&self, jobs: &[Job]) -> Result<AppendOutcome> {
        let mut combined = self.load().await?;
        combined.extend_from_slice(jobs);
        let kept = self.keep_recent(&combined);

        let outcome = match self.store.set(JOBS_KEY, &serde_json::to_value(kept)?).await {
            Ok(()) => AppendOutcome::Appended { stored: kept.len() },
            Err(StoreError::QuotaExceeded) => {
                tracing::warn!(
                    buffered = combined.len() - jobs.len(),
                    "Result buffer over quota, clearing and keeping this run only"
                );
                self.store.remove(JOBS_KEY).await?;
                let fresh = self.keep_recent(jobs);
                self.store
                    .set(JOBS_KEY, &serde_json::to_value(fresh)?)
                    .await?;
                AppendOutcome::Reset {
                    stored: fresh.len(),
                }
            }
            Err(e) => return Err(e),
        };

        // The jobs are already saved; a missing stamp is not worth failing for
        let stamp = Value::String(Timestamp::now().to_rfc3339());
        if let Err(e) = self.store.set(LAST_RUN_KEY, &stamp).await {
            tracing::warn!("Could not record the last run time: {}", e);
        }

        tracing::debug!(added = jobs.len(), stored = outcome.stored(), "Result buffer updated");
        Ok(outcome)
    }

    /// Buffered jobs in insertion order. Entries that no longer pass the job
    /// factories are dropped.
    pub async fn load(&self) -> Result<Vec<Job>> {
        let Some(Value::Array(entries)) = self.store.get(JOBS_KEY).await? else {
            return Ok(Vec::new());
        };

        let total = entries.len();
        let jobs: Vec<Job> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if jobs.len() < total {
            tracing::warn!(dropped = total - jobs.len(), "Skipped unreadable buffered jobs");
        }
        Ok(jobs)
    }

    /// Time of the last successful append.
    pub async fn last_run(&self) -> Result<Option<Timestamp>> {
        match self.store.get(LAST_RUN_KEY).await? {
            Some(Value::String(s)) => Ok(Timestamp::from_rfc3339(&s).ok()),
            _ => Ok(None),
        }
    }

    /// Drop every buffered job and the last-run time.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(JOBS_KEY).await?;
        self.store.remove(LAST_RUN_KEY).await?;
        tracing::info!("Result buffer cleared");
        Ok(())
    }

    fn keep_recent<'a>(&self, jobs: &'a [Job]) -> &'a [Job] {
        &jobs[jobs.len().saturating_sub(self.cap)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use jobharvest_core::JobDraft;

    fn job(n: usize) -> Job {
        Job::seek(JobDraft {
            title: format!("Engineer {n}"),
            company: "Acme".to_string(),
            job_url: format!("https://www.seek.com.au/job/{n}"),
            ..JobDraft::default()
        })
        .unwrap()
    }

    fn titles(jobs: &[Job]) -> Vec<String> {
        jobs.iter().map(|j| j.title().to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_and_load() {
        let buffer = ResultBuffer::new(MemoryStore::new(), DEFAULT_CAP);
        assert!(buffer.load().await.unwrap().is_empty());
        assert!(buffer.last_run().await.unwrap().is_none());

        buffer.append(&[job(1), job(2)]).await.unwrap();
        let outcome = buffer.append(&[job(3)]).await.unwrap();

        assert_eq!(outcome, AppendOutcome::Appended { stored: 3 });
        assert_eq!(
            titles(&buffer.load().await.unwrap()),
            vec!["Engineer 1", "Engineer 2", "Engineer 3"]
        );
        assert!(buffer.last_run().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cap_keeps_most_recent() {
        let buffer = ResultBuffer::new(MemoryStore::new(), 3);
        let jobs: Vec<Job> = (0..5).map(job).collect();
        buffer.append(&jobs).await.unwrap();

        let loaded = buffer.load().await.unwrap();
        assert_eq!(titles(&loaded), vec!["Engineer 2", "Engineer 3", "Engineer 4"]);

        buffer.append(&[job(5)]).await.unwrap();
        let loaded = buffer.load().await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[2].title(), "Engineer 5");
    }

    #[tokio::test]
    async fn test_quota_resets_to_current_run() {
        let one = serde_json::to_value(vec![job(0)]).unwrap().to_string().len();
        // Room for roughly two records plus the timestamp
        let buffer = ResultBuffer::new(MemoryStore::with_quota(one * 2 + 64), DEFAULT_CAP);

        buffer.append(&[job(1)]).await.unwrap();
        buffer.append(&[job(2)]).await.unwrap();
        let outcome = buffer.append(&[job(3)]).await.unwrap();

        assert_eq!(outcome, AppendOutcome::Reset { stored: 1 });
        assert_eq!(titles(&buffer.load().await.unwrap()), vec!["Engineer 3"]);
    }

    #[tokio::test]
    async fn test_quota_failure_after_reset_propagates() {
        let buffer = ResultBuffer::new(MemoryStore::with_quota(8), DEFAULT_CAP);
        let err = buffer.append(&[job(1)]).await.unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded));
    }

    #[tokio::test]
    async fn test_stamp_failure_keeps_saved_jobs() {
        let one = serde_json::to_value(vec![job(0)]).unwrap().to_string().len();
        // The record fits but the timestamp does not
        let buffer = ResultBuffer::new(MemoryStore::with_quota(one + 4), DEFAULT_CAP);

        let outcome = buffer.append(&[job(1)]).await.unwrap();

        assert_eq!(outcome, AppendOutcome::Appended { stored: 1 });
        assert_eq!(titles(&buffer.load().await.unwrap()), vec!["Engineer 1"]);
        assert!(buffer.last_run().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let buffer = ResultBuffer::new(MemoryStore::new(), DEFAULT_CAP);
        buffer.append(&[job(1)]).await.unwrap();
        buffer.clear().await.unwrap();
        assert!(buffer.load().await.unwrap().is_empty());
        assert!(buffer.last_run().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_skips_invalid_entries() {
        let store = MemoryStore::new();
        let valid = serde_json::to_value(job(1)).unwrap();
        let invalid = serde_json::json!({"title": "", "company": "X", "jobUrl": "u", "platform": "SEEK"});
        store
            .set(JOBS_KEY, &serde_json::json!([valid, invalid]))
            .await
            .unwrap();

        let buffer = ResultBuffer::new(store, DEFAULT_CAP);
        assert_eq!(buffer.load().await.unwrap().len(), 1);
    }
}
