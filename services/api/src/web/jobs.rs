//! services/api/src/web/jobs.rs
//!
//! Registry of running analyses, keyed by document id. Background jobs and
//! analyses awaited inline by a request share it, so a document is never
//! analysed twice at once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

const DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// `None` marks an analysis awaited inline by a request handler.
type Slot = Option<JoinHandle<()>>;

#[derive(Clone, Default)]
pub struct AnalysisJobs {
    inner: Arc<Mutex<HashMap<Uuid, Slot>>>,
}

/// Holds a document's registry entry and drops it when the run ends,
/// including on panic or cancellation.
pub struct JobClaim {
    jobs: AnalysisJobs,
    document_id: Uuid,
}

impl Drop for JobClaim {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.document_id);
    }
}

impl AnalysisJobs {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Slot>> {
        // A poisoned map is still consistent: entries are only inserted or removed.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserves `document_id` for an analysis run by the caller.
    /// Returns `None` when the document is busy.
    pub fn claim(&self, document_id: Uuid) -> Option<JobClaim> {
        let mut running = self.lock();
        if running.contains_key(&document_id) {
            return None;
        }
        running.insert(document_id, None);
        Some(JobClaim {
            jobs: self.clone(),
            document_id,
        })
    }

    /// Spawns `job` for `document_id` unless one is already in flight.
    /// Returns `false` without spawning when the document is busy.
    pub fn spawn<F>(&self, document_id: Uuid, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.lock();
        if running.contains_key(&document_id) {
            return false;
        }
        let claim = JobClaim {
            jobs: self.clone(),
            document_id,
        };
        // The task cannot deregister before this insert: it needs the lock we hold.
        let handle = tokio::spawn(async move {
            let _claim = claim;
            job.await;
        });
        running.insert(document_id, Some(handle));
        true
    }

    pub fn is_running(&self, document_id: Uuid) -> bool {
        self.lock().contains_key(&document_id)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Waits up to `grace` for background jobs to finish, then aborts the rest.
    ///
    /// Returns the documents whose job was cut short. Every returned job has
    /// fully stopped by the time this resolves.
    pub async fn drain(&self, grace: Duration) -> Vec<Uuid> {
        let deadline = Instant::now() + grace;
        while self.in_flight() > 0 && Instant::now() < deadline {
            tokio::time::sleep(DRAIN_CHECK_INTERVAL).await;
        }

        let detached: Vec<(Uuid, JoinHandle<()>)> = {
            let mut running = self.lock();
            let ids: Vec<Uuid> = running
                .iter()
                .filter(|(_, slot)| slot.is_some())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| running.remove(&id).flatten().map(|handle| (id, handle)))
                .collect()
        };

        let mut aborted = Vec::with_capacity(detached.len());
        for (document_id, handle) in detached {
            handle.abort();
            // Ok means the job finished on its own between the last check and the abort.
            if handle.await.is_err() {
                aborted.push(document_id);
            }
        }
        aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn second_job_for_same_document_is_rejected() {
        let jobs = AnalysisJobs::default();
        let id = Uuid::new_v4();
        let (release, wait) = oneshot::channel::<()>();

        assert!(jobs.spawn(id, async move {
            let _ = wait.await;
        }));
        assert!(!jobs.spawn(id, async {}));
        assert!(jobs.claim(id).is_none());
        assert!(jobs.spawn(Uuid::new_v4(), async {}));

        release.send(()).unwrap();
        for _ in 0..100 {
            if !jobs.is_running(id) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!jobs.is_running(id));
        assert!(jobs.spawn(id, async {}));
    }

    #[tokio::test]
    async fn claim_blocks_background_jobs_until_dropped() {
        let jobs = AnalysisJobs::default();
        let id = Uuid::new_v4();

        let claim = jobs.claim(id).unwrap();
        assert!(jobs.is_running(id));
        assert!(!jobs.spawn(id, async {}));

        drop(claim);
        assert!(!jobs.is_running(id));
        assert!(jobs.claim(id).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_quick_jobs_and_aborts_stuck_ones() {
        let jobs = AnalysisJobs::default();
        let quick = Uuid::new_v4();
        let stuck = Uuid::new_v4();
        jobs.spawn(quick, tokio::time::sleep(Duration::from_millis(200)));
        jobs.spawn(stuck, std::future::pending());

        let aborted = jobs.drain(Duration::from_secs(1)).await;

        assert_eq!(aborted, vec![stuck]);
        assert_eq!(jobs.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_leaves_inline_runs_to_their_handler() {
        let jobs = AnalysisJobs::default();
        let id = Uuid::new_v4();
        let _claim = jobs.claim(id).unwrap();

        assert!(jobs.drain(Duration::from_millis(100)).await.is_empty());
        assert!(jobs.is_running(id));
    }
}
