//! In-memory job ledger.

use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

use super::types::{Job, JobFailure, JobId, JobKind, JobStatus};

/// Filter for listing jobs.
#[derive(Debug, Clone)]
pub struct JobFilter {
    /// Filter by status.
    pub status: Option<JobStatus>,
    /// Filter by kind.
    pub kind: Option<JobKind>,
    /// Maximum number of results.
    pub limit: usize,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFilter {
    /// Create a new filter with defaults.
    pub fn new() -> Self {
        Self {
            status: None,
            kind: None,
            limit: 100,
        }
    }

    /// Filter by status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by kind.
    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|s| job.status == s) && self.kind.is_none_or(|k| job.kind == k)
    }
}

/// Concurrency-safe table of jobs.
///
/// Each entry is the receiving side of a per-job watch channel; the sending
/// side lives in the job's [`JobWriter`]. Writes to one job never touch the
/// table lock, so unrelated jobs do not contend. Entries are never evicted.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, watch::Receiver<Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new `Pending` job and returns its id with its only writer.
    pub async fn create(&self, kind: JobKind) -> (JobId, JobWriter) {
        let id = JobId::generate();
        let (tx, rx) = watch::channel(Job::new(id.clone(), kind));

        self.jobs.write().await.insert(id.clone(), rx);
        debug!(job_id = %id, kind = %kind, "job created");

        (id.clone(), JobWriter { id, tx })
    }

    /// Returns a snapshot of the job, if it exists.
    pub async fn get(&self, id: &JobId) -> Option<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(id).map(|rx| rx.borrow().clone())
    }

    /// Returns a change feed for one job.
    pub async fn subscribe(&self, id: &JobId) -> Option<watch::Receiver<Job>> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Waits until the job reaches a terminal state and returns the final snapshot.
    ///
    /// Returns immediately when the job is already terminal. `None` if the id
    /// is unknown.
    pub async fn wait_terminal(&self, id: &JobId) -> Option<Job> {
        let mut rx = self.subscribe(id).await?;

        let terminal = rx
            .wait_for(|job| job.is_terminal())
            .await
            .map(|job| job.clone());

        match terminal {
            Ok(job) => Some(job),
            // Writer is gone; its drop guard has already published a terminal state.
            Err(_) => Some(rx.borrow().clone()),
        }
    }

    /// Lists job snapshots matching the filter, oldest first.
    pub async fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let mut jobs: Vec<Job> = {
            let table = self.jobs.read().await;
            table
                .values()
                .map(|rx| rx.borrow().clone())
                .filter(|job| filter.matches(job))
                .collect()
        };

        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs.truncate(filter.limit);
        jobs
    }

    /// Counts jobs matching the filter, ignoring its limit.
    pub async fn count(&self, filter: &JobFilter) -> usize {
        let table = self.jobs.read().await;
        table
            .values()
            .filter(|rx| filter.matches(&rx.borrow()))
            .count()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

/// Exclusive mutation handle for one job.
///
/// Not `Clone`: the task holding it is the job's single writer. `complete`
/// and `fail` consume the writer. Dropping it before a terminal transition
/// marks the job failed so waiters are released.
#[derive(Debug)]
pub struct JobWriter {
    id: JobId,
    tx: watch::Sender<Job>,
}

impl JobWriter {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn snapshot(&self) -> Job {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> JobStatus {
        self.tx.borrow().status
    }

    /// `Pending -> Running`. Returns false if the job was not pending.
    pub fn mark_running(&mut self) -> bool {
        self.tx.send_if_modified(|job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            true
        })
    }

    /// Marks the job completed with its output path.
    pub fn complete(self, path: PathBuf) -> Job {
        self.tx.send_modify(|job| {
            job.status = JobStatus::Completed;
            job.result_path = Some(path);
            job.failure = None;
            job.finished_at = Some(Utc::now());
        });
        self.snapshot()
    }

    /// Marks the job failed.
    pub fn fail(self, failure: JobFailure) -> Job {
        self.publish_failure(failure);
        self.snapshot()
    }

    fn publish_failure(&self, failure: JobFailure) {
        self.tx.send_modify(|job| {
            job.status = JobStatus::Failed;
            job.result_path = None;
            job.failure = Some(failure);
            job.finished_at = Some(Utc::now());
        });
    }
}

impl Drop for JobWriter {
    fn drop(&mut self) {
        if self.tx.borrow().is_terminal() {
            return;
        }
        warn!(job_id = %self.id, "job writer dropped before terminal state");
        self.publish_failure(JobFailure::execution("job abandoned before completion"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::FailureKind;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = JobStore::new();
        let (id, writer) = store.create(JobKind::Download).await;

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(writer.id(), &id);
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let store = JobStore::new();
        assert!(store.get(&JobId::from("missing")).await.is_none());
        assert!(store.wait_terminal(&JobId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn test_writer_lifecycle() {
        let store = JobStore::new();
        let (id, mut writer) = store.create(JobKind::Extract).await;

        assert!(writer.mark_running());
        assert!(!writer.mark_running());
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Running);

        let final_job = writer.complete(PathBuf::from("processed/out.mp3"));
        assert_eq!(final_job.status, JobStatus::Completed);

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.result_path, Some(PathBuf::from("processed/out.mp3")));
        assert!(job.failure.is_none());
        assert!(job.started_at.is_some());
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_fail_from_pending() {
        let store = JobStore::new();
        let (id, writer) = store.create(JobKind::Extract).await;

        writer.fail(JobFailure::worker_unavailable("gate saturated"));

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.result_path.is_none());
        assert_eq!(job.failure.unwrap().kind, FailureKind::WorkerUnavailable);
        assert!(job.started_at.is_none());
    }

    #[tokio::test]
    async fn test_dropped_writer_fails_job() {
        let store = JobStore::new();
        let (id, mut writer) = store.create(JobKind::Download).await;
        writer.mark_running();
        drop(writer);

        let job = store.get(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.failure.unwrap().kind, FailureKind::ExecutionError);
    }

    #[tokio::test]
    async fn test_wait_terminal_already_finished() {
        let store = JobStore::new();
        let (id, writer) = store.create(JobKind::Extract).await;
        writer.complete(PathBuf::from("a.mp3"));

        let job = tokio::time::timeout(Duration::from_millis(100), store.wait_terminal(&id))
            .await
            .expect("should not block")
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_wait_terminal_woken_by_transition() {
        let store = JobStore::new();
        let (id, writer) = store.create(JobKind::Extract).await;

        let mut wait = tokio_test::task::spawn(store.wait_terminal(&id));
        tokio_test::assert_pending!(wait.poll());

        writer.complete(PathBuf::from("processed/out.mp3"));
        assert!(wait.is_woken());

        let job = tokio_test::assert_ready!(wait.poll()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_many_waiters_released_by_single_transition() {
        let store = Arc::new(JobStore::new());
        let (id, mut writer) = store.create(JobKind::Extract).await;

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move { store.wait_terminal(&id).await })
            })
            .collect();

        writer.mark_running();
        tokio::time::sleep(Duration::from_millis(20)).await;
        for waiter in &waiters {
            assert!(!waiter.is_finished());
        }

        writer.fail(JobFailure::execution("boom"));

        for waiter in waiters {
            let job = waiter.await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.failure.unwrap().message, "boom");
        }
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let store = JobStore::new();
        let (_, w1) = store.create(JobKind::Download).await;
        let (_, mut w2) = store.create(JobKind::Extract).await;
        let (_, _w3) = store.create(JobKind::Extract).await;

        w2.mark_running();
        w1.complete(PathBuf::from("x.mp4"));

        assert_eq!(store.len().await, 3);
        assert_eq!(store.count(&JobFilter::new()).await, 3);
        assert_eq!(
            store
                .count(&JobFilter::new().with_status(JobStatus::Completed))
                .await,
            1
        );
        assert_eq!(
            store
                .count(&JobFilter::new().with_kind(JobKind::Extract))
                .await,
            2
        );

        let listed = store.list(&JobFilter::new().with_limit(2)).await;
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at <= listed[1].created_at);
    }
}
