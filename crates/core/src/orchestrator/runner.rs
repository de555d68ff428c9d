//! Job orchestrator implementation.
//!
//! Each submitted job gets its own tokio task. The task waits for a gate slot,
//! runs one transformer stage under the slot's cancellation token, releases
//! the slot, and for fetches with a requested segment launches a chained
//! extract job and mirrors its outcome.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gate::{Admission, ConcurrencyGate, GateError};
use crate::job::{
    FailureKind, Job, JobFailure, JobFilter, JobId, JobKind, JobStatus, JobStore, JobWriter,
};
use crate::metrics::{JOBS_FINISHED, JOBS_SUBMITTED, JOB_DURATION};
use crate::transformer::{ClipRequest, Segment, TransformError, Transformer};

use super::config::ProcessorConfig;
use super::types::{JobRequest, OrchestratorError, OrchestratorStatus};

/// Called with the job id and its new status on every transition.
pub type JobUpdateCallback = Arc<dyn Fn(&JobId, JobStatus) + Send + Sync>;

struct Inner {
    config: ProcessorConfig,
    store: Arc<JobStore>,
    gate: ConcurrencyGate,
    transformer: Arc<dyn Transformer>,
    root: CancellationToken,
    running: AtomicBool,
    /// Cancellation scope of every job that has not finished yet.
    scopes: Mutex<HashMap<JobId, JobScope>>,
    on_update: RwLock<Option<JobUpdateCallback>>,
}

/// Runs media jobs with bounded concurrency.
///
/// Cloning is cheap; clones share the same store, gate and tasks.
#[derive(Clone)]
pub struct JobOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobOrchestrator")
            .field("transformer", &self.inner.transformer.name())
            .field("gate", &self.inner.gate)
            .field("running", &self.is_running())
            .finish()
    }
}

impl JobOrchestrator {
    /// Create a new orchestrator with its own store and gate.
    pub fn new(config: ProcessorConfig, transformer: Arc<dyn Transformer>) -> Self {
        Self::with_store(config, transformer, Arc::new(JobStore::new()))
    }

    /// Create an orchestrator writing into an existing store.
    pub fn with_store(
        config: ProcessorConfig,
        transformer: Arc<dyn Transformer>,
        store: Arc<JobStore>,
    ) -> Self {
        info!(
            "Creating job orchestrator (transformer: {}, max concurrent: {})",
            transformer.name(),
            config.max_concurrent_jobs
        );

        let gate = ConcurrencyGate::new(config.max_concurrent_jobs);
        Self {
            inner: Arc::new(Inner {
                config,
                store,
                gate,
                transformer,
                root: CancellationToken::new(),
                running: AtomicBool::new(true),
                scopes: Mutex::new(HashMap::new()),
                on_update: RwLock::new(None),
            }),
        }
    }

    /// Register a callback fired on every status transition.
    pub fn with_update_callback(self, callback: JobUpdateCallback) -> Self {
        self.set_update_callback(callback);
        self
    }

    /// Replace the status callback.
    pub fn set_update_callback(&self, callback: JobUpdateCallback) {
        *self
            .inner
            .on_update
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(callback);
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.inner.store
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.inner.gate
    }

    /// Whether submissions are still accepted.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Validate and enqueue a request. Returns as soon as the job exists.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, OrchestratorError> {
        request.validate()?;
        if !self.is_running() {
            return Err(OrchestratorError::ShuttingDown);
        }

        let (writer, scope) = self
            .inner
            .create_job(request.kind(), &self.inner.root)
            .await;
        let id = writer.id().clone();
        self.inner.launch(writer, scope, request);
        Ok(id)
    }

    /// Get a snapshot of a job.
    pub async fn get(&self, id: &JobId) -> Result<Job, OrchestratorError> {
        self.inner
            .store
            .get(id)
            .await
            .ok_or_else(|| OrchestratorError::JobNotFound(id.clone()))
    }

    /// Cancel a running job.
    ///
    /// Interrupts whatever the job is doing, including a chained job it is
    /// waiting on, and fails it with `Cancelled`. Returns false when nothing
    /// was cancelled (unknown id, still waiting for its first slot, or
    /// already finished).
    pub fn cancel(&self, id: &JobId) -> bool {
        let scope = self
            .inner
            .scopes()
            .get(id)
            .filter(|scope| scope.started)
            .map(|scope| scope.token.clone());

        match scope {
            Some(token) => {
                token.cancel();
                self.inner.gate.cancel(id);
                info!("Cancelled job {}", id);
                true
            }
            None => false,
        }
    }

    /// Wait until the job is completed or failed and return its final state.
    pub async fn await_completion(&self, id: &JobId) -> Result<Job, OrchestratorError> {
        self.inner
            .store
            .wait_terminal(id)
            .await
            .ok_or_else(|| OrchestratorError::JobNotFound(id.clone()))
    }

    /// Wait for several jobs at once. Results keep the order of `ids`.
    pub async fn await_all(&self, ids: &[JobId]) -> Vec<Result<Job, OrchestratorError>> {
        futures::future::join_all(ids.iter().map(|id| self.await_completion(id))).await
    }

    /// List job snapshots, oldest first.
    pub async fn list(&self, filter: &JobFilter) -> Vec<Job> {
        self.inner.store.list(filter).await
    }

    /// Get the current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let store = &self.inner.store;
        let count = |status: JobStatus| async move {
            store.count(&JobFilter::new().with_status(status)).await
        };

        OrchestratorStatus {
            running: self.is_running(),
            gate: self.inner.gate.status(),
            pending_count: count(JobStatus::Pending).await,
            running_count: count(JobStatus::Running).await,
            completed_count: count(JobStatus::Completed).await,
            failed_count: count(JobStatus::Failed).await,
        }
    }

    /// Stop accepting work and cancel everything in flight.
    ///
    /// Jobs waiting for a slot or running a transformer end up `Failed` with
    /// `Cancelled`. Use [`Self::await_all`] to wait for them to settle.
    pub fn shutdown(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator already shut down");
            return;
        }

        info!("Shutting down job orchestrator");
        self.inner.root.cancel();
    }
}

impl Inner {
    fn scopes(&self) -> MutexGuard<'_, HashMap<JobId, JobScope>> {
        self.scopes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, id: &JobId, status: JobStatus) {
        let callback = self
            .on_update
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(id, status);
        }
    }

    /// Creates a job whose cancellation scope is a child of `parent`.
    async fn create_job(
        &self,
        kind: JobKind,
        parent: &CancellationToken,
    ) -> (JobWriter, CancellationToken) {
        let (id, writer) = self.store.create(kind).await;
        let token = parent.child_token();
        self.scopes().insert(
            id.clone(),
            JobScope {
                token: token.clone(),
                started: false,
            },
        );

        JOBS_SUBMITTED.with_label_values(&[kind.as_str()]).inc();
        info!("Job {} ({}) submitted", id, kind);
        self.notify(&id, JobStatus::Pending);
        (writer, token)
    }

    fn launch(self: &Arc<Self>, writer: JobWriter, scope: CancellationToken, request: JobRequest) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.run_job(writer, scope, request).await;
        });
    }

    async fn run_job(
        self: Arc<Self>,
        mut writer: JobWriter,
        scope: CancellationToken,
        request: JobRequest,
    ) {
        let outcome = match request {
            JobRequest::Extract {
                input_path,
                segment,
            } => {
                self.run_extract(&mut writer, &scope, input_path, segment)
                    .await
            }
            JobRequest::Download { url, segment } => {
                self.run_fetch(&mut writer, &scope, &url, segment, FetchKind::Direct)
                    .await
            }
            JobRequest::YoutubeExtract { url, segment } => {
                self.run_fetch(&mut writer, &scope, &url, segment, FetchKind::YoutubeAudio)
                    .await
            }
        };

        self.finish(writer, outcome);
    }

    async fn run_extract(
        &self,
        writer: &mut JobWriter,
        scope: &CancellationToken,
        input_path: PathBuf,
        segment: Segment,
    ) -> Result<PathBuf, JobFailure> {
        let request = ClipRequest {
            job_id: writer.id().clone(),
            input_path,
            segment,
        };
        let transformer = &self.transformer;
        let request = &request;

        self.run_stage(writer, scope, true, FailureKind::ExecutionError, move |token| {
            transformer.clip(request, token)
        })
        .await
    }

    async fn run_fetch(
        self: &Arc<Self>,
        writer: &mut JobWriter,
        scope: &CancellationToken,
        url: &str,
        segment: Option<Segment>,
        kind: FetchKind,
    ) -> Result<PathBuf, JobFailure> {
        let id = writer.id().clone();
        let id = &id;
        let transformer = &self.transformer;

        let fetched = match kind {
            FetchKind::Direct => {
                self.run_stage(
                    writer,
                    scope,
                    self.config.gate_downloads,
                    FailureKind::DownloadError,
                    move |token| transformer.fetch(id, url, token),
                )
                .await?
            }
            FetchKind::YoutubeAudio => {
                self.run_stage(writer, scope, true, FailureKind::ExecutionError, move |token| {
                    transformer.fetch_and_extract_audio(id, url, token)
                })
                .await?
            }
        };

        match segment {
            Some(segment) => self.run_chained_clip(id, scope, fetched, segment).await,
            None => Ok(fetched),
        }
    }

    /// Runs one transformer call, admitted through the gate when `gated`.
    ///
    /// The slot is released before this returns.
    async fn run_stage<F, Fut>(
        &self,
        writer: &mut JobWriter,
        scope: &CancellationToken,
        gated: bool,
        failure_kind: FailureKind,
        op: F,
    ) -> Result<PathBuf, JobFailure>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<PathBuf, TransformError>>,
    {
        let admission = if gated {
            Some(self.admit(writer.id(), scope).await?)
        } else {
            None
        };
        let token = match &admission {
            Some(admission) => admission.token().clone(),
            None => scope.child_token(),
        };

        if writer.mark_running() {
            if let Some(entry) = self.scopes().get_mut(writer.id()) {
                entry.started = true;
            }
            debug!("Job {} running", writer.id());
            self.notify(writer.id(), JobStatus::Running);
        }

        let result = self.bounded(&token, op(token.clone())).await;
        drop(admission);

        result.map_err(|e| self.classify(&e, failure_kind))
    }

    async fn admit(&self, id: &JobId, scope: &CancellationToken) -> Result<Admission, JobFailure> {
        self.gate
            .admit(id, scope, self.config.admission_timeout())
            .await
            .map_err(|e| match e {
                GateError::DeadlineExceeded { .. } => JobFailure::worker_unavailable(e.to_string()),
                GateError::Cancelled | GateError::Closed => {
                    JobFailure::cancelled(self.cancel_reason())
                }
            })
    }

    /// Bounds a transformer call by the job timeout and its token.
    async fn bounded<Fut>(
        &self,
        token: &CancellationToken,
        op: Fut,
    ) -> Result<PathBuf, TransformError>
    where
        Fut: Future<Output = Result<PathBuf, TransformError>>,
    {
        let limit = self.config.job_timeout();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(TransformError::Cancelled),
            result = tokio::time::timeout(limit, op) => match result {
                Ok(result) => result,
                Err(_) => {
                    token.cancel();
                    Err(TransformError::Timeout {
                        timeout_secs: limit.as_secs(),
                    })
                }
            },
        }
    }

    fn classify(&self, error: &TransformError, failure_kind: FailureKind) -> JobFailure {
        match error {
            TransformError::Cancelled => JobFailure::cancelled(self.cancel_reason()),
            TransformError::Timeout { .. } => JobFailure::execution(error.to_string()),
            _ => JobFailure::new(failure_kind, error.to_string()),
        }
    }

    fn cancel_reason(&self) -> &'static str {
        if self.root.is_cancelled() {
            "orchestrator shutting down"
        } else {
            "job cancelled"
        }
    }

    /// Clips a fetched file in a separate extract job and waits for it.
    ///
    /// The caller holds no gate slot here, so the child can always be admitted.
    /// The child's scope derives from the parent's, so cancelling the parent
    /// also cancels the child.
    async fn run_chained_clip(
        self: &Arc<Self>,
        parent: &JobId,
        scope: &CancellationToken,
        input_path: PathBuf,
        segment: Segment,
    ) -> Result<PathBuf, JobFailure> {
        if !self.running.load(Ordering::SeqCst) || scope.is_cancelled() {
            return Err(JobFailure::cancelled(self.cancel_reason()));
        }

        let (child_writer, child_scope) = self.create_job(JobKind::Extract, scope).await;
        let child_id = child_writer.id().clone();
        debug!("Job {} chained extract job {}", parent, child_id);

        self.launch(
            child_writer,
            child_scope,
            JobRequest::Extract {
                input_path,
                segment,
            },
        );

        let child = tokio::select! {
            biased;
            _ = scope.cancelled() => {
                debug!("Job {} cancelled while waiting on chained job {}", parent, child_id);
                return Err(JobFailure::cancelled(self.cancel_reason()));
            }
            child = self.store.wait_terminal(&child_id) => child,
        };

        let child = child.ok_or_else(|| {
            JobFailure::chained(&child_id, &JobFailure::execution("chained job disappeared"))
        })?;

        match (child.status, child.result_path, child.failure) {
            (JobStatus::Completed, Some(path), _) => Ok(path),
            (_, _, Some(failure)) => Err(JobFailure::chained(&child_id, &failure)),
            _ => Err(JobFailure::chained(
                &child_id,
                &JobFailure::execution("chained job ended without a result"),
            )),
        }
    }

    fn finish(&self, writer: JobWriter, outcome: Result<PathBuf, JobFailure>) -> Job {
        self.scopes().remove(writer.id());

        let job = match outcome {
            Ok(path) => {
                info!("Job {} completed: {}", writer.id(), path.display());
                writer.complete(path)
            }
            Err(failure) => {
                warn!("Job {} failed: {}", writer.id(), failure);
                writer.fail(failure)
            }
        };

        let outcome = match &job.failure {
            Some(failure) => failure.kind.as_str(),
            None => "completed",
        };
        JOBS_FINISHED
            .with_label_values(&[job.kind.as_str(), outcome])
            .inc();
        if let Some(duration) = job.run_duration().and_then(|d| d.to_std().ok()) {
            JOB_DURATION
                .with_label_values(&[job.kind.as_str()])
                .observe(duration.as_secs_f64());
        }

        self.notify(&job.id, job.status);
        job
    }
}

struct JobScope {
    token: CancellationToken,
    /// Set once the job first reached `Running`.
    started: bool,
}

#[derive(Debug, Clone, Copy)]
enum FetchKind {
    Direct,
    YoutubeAudio,
}
