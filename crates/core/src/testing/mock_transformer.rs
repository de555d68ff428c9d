//! Mock transformer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::StorageConfig;
use crate::job::JobId;
use crate::transformer::{ClipRequest, TransformError, Transformer};

/// Transformer operation kinds, for recording and error injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Fetch,
    Clip,
    FetchAudio,
}

/// A recorded transformer call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub operation: MockOperation,
    pub job_id: JobId,
    /// URL for fetches, input path for clips.
    pub input: String,
}

struct MockState {
    uploads_dir: PathBuf,
    processed_dir: PathBuf,
    calls: Mutex<Vec<RecordedCall>>,
    /// Queued errors per operation, consumed in order.
    errors: Mutex<HashMap<MockOperation, VecDeque<TransformError>>>,
    /// If set, the next operation of any kind fails with this error.
    next_error: Mutex<Option<TransformError>>,
    delay: Mutex<Duration>,
    blocking: AtomicBool,
    blocked: AtomicUsize,
    unblock: Semaphore,
    active: AtomicUsize,
    peak: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock implementation of the Transformer trait.
///
/// Provides controllable behavior for testing:
/// - Record every call for assertions
/// - Inject failures per operation
/// - Simulate slow work, or block until released
/// - Track how many operations run at once
///
/// Every operation honors its cancellation token and returns
/// [`TransformError::Cancelled`] once it fires. Nothing touches the
/// filesystem; outputs are named after the job id.
///
/// # Example
///
/// ```rust,ignore
/// use baggins_core::testing::MockTransformer;
///
/// let transformer = MockTransformer::new();
/// transformer.set_blocking(true);
///
/// // ... submit jobs, they all park inside the transformer ...
/// assert_eq!(transformer.active_count(), 5);
///
/// transformer.release_all();
/// ```
#[derive(Clone)]
pub struct MockTransformer {
    state: Arc<MockState>,
}

impl std::fmt::Debug for MockTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransformer")
            .field("active", &self.active_count())
            .field("peak", &self.peak_concurrency())
            .finish()
    }
}

impl Default for MockTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransformer {
    /// Create a new mock transformer using the default storage layout.
    pub fn new() -> Self {
        Self::with_storage(&StorageConfig::default())
    }

    /// Create a mock that names outputs under the given directories.
    pub fn with_storage(storage: &StorageConfig) -> Self {
        Self {
            state: Arc::new(MockState {
                uploads_dir: storage.uploads_dir.clone(),
                processed_dir: storage.processed_dir.clone(),
                calls: Mutex::new(Vec::new()),
                errors: Mutex::new(HashMap::new()),
                next_error: Mutex::new(None),
                delay: Mutex::new(Duration::from_millis(10)),
                blocking: AtomicBool::new(false),
                blocked: AtomicUsize::new(0),
                unblock: Semaphore::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Get all recorded calls.
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    /// Number of calls of one operation.
    pub fn call_count(&self, operation: MockOperation) -> usize {
        lock(&self.state.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.call_count(MockOperation::Fetch)
    }

    pub fn clip_count(&self) -> usize {
        self.call_count(MockOperation::Clip)
    }

    /// Queue an error for the next call of `operation`.
    pub fn push_error(&self, operation: MockOperation, error: TransformError) {
        lock(&self.state.errors)
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Configure the next operation of any kind to fail with the given error.
    pub fn set_next_error(&self, error: TransformError) {
        *lock(&self.state.next_error) = Some(error);
    }

    /// Set the simulated duration of every operation.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.state.delay) = delay;
    }

    /// When enabled, operations park until [`Self::release`] or
    /// [`Self::release_all`] lets them through.
    pub fn set_blocking(&self, blocking: bool) {
        self.state.blocking.store(blocking, Ordering::SeqCst);
    }

    /// Let `n` parked operations finish.
    pub fn release(&self, n: usize) {
        self.state.unblock.add_permits(n);
    }

    /// Stop blocking and let every parked operation finish.
    pub fn release_all(&self) {
        self.state.blocking.store(false, Ordering::SeqCst);
        let parked = self.state.blocked.load(Ordering::SeqCst);
        if parked > 0 {
            self.state.unblock.add_permits(parked);
        }
    }

    /// Operations currently inside the transformer.
    pub fn active_count(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Highest number of operations ever inside the transformer at once.
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    /// Poll until exactly `n` operations are active. Returns false on timeout.
    pub async fn wait_for_active(&self, n: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.active_count() != n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    fn take_error(&self, operation: MockOperation) -> Option<TransformError> {
        let queued = lock(&self.state.errors)
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front());
        queued.or_else(|| lock(&self.state.next_error).take())
    }

    fn record(&self, operation: MockOperation, job_id: &JobId, input: String) {
        lock(&self.state.calls).push(RecordedCall {
            operation,
            job_id: job_id.clone(),
            input,
        });
    }

    /// Simulated work shared by all operations.
    async fn work(
        &self,
        operation: MockOperation,
        cancel: &CancellationToken,
    ) -> Result<(), TransformError> {
        let _active = ActiveGuard::enter(&self.state);

        // Count ourselves before checking the flag so release_all cannot miss us.
        self.state.blocked.fetch_add(1, Ordering::SeqCst);
        if !self.state.blocking.load(Ordering::SeqCst) {
            self.state.blocked.fetch_sub(1, Ordering::SeqCst);
        } else {
            let released = tokio::select! {
                _ = cancel.cancelled() => None,
                permit = self.state.unblock.acquire() => permit.ok(),
            };
            self.state.blocked.fetch_sub(1, Ordering::SeqCst);
            match released {
                Some(permit) => permit.forget(),
                None => return Err(TransformError::Cancelled),
            }
        }

        let delay = *lock(&self.state.delay);
        tokio::select! {
            _ = cancel.cancelled() => return Err(TransformError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        match self.take_error(operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fetched_path(&self, job_id: &JobId, url: &str) -> PathBuf {
        let ext = Path::new(url)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("mp4");
        self.state
            .uploads_dir
            .join(format!("{}.{}", job_id, ext))
    }

    fn audio_path(&self, job_id: &JobId) -> PathBuf {
        self.state.processed_dir.join(format!("{}.mp3", job_id))
    }
}

/// Tracks one operation inside the transformer, including ones dropped mid-flight.
struct ActiveGuard<'a> {
    state: &'a MockState,
}

impl<'a> ActiveGuard<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.active.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak.fetch_max(now, Ordering::SeqCst);
        Self { state }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transformer for MockTransformer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        job_id: &JobId,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError> {
        self.record(MockOperation::Fetch, job_id, url.to_string());
        self.work(MockOperation::Fetch, &cancel).await?;
        Ok(self.fetched_path(job_id, url))
    }

    async fn clip(
        &self,
        request: &ClipRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError> {
        self.record(
            MockOperation::Clip,
            &request.job_id,
            request.input_path.display().to_string(),
        );
        self.work(MockOperation::Clip, &cancel).await?;
        Ok(self.audio_path(&request.job_id))
    }

    async fn fetch_and_extract_audio(
        &self,
        job_id: &JobId,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<PathBuf, TransformError> {
        self.record(MockOperation::FetchAudio, job_id, url.to_string());
        self.work(MockOperation::FetchAudio, &cancel).await?;
        Ok(self.audio_path(job_id))
    }
}
