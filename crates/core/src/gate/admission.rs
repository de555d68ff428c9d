//! Semaphore-backed gate with a per-job cancellation registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::job::JobId;
use crate::metrics::{ADMISSION_WAIT, GATE_ACTIVE, JOBS_CANCELLED};

use super::types::{GateError, GateStatus};

/// Registry entry for one admitted job.
struct Registration {
    token: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct GateStats {
    waiting: AtomicUsize,
    total_admitted: AtomicU64,
    total_timed_out: AtomicU64,
    total_cancelled: AtomicU64,
}

struct GateInner {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    registry: Mutex<HashMap<JobId, Registration>>,
    next_generation: AtomicU64,
    stats: GateStats,
}

impl GateInner {
    fn registry(&self) -> MutexGuard<'_, HashMap<JobId, Registration>> {
        // Entries are plain data; a panic while holding the lock cannot leave them torn.
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Caps concurrent operations and lets any admitted one be cancelled by job id.
///
/// Cloning is cheap and shares the same slots and registry.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("capacity", &self.inner.capacity)
            .field("active", &self.active_count())
            .finish()
    }
}

impl ConcurrencyGate {
    /// Creates a gate with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                capacity,
                semaphore: Arc::new(Semaphore::new(capacity)),
                registry: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                stats: GateStats::default(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Waits for a free slot.
    ///
    /// Fails with `DeadlineExceeded` when no slot frees up within `deadline`,
    /// or `Cancelled` when `parent` is cancelled first. On success the job is
    /// registered with a child token of `parent` until the returned
    /// [`Admission`] is released or dropped.
    pub async fn admit(
        &self,
        job_id: &JobId,
        parent: &CancellationToken,
        deadline: Duration,
    ) -> Result<Admission, GateError> {
        if parent.is_cancelled() {
            return Err(GateError::Cancelled);
        }

        let inner = &self.inner;
        let started = Instant::now();
        inner.stats.waiting.fetch_add(1, Ordering::Relaxed);

        let acquired = tokio::select! {
            biased;
            _ = parent.cancelled() => Err(GateError::Cancelled),
            result = tokio::time::timeout(deadline, Arc::clone(&inner.semaphore).acquire_owned()) => {
                match result {
                    Ok(Ok(permit)) => Ok(permit),
                    Ok(Err(_)) => Err(GateError::Closed),
                    Err(_) => Err(GateError::DeadlineExceeded { waited: deadline }),
                }
            }
        };

        inner.stats.waiting.fetch_sub(1, Ordering::Relaxed);
        let waited = started.elapsed().as_secs_f64();

        let permit = match acquired {
            Ok(permit) => permit,
            Err(e) => {
                let label = match e {
                    GateError::DeadlineExceeded { .. } => {
                        inner.stats.total_timed_out.fetch_add(1, Ordering::Relaxed);
                        "deadline_exceeded"
                    }
                    _ => "cancelled",
                };
                ADMISSION_WAIT.with_label_values(&[label]).observe(waited);
                warn!(job_id = %job_id, error = %e, "admission failed");
                return Err(e);
            }
        };

        let token = parent.child_token();
        let generation = inner.next_generation.fetch_add(1, Ordering::Relaxed);
        inner.registry().insert(
            job_id.clone(),
            Registration {
                token: token.clone(),
                generation,
            },
        );

        inner.stats.total_admitted.fetch_add(1, Ordering::Relaxed);
        ADMISSION_WAIT.with_label_values(&["admitted"]).observe(waited);
        GATE_ACTIVE.inc();
        debug!(job_id = %job_id, waited_secs = waited, "admitted");

        Ok(Admission {
            job_id: job_id.clone(),
            token,
            generation,
            permit: Some(permit),
            inner: Arc::clone(inner),
        })
    }

    /// Cancels the admitted operation of `job_id` and drops its registry entry.
    ///
    /// Returns whether an entry existed. The slot itself comes back once the
    /// owner drops its [`Admission`].
    pub fn cancel(&self, job_id: &JobId) -> bool {
        let removed = self.inner.registry().remove(job_id);
        match removed {
            Some(registration) => {
                registration.token.cancel();
                self.inner
                    .stats
                    .total_cancelled
                    .fetch_add(1, Ordering::Relaxed);
                JOBS_CANCELLED.inc();
                debug!(job_id = %job_id, "admitted job cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether `job_id` currently holds a slot.
    pub fn is_admitted(&self, job_id: &JobId) -> bool {
        self.inner.registry().contains_key(job_id)
    }

    /// Slots currently held. A snapshot; may be stale under churn.
    pub fn active_count(&self) -> usize {
        self.inner
            .capacity
            .saturating_sub(self.inner.semaphore.available_permits())
    }

    pub fn status(&self) -> GateStatus {
        let stats = &self.inner.stats;
        GateStatus {
            capacity: self.inner.capacity,
            active: self.active_count(),
            waiting: stats.waiting.load(Ordering::Relaxed),
            total_admitted: stats.total_admitted.load(Ordering::Relaxed),
            total_timed_out: stats.total_timed_out.load(Ordering::Relaxed),
            total_cancelled: stats.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// One held gate slot.
///
/// Releasing (or dropping) cancels the job's scope, removes its registry
/// entry if [`ConcurrencyGate::cancel`] has not already done so, and returns
/// the slot.
pub struct Admission {
    job_id: JobId,
    token: CancellationToken,
    generation: u64,
    permit: Option<OwnedSemaphorePermit>,
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admission")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Admission {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Cancellation scope of the admitted operation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the slot to the gate.
    pub fn release(self) {}
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.token.cancel();

        {
            let mut registry = self.inner.registry();
            let ours = registry
                .get(&self.job_id)
                .is_some_and(|r| r.generation == self.generation);
            if ours {
                registry.remove(&self.job_id);
            }
        }

        if self.permit.take().is_some() {
            GATE_ACTIVE.dec();
        }
        debug!(job_id = %self.job_id, "slot released");
    }
}
