//! Pool of reusable render sessions.
//!
//! Each worker owns one open session. A job borrows a worker through a
//! [`WorkerGuard`]; dropping the guard puts the worker back, so a worker is
//! released on every exit path, including errors and panics.
//!
//! Availability is tracked by a semaphore with one permit per worker plus a
//! list of idle workers. A caller first takes a permit (waiting
//! asynchronously, up to a deadline) and then pops an idle worker; a worker is
//! pushed back before its permit is returned, so a permit holder always finds
//! one. Waiters are served roughly in arrival order.
//!
//! ```text
//!   acquire() ──► permit ──► pop idle ──► Busy ──► drop guard ──► push idle ──► permit back
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::{Notify, Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use super::backend::{CaptureRegion, RenderBackend};
use crate::error::{PoolError, RenderError};

/// Default number of render workers.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Default time to wait for an idle worker.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Worker
// =============================================================================

/// A render session owned by the pool.
#[derive(Debug)]
pub struct Worker<S> {
    id: usize,
    session: S,
}

/// Exclusive use of one worker. The worker returns to the pool on drop.
pub struct WorkerGuard<'a, B: RenderBackend> {
    pool: &'a WorkerPool<B>,
    worker: Option<Worker<B::Session>>,
    _permit: SemaphorePermit<'a>,
}

impl<B: RenderBackend> WorkerGuard<'_, B> {
    /// Identifier of the worker, stable for the pool's lifetime.
    pub fn id(&self) -> usize {
        self.worker.as_ref().map(|w| w.id).unwrap_or_default()
    }

    pub fn session(&self) -> Option<&B::Session> {
        self.worker.as_ref().map(|w| &w.session)
    }

    pub fn session_mut(&mut self) -> Option<&mut B::Session> {
        self.worker.as_mut().map(|w| &mut w.session)
    }
}

impl<B: RenderBackend> Drop for WorkerGuard<'_, B> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            debug!("Releasing render worker {}", worker.id);
            self.pool.idle().push(worker);
            self.pool.returned.notify_one();
        }
        // The permit field is dropped after this, once the worker is idle again.
    }
}

// =============================================================================
// Worker Pool
// =============================================================================

/// Fixed-size pool of render sessions.
pub struct WorkerPool<B: RenderBackend> {
    backend: Arc<B>,
    idle: Mutex<Vec<Worker<B::Session>>>,
    permits: Semaphore,
    returned: Notify,
    size: usize,
    acquire_timeout: Duration,
    closed: AtomicBool,
}

impl<B: RenderBackend> WorkerPool<B> {
    /// Open `size` sessions showing `initial_markup`.
    ///
    /// If any session fails to open, the ones already opened are closed and
    /// the error is returned. A size of 0 is treated as 1.
    pub async fn start(
        backend: Arc<B>,
        size: usize,
        initial_markup: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, RenderError> {
        let size = size.max(1);
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            match backend.create_session(initial_markup).await {
                Ok(session) => workers.push(Worker { id, session }),
                Err(e) => {
                    warn!("Failed to open render session {}: {}", id, e);
                    for worker in workers {
                        if let Err(close_err) = backend.close(worker.session).await {
                            warn!("Failed to close render session {}: {}", worker.id, close_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!("Render pool started with {} worker(s)", size);

        // Pop from the back, so reverse to hand out worker 0 first.
        workers.reverse();

        Ok(Self {
            backend,
            idle: Mutex::new(workers),
            permits: Semaphore::new(size),
            returned: Notify::new(),
            size,
            acquire_timeout,
            closed: AtomicBool::new(false),
        })
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Worker<B::Session>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a worker, waiting up to the pool's acquire timeout.
    pub async fn acquire(&self) -> Result<WorkerGuard<'_, B>, PoolError> {
        self.acquire_within(self.acquire_timeout).await
    }

    /// Take a worker, waiting up to `timeout`.
    ///
    /// Fails with [`PoolError::Exhausted`] when the deadline passes and with
    /// [`PoolError::Closed`] once the pool is shutting down.
    pub async fn acquire_within(&self, timeout: Duration) -> Result<WorkerGuard<'_, B>, PoolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let started = Instant::now();
        let permit = match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => {
                return Err(PoolError::Exhausted {
                    waited_ms: started.elapsed().as_millis() as u64,
                })
            }
        };

        let Some(worker) = self.idle().pop() else {
            return Err(PoolError::Closed);
        };
        debug!(
            "Acquired render worker {} after {:?}",
            worker.id,
            started.elapsed()
        );

        Ok(WorkerGuard {
            pool: self,
            worker: Some(worker),
            _permit: permit,
        })
    }

    /// Render `markup` on a worker and capture it as an image.
    ///
    /// The worker is released before this returns, whether or not the job
    /// succeeded.
    pub async fn render_image(&self, markup: &str, quality: u8) -> Result<Bytes, PoolError> {
        let mut guard = self.acquire().await?;
        let session = guard.session_mut().ok_or(PoolError::Closed)?;

        let dimensions = self.backend.render(session, markup).await?;
        let image = self
            .backend
            .capture(session, CaptureRegion::from(dimensions), quality)
            .await?;

        debug!(
            "Captured {}x{} ({} bytes) on worker {}",
            dimensions.width,
            dimensions.height,
            image.len(),
            guard.id()
        );
        Ok(image)
    }

    /// Shut the pool down.
    ///
    /// Waiting and future acquisitions fail with [`PoolError::Closed`].
    /// Idle sessions are closed right away; busy ones as their jobs release
    /// them. Returns the first close error, after attempting every session.
    pub async fn close(&self) -> Result<(), RenderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.permits.close();

        let mut remaining = self.size;
        let mut first_error = None;
        while remaining > 0 {
            let workers: Vec<_> = self.idle().drain(..).collect();
            if workers.is_empty() {
                debug!("Waiting for {} busy render worker(s)", remaining);
                self.returned.notified().await;
                continue;
            }
            for worker in workers {
                remaining -= 1;
                if let Err(e) = self.backend.close(worker.session).await {
                    warn!("Failed to close render session {}: {}", worker.id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!("Render pool closed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not currently running a job.
    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    /// Workers currently running a job.
    pub fn busy_count(&self) -> usize {
        self.size - self.idle_count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

// =============================================================================
// Tests
// =============================================================================
