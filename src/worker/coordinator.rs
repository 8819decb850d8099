//! Background spectrogram worker and its request/response channel.
//!
//! The worker runs on a dedicated thread and exclusively owns registered audio,
//! registered surfaces and the computed-data cache. Each request carries a
//! correlation id; replies resolve the matching pending caller. If the thread
//! cannot be spawned, requests are served synchronously on the caller.

use super::protocol::{
    CacheKey, ComputeJob, Envelope, RenderJob, RequestId, WorkerReply, WorkerRequest,
};
use super::state::WorkerState;
use crate::render::PixelSurface;
use crate::spectrogram::SpectrogramData;
use crate::timeline::{AudioBuffer, ChunkId, ClipId};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tokio::sync::{mpsc, oneshot};

type Waiter = oneshot::Sender<Result<WorkerReply>>;
type PendingMap = Arc<Mutex<HashMap<RequestId, Waiter>>>;

enum Backend {
    Thread {
        sender: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
        handle: Mutex<Option<thread::JoinHandle<()>>>,
        shutdown: Arc<AtomicBool>,
    },
    Inline(Mutex<Option<WorkerState>>),
}

/// Handle to the spectrogram worker.
pub struct WorkerCoordinator {
    backend: Backend,
    pending: PendingMap,
    next_id: AtomicU64,
    compute_passes: Arc<AtomicUsize>,
}

impl WorkerCoordinator {
    /// Starts the worker thread, falling back to same-thread execution if it cannot be spawned.
    pub fn spawn() -> Self {
        let compute_passes = Arc::new(AtomicUsize::new(0));
        let pending: PendingMap = Arc::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = WorkerState::new(Arc::clone(&compute_passes));
        let thread_pending = Arc::clone(&pending);
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let spawned = thread::Builder::new()
            .name("spectrogram-worker".to_string())
            .spawn(move || worker_loop(state, receiver, thread_pending, thread_shutdown));

        let backend = match spawned {
            Ok(handle) => {
                tracing::info!("Spectrogram worker started");
                Backend::Thread {
                    sender: Mutex::new(Some(sender)),
                    handle: Mutex::new(Some(handle)),
                    shutdown,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to spawn spectrogram worker thread, computing on the caller: {e}"
                );
                Backend::Inline(Mutex::new(Some(WorkerState::new(Arc::clone(
                    &compute_passes,
                )))))
            }
        };

        Self {
            backend,
            pending,
            next_id: AtomicU64::new(1),
            compute_passes,
        }
    }

    /// Creates a coordinator that serves every request on the caller.
    pub fn inline() -> Self {
        let compute_passes = Arc::new(AtomicUsize::new(0));
        Self {
            backend: Backend::Inline(Mutex::new(Some(WorkerState::new(Arc::clone(
                &compute_passes,
            ))))),
            pending: Arc::default(),
            next_id: AtomicU64::new(1),
            compute_passes,
        }
    }

    pub fn is_threaded(&self) -> bool {
        matches!(self.backend, Backend::Thread { .. })
    }

    /// Total FFT passes the worker has run.
    pub fn compute_passes(&self) -> usize {
        self.compute_passes.load(Ordering::Relaxed)
    }

    /// Requests sent to the worker thread and not yet answered.
    pub fn pending_requests(&self) -> usize {
        self.lock_pending().map(|map| map.len()).unwrap_or(0)
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, HashMap<RequestId, Waiter>>> {
        self.pending
            .lock()
            .map_err(|_| anyhow!("Spectrogram worker pending map poisoned"))
    }

    /// Sends a request and waits for its reply.
    ///
    /// # Errors
    /// - If the worker has been terminated
    /// - If the worker fails while handling this request
    pub async fn request(&self, request: WorkerRequest) -> Result<WorkerReply> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = request.name();

        let receiver = match &self.backend {
            Backend::Inline(state) => {
                let mut guard = state
                    .lock()
                    .map_err(|_| anyhow!("Spectrogram worker state poisoned"))?;
                let state = guard
                    .as_mut()
                    .ok_or_else(|| anyhow!("Spectrogram worker terminated"))?;
                return state.handle(request);
            }
            Backend::Thread { sender, .. } => {
                let sender = sender
                    .lock()
                    .map_err(|_| anyhow!("Spectrogram worker sender poisoned"))?
                    .clone()
                    .ok_or_else(|| anyhow!("Spectrogram worker terminated"))?;

                let (waiter, receiver) = oneshot::channel();
                self.lock_pending()?.insert(id, waiter);
                if sender.send(Envelope { id, request }).is_err() {
                    self.lock_pending()?.remove(&id);
                    bail!("Spectrogram worker terminated");
                }
                receiver
            }
        };

        tracing::trace!("Awaiting worker reply {} ({})", id, name);
        receiver
            .await
            .map_err(|_| anyhow!("Spectrogram worker dropped request {id} ({name})"))?
    }

    pub async fn register_audio(&self, clip: ClipId, buffer: Arc<AudioBuffer>) -> Result<()> {
        expect_done(self.request(WorkerRequest::RegisterAudio { clip, buffer }).await?)
    }

    pub async fn unregister_audio(&self, clip: ClipId) -> Result<()> {
        expect_done(self.request(WorkerRequest::UnregisterAudio { clip }).await?)
    }

    /// Hands a surface over to the worker.
    pub async fn register_surface(&self, chunk: ChunkId, surface: PixelSurface) -> Result<()> {
        expect_done(
            self.request(WorkerRequest::RegisterSurface { chunk, surface })
                .await?,
        )
    }

    /// Takes a surface back from the worker, if it was registered.
    pub async fn unregister_surface(&self, chunk: ChunkId) -> Result<Option<PixelSurface>> {
        match self.request(WorkerRequest::UnregisterSurface { chunk }).await? {
            WorkerReply::Surface(surface) => Ok(surface),
            other => Err(unexpected("unregister-surface", other)),
        }
    }

    /// Computes without caching and returns the data itself.
    pub async fn compute(&self, job: ComputeJob) -> Result<Arc<[SpectrogramData]>> {
        match self.request(WorkerRequest::Compute(job)).await? {
            WorkerReply::Spectrograms(data) => Ok(data),
            other => Err(unexpected("compute", other)),
        }
    }

    /// Computes (or reuses) worker-side data and returns only its key.
    pub async fn compute_cached(&self, job: ComputeJob) -> Result<CacheKey> {
        match self.request(WorkerRequest::ComputeCached(job)).await? {
            WorkerReply::Key(key) => Ok(key),
            other => Err(unexpected("compute-cached", other)),
        }
    }

    /// Paints chunks from cached data; returns how many surfaces were painted.
    pub async fn render_chunks(&self, job: RenderJob) -> Result<usize> {
        match self.request(WorkerRequest::RenderChunks(job)).await? {
            WorkerReply::Painted(count) => Ok(count),
            other => Err(unexpected("render-chunks", other)),
        }
    }

    pub async fn fetch(&self, key: CacheKey) -> Result<Option<Arc<[SpectrogramData]>>> {
        match self.request(WorkerRequest::FetchCached { key }).await? {
            WorkerReply::Cached(data) => Ok(data),
            other => Err(unexpected("fetch-cached", other)),
        }
    }

    pub async fn release_cache(&self, clip: ClipId, keep: Vec<CacheKey>) -> Result<()> {
        expect_done(self.request(WorkerRequest::ReleaseCache { clip, keep }).await?)
    }

    /// Stops the worker, rejecting every outstanding request.
    ///
    /// Queued requests are discarded without running. Blocks until the worker
    /// thread has finished the request it is on and released its registries.
    pub fn terminate(&self) {
        match &self.backend {
            Backend::Thread {
                sender,
                handle,
                shutdown,
            } => {
                let sender = sender.lock().ok().and_then(|mut guard| guard.take());
                if sender.is_none() {
                    return;
                }
                shutdown.store(true, Ordering::Release);
                drop(sender);

                let waiters: Vec<Waiter> = self
                    .pending
                    .lock()
                    .map(|mut map| map.drain().map(|(_, waiter)| waiter).collect())
                    .unwrap_or_default();
                let rejected = waiters.len();
                for waiter in waiters {
                    let _ = waiter.send(Err(anyhow!("Spectrogram worker terminated")));
                }

                if let Some(handle) = handle.lock().ok().and_then(|mut guard| guard.take()) {
                    if handle.join().is_err() {
                        tracing::warn!("Spectrogram worker thread panicked during shutdown");
                    }
                }
                tracing::info!(
                    "Spectrogram worker terminated ({} pending request(s) rejected)",
                    rejected
                );
            }
            Backend::Inline(state) => {
                if let Ok(mut guard) = state.lock() {
                    guard.take();
                }
            }
        }
    }
}

impl Drop for WorkerCoordinator {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn worker_loop(
    mut state: WorkerState,
    mut receiver: mpsc::UnboundedReceiver<Envelope>,
    pending: PendingMap,
    shutdown: Arc<AtomicBool>,
) {
    while let Some(Envelope { id, request }) = receiver.blocking_recv() {
        let name = request.name();
        if shutdown.load(Ordering::Acquire) {
            receiver.close();
            tracing::debug!("Discarding {} ({}) queued before shutdown", id, name);
            continue;
        }
        let waiting = pending.lock().map(|map| map.contains_key(&id)).unwrap_or(false);
        if !waiting {
            tracing::debug!("Skipping abandoned request {} ({})", id, name);
            continue;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| state.handle(request)))
            .unwrap_or_else(|_| Err(anyhow!("Spectrogram worker panicked while handling {name}")));

        if let Err(e) = &result {
            tracing::warn!("Worker request {} ({}) failed: {e:#}", id, name);
        }

        let waiter = pending.lock().ok().and_then(|mut map| map.remove(&id));
        match waiter {
            Some(waiter) => {
                let _ = waiter.send(result);
            }
            None => tracing::debug!("Dropping reply to abandoned request {}", id),
        }
    }
    tracing::debug!("Spectrogram worker loop exited");
}

fn expect_done(reply: WorkerReply) -> Result<()> {
    match reply {
        WorkerReply::Done => Ok(()),
        other => Err(unexpected("request", other)),
    }
}

fn unexpected(name: &str, reply: WorkerReply) -> anyhow::Error {
    anyhow!("Unexpected worker reply to {name}: {reply:?}")
}
