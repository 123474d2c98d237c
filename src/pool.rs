//! Chunked parallel dispatch over a scoped worker pool.
//!
//! A feeder thread cuts the input stream into chunks whose size starts small
//! and doubles up to a cap, and pushes them through a bounded queue to the
//! workers. Results come back in completion order and are merged on the
//! calling thread. All threads are scoped, so anything the workers borrow
//! (the shared model, the similarity floor) outlives them on every exit path.
//!
//! Setting the cancel flag stops dispatching; chunks already handed out still
//! finish and are merged. A failing chunk stops dispatching too, and its error
//! is returned once every worker has been joined.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{bounded, unbounded};

use crate::config::SearchConfig;
use crate::error::{DvgError, DvgResult};

/// Geometrically growing chunk sizes: `initial, 2*initial, ...` capped at `max`.
#[derive(Debug, Clone)]
pub struct ChunkSizes {
    next: usize,
    max: usize,
}

impl ChunkSizes {
    #[must_use]
    pub fn new(initial: usize, max: usize) -> Self {
        let max = max.max(1);
        Self {
            next: initial.clamp(1, max),
            max,
        }
    }
}

impl Iterator for ChunkSizes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let size = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        Some(size)
    }
}

/// Groups a fallible item stream into chunks of growing total weight.
///
/// An item stream error ends the iteration after being yielded once.
pub struct Chunks<I, W> {
    items: I,
    sizes: ChunkSizes,
    weight: W,
    failed: bool,
}

impl<I, W> Chunks<I, W> {
    pub fn new(items: I, sizes: ChunkSizes, weight: W) -> Self {
        Self {
            items,
            sizes,
            weight,
            failed: false,
        }
    }
}

impl<T, I, W> Iterator for Chunks<I, W>
where
    I: Iterator<Item = DvgResult<T>>,
    W: Fn(&T) -> usize,
{
    type Item = DvgResult<Vec<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let target = self.sizes.next().unwrap_or(1);
        let mut chunk = Vec::new();
        let mut filled = 0;
        while filled < target {
            match self.items.next() {
                Some(Ok(item)) => {
                    filled += (self.weight)(&item).max(1);
                    chunk.push(item);
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Some(Err(e));
                }
                None => break,
            }
        }
        (!chunk.is_empty()).then_some(Ok(chunk))
    }
}

/// What happened during one [`WorkerPool::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    /// Chunks whose results were merged.
    pub chunks: usize,
    /// The run stopped early because the cancel flag was set.
    pub cancelled: bool,
}

/// Fixed-size pool of scoped worker threads.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    initial_chunk: usize,
    max_chunk: usize,
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(
        workers: usize,
        initial_chunk: usize,
        max_chunk: usize,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            workers: workers.max(1),
            initial_chunk,
            max_chunk,
            cancel,
        }
    }

    #[must_use]
    pub fn from_config(config: &SearchConfig, cancel: Arc<AtomicBool>) -> Self {
        Self::new(
            config.workers(),
            config.initial_chunk(),
            config.max_chunk(),
            cancel,
        )
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes `items` in chunks on the pool.
    ///
    /// `weight` measures how much of a chunk an item fills, `work` turns a
    /// chunk into a result on a worker thread and `merge` folds results on the
    /// calling thread as they complete. An error from `merge` stops the run
    /// like a failing chunk does.
    pub fn run<T, R, I, W, F, M>(
        &self,
        items: I,
        weight: W,
        work: F,
        mut merge: M,
    ) -> DvgResult<PoolOutcome>
    where
        T: Send,
        R: Send,
        I: Iterator<Item = DvgResult<T>> + Send,
        W: Fn(&T) -> usize + Send,
        F: Fn(Vec<T>) -> DvgResult<R> + Sync,
        M: FnMut(R) -> DvgResult<()>,
    {
        let abort = AtomicBool::new(false);
        let cancel = self.cancel.as_ref();
        let sizes = ChunkSizes::new(self.initial_chunk, self.max_chunk);

        std::thread::scope(|s| {
            let (job_tx, job_rx) = bounded::<Vec<T>>(self.workers * 2);
            let (result_tx, result_rx) = unbounded::<DvgResult<R>>();

            for worker_id in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let work = &work;
                s.spawn(move || {
                    let mut done = 0usize;
                    for chunk in job_rx {
                        if result_tx.send(work(chunk)).is_err() {
                            break;
                        }
                        done += 1;
                    }
                    tracing::trace!(worker_id, chunks = done, "worker finished");
                });
            }
            drop(job_rx);
            drop(result_tx);

            let abort_ref = &abort;
            let feeder = s.spawn(move || -> DvgResult<usize> {
                let mut dispatched = 0usize;
                for chunk in Chunks::new(items, sizes, weight) {
                    if cancel.load(Ordering::Relaxed) || abort_ref.load(Ordering::Relaxed) {
                        break;
                    }
                    let chunk = chunk?;
                    tracing::debug!(chunk = dispatched, len = chunk.len(), "dispatching chunk");
                    if job_tx.send(chunk).is_err() {
                        break;
                    }
                    dispatched += 1;
                }
                Ok(dispatched)
            });

            let mut outcome = PoolOutcome::default();
            let mut first_error: Option<DvgError> = None;
            for result in result_rx {
                match result {
                    Ok(r) if first_error.is_none() => match merge(r) {
                        Ok(()) => outcome.chunks += 1,
                        Err(e) => {
                            abort.store(true, Ordering::Relaxed);
                            first_error = Some(e);
                        }
                    },
                    Ok(_) => {}
                    Err(e) => {
                        abort.store(true, Ordering::Relaxed);
                        first_error.get_or_insert(e);
                    }
                }
            }

            let fed = feeder
                .join()
                .map_err(|_| DvgError::General("chunk feeder panicked".to_string()))?;
            if let Some(e) = first_error {
                return Err(e);
            }
            let dispatched = fed?;
            outcome.cancelled = cancel.load(Ordering::Relaxed);
            tracing::debug!(
                dispatched,
                merged = outcome.chunks,
                cancelled = outcome.cancelled,
                "worker pool drained"
            );
            Ok(outcome)
        })
    }
}
