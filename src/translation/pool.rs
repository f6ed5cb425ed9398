/*!
 * Fixed-size worker pool with per-worker initialisation.
 *
 * Each worker runs on a blocking thread, builds its own context exactly once
 * before touching any item, then pulls items from a shared queue until it is
 * empty. Results are tagged with their input position and slotted back into
 * place by the coordinator, so output order equals input order no matter
 * which worker finishes first.
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::errors::JobError;

/// Fixed-size pool of blocking workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Create a pool with `size` workers (at least one)
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    /// Create a pool sized to the number of available processing units
    pub fn with_available_parallelism() -> Self {
        Self::new(default_pool_size())
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Process `items` on the pool.
    ///
    /// `init` runs once per worker (with the worker index) before that worker
    /// handles any item; a failing `init` aborts the run. `work` is applied to
    /// each item with the worker's context. `on_progress` receives
    /// `(completed, total)` after each result arrives.
    pub async fn run<T, R, C, E, I, W, P>(
        &self,
        items: Vec<T>,
        init: I,
        work: W,
        mut on_progress: P,
    ) -> Result<Vec<R>, JobError>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Display,
        I: Fn(usize) -> Result<C, E> + Send + Sync + 'static,
        W: Fn(&C, T) -> R + Send + Sync + 'static,
        P: FnMut(usize, usize),
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let queue = Arc::new(Mutex::new(
            items.into_iter().enumerate().collect::<VecDeque<_>>(),
        ));
        let abort = Arc::new(AtomicBool::new(false));
        let init = Arc::new(init);
        let work = Arc::new(work);
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, R)>();

        let workers = self.size.min(total);
        debug!("Starting {} workers for {} items", workers, total);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = queue.clone();
            let abort = abort.clone();
            let init = init.clone();
            let work = work.clone();
            let tx = tx.clone();

            handles.push(tokio::task::spawn_blocking(move || -> Result<(), JobError> {
                let context = match init(worker) {
                    Ok(context) => context,
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        return Err(JobError::WorkerInit {
                            worker,
                            message: e.to_string(),
                        });
                    }
                };
                debug!("Worker {} ready", worker);

                while !abort.load(Ordering::SeqCst) {
                    let next = queue.lock().pop_front();
                    let Some((index, item)) = next else {
                        break;
                    };
                    let result = work(&context, item);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
                Ok(())
            }));
        }
        drop(tx);

        let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
        let mut completed = 0;
        while let Some((index, result)) = rx.recv().await {
            slots[index] = Some(result);
            completed += 1;
            on_progress(completed, total);
        }

        // Every sender is gone, so every worker has returned
        let mut first_error: Option<JobError> = None;
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(JobError::TaskPanicked(join_error.to_string())),
            };
            if let Err(e) = outcome {
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(JobError::MissingResult(index)))
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Number of available processing units, falling back to one
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
