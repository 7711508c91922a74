//! Bounded worker pool.
//!
//! `min(limit, items)` workers are driven together inside the calling task.
//! Each worker pulls the next item from one owned queue, awaits its
//! operation, and pulls again until the queue is empty. A slot is therefore
//! refilled the moment its operation finishes, start order follows queue
//! order, and the run returns once every worker has drained.
//!
//! Because the workers are polled by the caller instead of being spawned,
//! operations may borrow from the caller's stack.

use std::collections::VecDeque;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::future::join_all;

use crate::TransferError;

/// Outcome of a completed pool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Items handed to the pool.
    pub submitted: usize,
    /// Operations that were started.
    pub started: usize,
    /// Operations that finished successfully.
    pub completed: usize,
    /// Highest number of operations observed in flight at once.
    pub peak_in_flight: usize,
    /// `true` if an operation asked the pool to stop early.
    pub stopped_early: bool,
}

/// Runs operations with at most `limit` in flight at any instant.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    limit: usize,
}

struct PoolState<T> {
    queue: Mutex<VecDeque<T>>,
    stop: AtomicBool,
    started: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl<T> PoolState<T> {
    fn next(&self) -> Option<T> {
        if self.stop.load(Ordering::Acquire) {
            return None;
        }
        let item = self
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        if item.is_some() {
            self.started.fetch_add(1, Ordering::Relaxed);
            let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
            self.peak.fetch_max(now, Ordering::AcqRel);
        }
        item
    }

    fn finish(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl WorkerPool {
    /// Creates a pool; `limit` must be at least 1.
    pub fn new(limit: usize) -> Result<Self, TransferError> {
        if limit == 0 {
            return Err(TransferError::Planning(
                "concurrency limit must be >= 1".into(),
            ));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `op` over every item and waits for all of them.
    ///
    /// - An operation returning `ControlFlow::Break(())` stops the pool from
    ///   starting further items; operations already in flight still finish.
    /// - An operation returning `Err` stops the pool the same way, and the
    ///   first such error is returned once the in-flight ones have finished.
    pub async fn run<T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        op: F,
    ) -> Result<RunSummary, E>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<ControlFlow<()>, E>>,
    {
        let queue: VecDeque<T> = items.into_iter().collect();
        let submitted = queue.len();
        let state = PoolState {
            queue: Mutex::new(queue),
            stop: AtomicBool::new(false),
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        let workers = (0..self.limit.min(submitted)).map(|_| worker(&state, &op));
        let results = join_all(workers).await;

        let summary = RunSummary {
            submitted,
            started: state.started.load(Ordering::Acquire),
            completed: state.completed.load(Ordering::Acquire),
            peak_in_flight: state.peak.load(Ordering::Acquire),
            stopped_early: state.stop.load(Ordering::Acquire),
        };

        for result in results {
            result?;
        }
        Ok(summary)
    }
}

async fn worker<T, E, F, Fut>(state: &PoolState<T>, op: &F) -> Result<(), E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<ControlFlow<()>, E>>,
{
    while let Some(item) = state.next() {
        let outcome = op(item).await;
        state.finish();
        match outcome {
            Ok(flow) => {
                state.completed.fetch_add(1, Ordering::AcqRel);
                if flow.is_break() {
                    state.stop.store(true, Ordering::Release);
                }
            }
            Err(e) => {
                state.stop.store(true, Ordering::Release);
                return Err(e);
            }
        }
    }
    Ok(())
}
