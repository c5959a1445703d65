//! Bounded fan-out/fan-in over tokio tasks.
//!
//! Every input gets its own task. Tasks report back over one shared channel,
//! tagged with the index of the input they handled, so the collector always ends
//! up with exactly one outcome per input once every task has finished.
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TaskError<E> {
    #[error("{0}")]
    Failed(E),
    #[error("task exited without reporting a result")]
    Lost,
}

#[derive(Debug)]
pub struct Outcome<T, E> {
    pub index: usize,
    pub result: Result<T, TaskError<E>>,
}

/// Outcomes in the order they arrived.
#[derive(Debug)]
pub struct Batch<T, E> {
    pub outcomes: Vec<Outcome<T, E>>,
}

impl<T, E> Batch<T, E> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Splits into successes and failures, each sorted by input index.
    pub fn into_parts(self) -> (Vec<(usize, T)>, Vec<(usize, TaskError<E>)>) {
        let mut ok = Vec::new();
        let mut failed = Vec::new();
        for outcome in self.outcomes {
            match outcome.result {
                Ok(value) => ok.push((outcome.index, value)),
                Err(err) => failed.push((outcome.index, err)),
            }
        }
        ok.sort_by_key(|(index, _)| *index);
        failed.sort_by_key(|(index, _)| *index);
        (ok, failed)
    }
}

/// Runs `op` once per input with at most `concurrency` calls in flight and
/// collects every outcome.
///
/// A task that panics is reported as [`TaskError::Lost`]. A task that never
/// finishes keeps this future pending.
pub async fn fan_out<I, T, E, F, Fut>(inputs: Vec<I>, concurrency: usize, op: F) -> Batch<T, E>
where
    I: Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let total = inputs.len();
    if total == 0 {
        return Batch {
            outcomes: Vec::new(),
        };
    }

    let op = Arc::new(op);
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    // Capacity N: a finished task never waits on the collector.
    let (tx, mut rx) = mpsc::channel::<(usize, Result<T, E>)>(total);

    for (index, item) in inputs.into_iter().enumerate() {
        let tx = tx.clone();
        let op = op.clone();
        let permits = permits.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = (*op)(item).await;
            if tx.send((index, result)).await.is_err() {
                debug!("Collector dropped before task {} reported", index);
            }
        });
    }
    drop(tx);

    let mut outcomes = Vec::with_capacity(total);
    let mut reported = vec![false; total];
    while let Some((index, result)) = rx.recv().await {
        reported[index] = true;
        outcomes.push(Outcome {
            index,
            result: result.map_err(TaskError::Failed),
        });
    }

    for (index, seen) in reported.into_iter().enumerate() {
        if !seen {
            warn!("Task {} exited without reporting a result", index);
            outcomes.push(Outcome {
                index,
                result: Err(TaskError::Lost),
            });
        }
    }

    Batch { outcomes }
}
