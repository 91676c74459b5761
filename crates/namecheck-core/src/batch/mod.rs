//! Bounded concurrent batch checks
//!
//! Many candidate names are checked against one profile by a fixed pool of
//! workers pulling `(index, name)` jobs from a shared queue. Results land in
//! the slot of their input index, so output order never depends on which
//! worker finishes first.
//!
//! ## Fail-fast
//!
//! The first worker error wins an atomic guard, cancels the batch's child
//! token and becomes the batch error. The producer and the other workers
//! observe the cancellation at their next await point.
//!
//! - [`run_batch_checks`] is all-or-nothing: any error discards every result.
//! - [`run_batch_checks_partial`] returns whatever completed alongside the error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::orchestrator::Orchestrator;
use crate::types::{BatchResult, Profile};

/// Results of a batch that may have stopped early
#[derive(Debug)]
pub struct PartialBatch {
    /// One slot per input name, in input order; `None` if never completed
    pub results: Vec<Option<BatchResult>>,
    /// The error that stopped the batch, if any
    pub error: Option<Error>,
}

impl PartialBatch {
    /// Every name completed and nothing failed
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.results.iter().all(Option::is_some)
    }

    /// Completed results, in input order
    pub fn completed(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.iter().flatten()
    }
}

/// Check every name against `profile`, at most `concurrency` at a time
///
/// # Returns
///
/// - `Ok(results)`: One [`BatchResult`] per input name, in input order
/// - `Err(Error)`: The first failure; all other results are discarded.
///   `Error::Cancelled` if `token` was cancelled before every name finished.
///
/// A `concurrency` of 0 is treated as 1. An empty name list returns an empty
/// vector without starting any worker.
pub async fn run_batch_checks<S: AsRef<str>>(
    token: &CancellationToken,
    orchestrator: Arc<Orchestrator>,
    profile: &Profile,
    names: &[S],
    concurrency: usize,
) -> Result<Vec<BatchResult>> {
    let batch = run_batch_checks_partial(token, orchestrator, profile, names, concurrency).await;

    if let Some(e) = batch.error {
        return Err(e);
    }

    batch
        .results
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::Cancelled)
}

/// Like [`run_batch_checks`], but keeps completed results on failure
pub async fn run_batch_checks_partial<S: AsRef<str>>(
    token: &CancellationToken,
    orchestrator: Arc<Orchestrator>,
    profile: &Profile,
    names: &[S],
    concurrency: usize,
) -> PartialBatch {
    let total = names.len();
    if total == 0 {
        return PartialBatch {
            results: Vec::new(),
            error: None,
        };
    }

    let workers = concurrency.max(1).min(total);
    info!("Checking {} names with {} workers", total, workers);

    let batch_token = token.child_token();
    let profile = Arc::new(profile.clone());
    let failed = Arc::new(AtomicBool::new(false));

    let (tx, rx) = mpsc::channel::<(usize, String)>(workers);
    let rx = Arc::new(Mutex::new(rx));

    let jobs: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
    let producer = tokio::spawn(produce(jobs, tx, batch_token.clone()));

    let handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            tokio::spawn(work(
                worker_id,
                rx.clone(),
                orchestrator.clone(),
                profile.clone(),
                batch_token.clone(),
                failed.clone(),
            ))
        })
        .collect();
    drop(rx);

    let mut results: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
    let mut first_error: Option<Error> = None;

    for handle in handles {
        match handle.await {
            Ok(WorkerOutput { done, error }) => {
                for (index, result) in done {
                    results[index] = Some(result);
                }
                if let Some(e) = error {
                    first_error = Some(e);
                }
            }
            Err(join_err) => {
                error!("Batch worker aborted: {}", join_err);
                batch_token.cancel();
                if !failed.swap(true, Ordering::SeqCst) {
                    first_error = Some(Error::Other(format!("batch worker aborted: {}", join_err)));
                }
            }
        }
    }

    if let Err(join_err) = producer.await {
        warn!("Batch producer aborted: {}", join_err);
    }

    let unfinished = results.iter().filter(|slot| slot.is_none()).count();
    if first_error.is_none() && unfinished > 0 {
        warn!("Batch cancelled with {} of {} names unchecked", unfinished, total);
        first_error = Some(Error::Cancelled);
    }

    PartialBatch {
        results,
        error: first_error,
    }
}

/// Feed jobs to the workers until done or cancelled
async fn produce(jobs: Vec<String>, tx: mpsc::Sender<(usize, String)>, token: CancellationToken) {
    for (index, name) in jobs.into_iter().enumerate() {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Batch producer stopping at job {}", index);
                return;
            }
            sent = tx.send((index, name)) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

struct WorkerOutput {
    done: Vec<(usize, BatchResult)>,
    error: Option<Error>,
}

async fn work(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<(usize, String)>>>,
    orchestrator: Arc<Orchestrator>,
    profile: Arc<Profile>,
    token: CancellationToken,
    failed: Arc<AtomicBool>,
) -> WorkerOutput {
    let mut done = Vec::new();

    loop {
        let job = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some((index, name)) = job else {
            break;
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Worker {} abandoning '{}'", worker_id, name);
                break;
            }
            outcome = orchestrator.check(&name, &profile) => outcome,
        };

        match outcome {
            Ok(results) => {
                let completed_at = orchestrator.clock().now();
                done.push((index, BatchResult::from_results(name, results, completed_at)));
            }
            Err(e) => {
                if failed
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    error!("Checking '{}' failed, stopping batch: {}", name, e);
                    token.cancel();
                    return WorkerOutput {
                        done,
                        error: Some(e),
                    };
                }
                debug!("Worker {} dropping later error for '{}': {}", worker_id, name, e);
                break;
            }
        }
    }

    WorkerOutput { done, error: None }
}
