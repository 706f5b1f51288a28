//! Batch deletion pipeline: a bounded intake queue feeding a fixed pool
//! of workers. Callers get fire-and-forget semantics with backpressure
//! on the intake queue; per-item storage failures are absorbed and never
//! fail the batch.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::BatchDelete;
use crate::storage::Storage;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// The only failure mode of `submit`: the pipeline has been shut down
/// (or never started) and is no longer accepting batches.
#[derive(Debug, Error)]
#[error("deletion pipeline is not accepting work")]
pub struct PipelineClosed;

struct BatchJob {
    batch: BatchDelete,
    done: mpsc::UnboundedSender<String>,
}

struct WorkItem {
    owner_id: Arc<str>,
    short_id: String,
    done: mpsc::UnboundedSender<String>,
}

/// Handle to the running pipeline. Dropping it without `shutdown` leaves
/// queued work to the runtime; callers that care about draining must
/// call [`Deleter::shutdown`].
pub struct Deleter {
    batch_tx: std::sync::Mutex<Option<mpsc::Sender<BatchJob>>>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Deleter {
    /// Start the dispatcher and `workers` worker tasks against `storage`.
    pub fn spawn(storage: Arc<dyn Storage>, workers: usize, queue_capacity: usize) -> Self {
        let (batch_tx, batch_rx) = mpsc::channel::<BatchJob>(queue_capacity);
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>(queue_capacity);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut handles = Vec::with_capacity(workers + 1);
        for worker_id in 0..workers.max(1) {
            let storage = Arc::clone(&storage);
            let work_rx = Arc::clone(&work_rx);
            handles.push(tokio::spawn(run_worker(worker_id, storage, work_rx)));
        }
        handles.push(tokio::spawn(run_dispatcher(batch_rx, work_tx)));

        Self {
            batch_tx: std::sync::Mutex::new(Some(batch_tx)),
            handles: std::sync::Mutex::new(handles),
        }
    }

    /// Enqueue a batch and return once it has been accepted. Blocks only
    /// while the intake queue is full; the storage writes happen on the
    /// worker pool afterwards.
    pub async fn submit(&self, batch: BatchDelete) -> Result<(), PipelineClosed> {
        let mut done_rx = self.submit_watched(batch).await?;
        tokio::spawn(async move {
            let mut completed = 0usize;
            while done_rx.recv().await.is_some() {
                completed += 1;
            }
            debug!(completed, "delete batch finished");
        });
        Ok(())
    }

    /// Like [`submit`](Self::submit), but hand the completed short ids
    /// back to the caller as a finite, one-shot sequence. The channel
    /// closes once every item of the batch has been processed.
    pub async fn submit_watched(
        &self,
        batch: BatchDelete,
    ) -> Result<mpsc::UnboundedReceiver<String>, PipelineClosed> {
        let batch_tx = self
            .batch_tx
            .lock()
            .expect("deleter intake mutex poisoned")
            .clone()
            .ok_or(PipelineClosed)?;

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        batch_tx
            .send(BatchJob {
                batch,
                done: done_tx,
            })
            .await
            .map_err(|_| PipelineClosed)?;
        Ok(done_rx)
    }

    /// Stop accepting batches, then let queued work drain for up to
    /// `timeout` before giving up on the remaining tasks.
    pub async fn shutdown(&self, timeout: Duration) {
        drop(
            self.batch_tx
                .lock()
                .expect("deleter intake mutex poisoned")
                .take(),
        );
        let handles = std::mem::take(
            &mut *self.handles.lock().expect("deleter handle mutex poisoned"),
        );

        let drain = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(timeout, drain).await {
            Ok(()) => info!("deletion pipeline drained"),
            Err(_) => warn!("deletion pipeline shutdown timed out with work in flight"),
        }
    }
}

/// Fan each accepted batch out into per-id work items. Ends when the
/// intake channel closes, which in turn closes the work channel and
/// stops the workers once the queue is empty.
async fn run_dispatcher(mut batch_rx: mpsc::Receiver<BatchJob>, work_tx: mpsc::Sender<WorkItem>) {
    while let Some(job) = batch_rx.recv().await {
        let owner_id: Arc<str> = job.batch.owner_id.into();
        let total = job.batch.short_ids.len();
        debug!(owner_id = %owner_id, total, "dispatching delete batch");

        for short_id in job.batch.short_ids {
            let item = WorkItem {
                owner_id: Arc::clone(&owner_id),
                short_id,
                done: job.done.clone(),
            };
            if work_tx.send(item).await.is_err() {
                return;
            }
        }
        // Dropping the job's sender here lets the per-batch done channel
        // close as soon as the last worker finishes its item.
    }
}

async fn run_worker(
    worker_id: usize,
    storage: Arc<dyn Storage>,
    work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
) {
    loop {
        let item = {
            let mut rx = work_rx.lock().await;
            rx.recv().await
        };
        let Some(item) = item else {
            break;
        };

        match storage.delete(&item.owner_id, &item.short_id).await {
            Ok(true) => {
                let _ = item.done.send(item.short_id);
            }
            // Unknown id, foreign owner or already deleted: absorbed
            // silently per the anti-enumeration contract.
            Ok(false) => {}
            Err(err) => {
                warn!(
                    worker_id,
                    short_id = %item.short_id,
                    error = %err,
                    "delete dropped from batch"
                );
            }
        }
    }
}
