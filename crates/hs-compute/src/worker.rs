//! Dedicated compute thread.
//!
//! The control thread hands a candidate matrix to the worker over a bounded
//! channel and awaits the reply with a deadline. A computation that overruns
//! is abandoned: its cancel flag is raised, the caller gets
//! [`ComputeError::Timeout`] and the worker drops the result when it finally
//! finishes.

use crate::{Analysis, AnalysisBackend, ComputeError};
use shared_types::StateMatrix;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Name of the OS thread running the backend.
pub const WORKER_THREAD_NAME: &str = "hs-compute";

struct Job {
    candidate: StateMatrix,
    cancel: Arc<AtomicBool>,
    reply: oneshot::Sender<Result<Analysis, ComputeError>>,
}

/// Handle to the compute thread. Dropping the last handle stops the thread.
pub struct ComputeWorker {
    jobs: mpsc::Sender<Job>,
    timeout: Duration,
}

impl ComputeWorker {
    /// Start the worker thread with `backend`, answering within `timeout`.
    pub fn spawn<B: AnalysisBackend>(backend: B, timeout: Duration) -> Result<Self, ComputeError> {
        let (jobs, mut inbox) = mpsc::channel::<Job>(1);
        let name = backend.name();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = inbox.blocking_recv() {
                    if job.cancel.load(Ordering::Acquire) {
                        continue;
                    }
                    let result = backend.analyse(&job.candidate, &job.cancel);
                    if job.reply.send(result).is_err() {
                        debug!("[hs-compute] Caller gave up before the result was ready");
                    }
                }
                debug!("[hs-compute] Job channel closed, worker exiting");
            })
            .map_err(|e| ComputeError::SpawnFailed(e.to_string()))?;

        info!(
            "[hs-compute] Worker started (backend: {}, timeout: {:?})",
            name, timeout
        );

        Ok(Self { jobs, timeout })
    }

    /// Analyse `candidate` on the worker thread.
    ///
    /// The deadline covers queueing as well as computing.
    pub async fn analyse(&self, candidate: StateMatrix) -> Result<Analysis, ComputeError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let (reply, answer) = oneshot::channel();
        let job = Job {
            candidate,
            cancel: Arc::clone(&cancel),
            reply,
        };

        let exchange = async {
            if self.jobs.send(job).await.is_err() {
                return Err(ComputeError::WorkerGone);
            }
            match answer.await {
                Ok(result) => result,
                Err(_) => Err(ComputeError::WorkerGone),
            }
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                cancel.store(true, Ordering::Release);
                warn!(
                    "[hs-compute] Computation exceeded {:?}, abandoned",
                    self.timeout
                );
                Err(ComputeError::Timeout)
            }
        }
    }
}
