//! Ranking worker: drains the ranking queue and runs one ranking per task.
//!
//! A failed task goes back on the queue with `attempt + 1` until
//! `MAX_RANKING_ATTEMPTS`, after which it is dropped and logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::ranking::queue::{QueueError, RankingQueue, RankingTask};
use crate::ranking::service::RankingService;

pub const MAX_RANKING_ATTEMPTS: u32 = 3;

/// Pause after a queue error before polling again.
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Ranked { candidates: usize },
    Requeued { attempt: u32 },
    Abandoned,
}

pub struct RankingWorker {
    queue: Arc<dyn RankingQueue>,
    ranking: RankingService,
}

impl RankingWorker {
    pub fn new(queue: Arc<dyn RankingQueue>, ranking: RankingService) -> Self {
        Self { queue, ranking }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the queue closes.
    pub async fn run(self) {
        info!(backend = self.queue.backend(), "Ranking worker started");
        loop {
            match self.queue.next().await {
                Ok(Some(task)) => {
                    self.process(task).await;
                }
                Ok(None) => continue,
                Err(QueueError::Closed) => {
                    info!("Ranking queue closed, worker stopping");
                    return;
                }
                Err(e) => {
                    warn!("Ranking queue poll failed: {e}");
                    tokio::time::sleep(QUEUE_ERROR_BACKOFF).await;
                }
            }
        }
    }

    pub async fn process(&self, task: RankingTask) -> TaskOutcome {
        let job_id = task.job_id;
        match self.ranking.rank_candidates_for_job(job_id).await {
            Ok(summary) => {
                info!(
                    %job_id,
                    reason = ?task.reason,
                    attempt = task.attempt,
                    "Ranking task complete ({} candidates)",
                    summary.candidate_count
                );
                TaskOutcome::Ranked {
                    candidates: summary.candidate_count,
                }
            }
            Err(e) if task.attempt < MAX_RANKING_ATTEMPTS => {
                warn!(%job_id, attempt = task.attempt, "Ranking task failed, re-queueing: {e}");
                let retry = task.retry();
                let attempt = retry.attempt;
                match self.queue.enqueue(retry).await {
                    Ok(()) => TaskOutcome::Requeued { attempt },
                    Err(qe) => {
                        error!(%job_id, "Failed to re-queue ranking task: {qe}");
                        TaskOutcome::Abandoned
                    }
                }
            }
            Err(e) => {
                error!(
                    %job_id,
                    attempt = task.attempt,
                    "Ranking task abandoned after {MAX_RANKING_ATTEMPTS} attempts: {e}"
                );
                TaskOutcome::Abandoned
            }
        }
    }
}
