//! Ranking queue: the handoff between the application pipeline and the ranking worker.
//!
//! Two backends: an in-process unbounded channel (default) and a Redis list
//! (`LPUSH` on enqueue, `BRPOP` on dequeue) for deployments running several
//! API replicas.

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// Redis list holding pending ranking tasks.
pub const RANKING_QUEUE_KEY: &str = "screening:ranking_tasks";

/// Seconds `BRPOP` waits before `next` reports an empty poll.
const BRPOP_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingReason {
    AnalysisCompleted,
    CriteriaChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingTask {
    pub job_id: Uuid,
    pub reason: RankingReason,
    /// 1 for the first try.
    pub attempt: u32,
}

impl RankingTask {
    pub fn new(job_id: Uuid, reason: RankingReason) -> Self {
        Self {
            job_id,
            reason,
            attempt: 1,
        }
    }

    pub fn retry(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Ranking queue closed")]
    Closed,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Malformed ranking task: {0}")]
    Codec(#[from] serde_json::Error),
}

#[async_trait]
pub trait RankingQueue: Send + Sync {
    async fn enqueue(&self, task: RankingTask) -> Result<(), QueueError>;

    /// Waits for the next task. `Ok(None)` means the poll window elapsed empty.
    async fn next(&self) -> Result<Option<RankingTask>, QueueError>;

    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// In-process backend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InMemoryRankingQueue {
    sender: mpsc::UnboundedSender<RankingTask>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<RankingTask>>>,
}

impl InMemoryRankingQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Pops a pending task without waiting.
    pub async fn try_next(&self) -> Option<RankingTask> {
        self.receiver.lock().await.try_recv().ok()
    }
}

impl Default for InMemoryRankingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RankingQueue for InMemoryRankingQueue {
    async fn enqueue(&self, task: RankingTask) -> Result<(), QueueError> {
        self.sender.send(task).map_err(|_| QueueError::Closed)
    }

    async fn next(&self) -> Result<Option<RankingTask>, QueueError> {
        // The queue owns a sender, so `recv` only yields None after shutdown.
        match self.receiver.lock().await.recv().await {
            Some(task) => Ok(Some(task)),
            None => Err(QueueError::Closed),
        }
    }

    fn backend(&self) -> &'static str {
        "in_process"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisRankingQueue {
    client: redis::Client,
    /// Shared producer connection. Blocking pops use their own connection.
    producer: MultiplexedConnection,
}

impl RedisRankingQueue {
    pub async fn connect(client: redis::Client) -> Result<Self, QueueError> {
        let producer = client.get_multiplexed_async_connection().await?;
        Ok(Self { client, producer })
    }
}

#[async_trait]
impl RankingQueue for RedisRankingQueue {
    async fn enqueue(&self, task: RankingTask) -> Result<(), QueueError> {
        let payload = serde_json::to_string(&task)?;
        let mut conn = self.producer.clone();
        redis::cmd("LPUSH")
            .arg(RANKING_QUEUE_KEY)
            .arg(payload)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn next(&self) -> Result<Option<RankingTask>, QueueError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(RANKING_QUEUE_KEY)
            .arg(BRPOP_TIMEOUT_SECS)
            .query_async(&mut conn)
            .await?;

        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
