mod config;
mod db;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod ranking;
mod routes;
mod screening;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, QueueBackend};
use crate::db::create_pool;
use crate::extraction::S3ResumeExtractor;
use crate::llm_client::LlmGateway;
use crate::ranking::queue::{InMemoryRankingQueue, RankingQueue, RedisRankingQueue};
use crate::ranking::worker::RankingWorker;
use crate::routes::build_router;
use crate::screening::pipeline::ScreeningService;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screening API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let extractor = Arc::new(S3ResumeExtractor::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized");

    // Initialize LLM gateway
    let llm = LlmGateway::from_config(&config.llm)?;
    info!("LLM gateway initialized: {}", llm.describe());

    // Initialize ranking queue
    let ranking_queue: Arc<dyn RankingQueue> = match (config.ranking_queue, &config.redis_url) {
        (QueueBackend::Redis, Some(redis_url)) => {
            let client = redis::Client::open(redis_url.as_str())?;
            Arc::new(RedisRankingQueue::connect(client).await?)
        }
        _ => Arc::new(InMemoryRankingQueue::new()),
    };
    info!("Ranking queue initialized ({})", ranking_queue.backend());

    let screening = ScreeningService::new(
        store,
        llm,
        extractor,
        ranking_queue.clone(),
        config.reassessment_concurrency,
    );

    // Ranking worker drains the queue for the lifetime of the process
    RankingWorker::new(ranking_queue, screening.ranking().clone()).spawn();

    // Build router
    let app = build_router(AppState { screening })
        .layer(TraceLayer::new_for_http())
        // TODO: restrict origins once the dashboard domain is fixed
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "screening-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
