use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use agora_cache::AgoraCache;
use alignment_service::config::Config;
use alignment_service::jobs::{FactorizationBatchConfig, FactorizationBatchJob};
use alignment_service::repository::{
    AlignmentRepository, AlignmentRows, ContentRepository, TrainingLogRepository, VoteRepository,
    VoteSource,
};
use alignment_service::services::{
    AlignmentStore, BasisSource, FactorizationEngine, MathServiceClient, PcaBasisService,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("Invalid Redis URL")?;
    let redis_manager = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;
    let cache = AgoraCache::new(Arc::new(Mutex::new(redis_manager)));

    let provider = Arc::new(MathServiceClient::new(
        &config.engine.math_service_url,
        Duration::from_secs(config.engine.math_timeout_secs),
    )?);
    let basis: Arc<dyn BasisSource> = Arc::new(PcaBasisService::new(
        Arc::new(cache),
        provider,
        config.engine.basis_ttl_secs,
    ));

    let rows: Arc<dyn AlignmentRows> = Arc::new(AlignmentRepository::new(pool.clone()));
    let votes: Arc<dyn VoteSource> = Arc::new(VoteRepository::new(pool.clone()));

    let store = Arc::new(AlignmentStore::new(
        basis.clone(),
        rows.clone(),
        votes.clone(),
        config.engine.blend_threshold,
    ));

    let engine = Arc::new(FactorizationEngine::new(
        store,
        basis,
        rows,
        votes.clone(),
        Arc::new(ContentRepository::new(pool.clone())),
        Arc::new(TrainingLogRepository::new(pool)),
        config.engine.factorization.clone(),
    ));

    info!("Starting factorization batch job");
    let job = FactorizationBatchJob::new(FactorizationBatchConfig::from_env(), engine, votes);
    let stats = job.run().await?;

    info!(
        processed = stats.scopes_processed,
        completed = stats.runs_completed,
        skipped = stats.runs_skipped,
        failed = stats.runs_failed,
        "Factorization batch job completed"
    );

    Ok(())
}
