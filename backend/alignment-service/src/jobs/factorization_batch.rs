// ============================================
// Factorization Batch Job
// ============================================
//
// Background job that runs matrix factorization across topic scopes.
// Designed to run as a Kubernetes CronJob or standalone process.
//
// Workflow:
// 1. List scopes with any post/comment votes
// 2. For each scope, run one factorization pass (small scopes skip)
// 3. Sleep between scopes to avoid hammering the database

use crate::error::ServiceResult;
use crate::repository::VoteSource;
use crate::services::FactorizationEngine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info};

/// Factorization batch job configuration
#[derive(Debug, Clone)]
pub struct FactorizationBatchConfig {
    /// Delay between scopes
    pub scope_delay_ms: u64,
    /// Whether to run continuously or exit after one pass
    pub run_once: bool,
    /// Interval between full passes (if not run_once)
    pub interval_secs: u64,
}

impl Default for FactorizationBatchConfig {
    fn default() -> Self {
        Self {
            scope_delay_ms: 250,
            run_once: true,
            interval_secs: 3600, // hourly
        }
    }
}

impl FactorizationBatchConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scope_delay_ms: std::env::var("FACTORIZATION_SCOPE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.scope_delay_ms),
            run_once: std::env::var("FACTORIZATION_RUN_ONCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.run_once),
            interval_secs: std::env::var("FACTORIZATION_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.interval_secs),
        }
    }
}

/// Batch job statistics for one pass
#[derive(Debug, Clone, Default)]
pub struct BatchJobStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub scopes_processed: u32,
    pub runs_completed: u32,
    pub runs_skipped: u32,
    pub runs_failed: u32,
    pub total_duration_ms: u64,
}

/// Factorization batch job runner
pub struct FactorizationBatchJob {
    config: FactorizationBatchConfig,
    engine: Arc<FactorizationEngine>,
    votes: Arc<dyn VoteSource>,
}

impl FactorizationBatchJob {
    pub fn new(
        config: FactorizationBatchConfig,
        engine: Arc<FactorizationEngine>,
        votes: Arc<dyn VoteSource>,
    ) -> Self {
        Self {
            config,
            engine,
            votes,
        }
    }

    /// Run the batch job
    pub async fn run(&self) -> ServiceResult<BatchJobStats> {
        loop {
            let stats = self.run_single_pass().await?;

            info!(
                processed = stats.scopes_processed,
                completed = stats.runs_completed,
                skipped = stats.runs_skipped,
                failed = stats.runs_failed,
                duration_ms = stats.total_duration_ms,
                "Factorization batch pass completed"
            );

            if self.config.run_once {
                return Ok(stats);
            }

            info!(
                interval_secs = self.config.interval_secs,
                "Sleeping until next pass"
            );
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    /// Run a single pass over all active scopes
    async fn run_single_pass(&self) -> ServiceResult<BatchJobStats> {
        let start_time = Instant::now();
        let mut stats = BatchJobStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let scopes = self.votes.active_scopes().await?;
        info!(scope_count = scopes.len(), "Starting factorization batch pass");

        for scope_id in scopes {
            stats.scopes_processed += 1;

            match self.engine.run(scope_id).await {
                Ok(Some(_)) => stats.runs_completed += 1,
                Ok(None) => stats.runs_skipped += 1,
                Err(e) => {
                    stats.runs_failed += 1;
                    error!(
                        scope_id = %scope_id,
                        error = %e,
                        "Factorization run failed"
                    );
                }
            }

            if self.config.scope_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.scope_delay_ms)).await;
            }
        }

        stats.completed_at = Some(Utc::now());
        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = FactorizationBatchConfig::default();
        assert!(config.run_once);
        assert_eq!(config.interval_secs, 3600);
    }
}
