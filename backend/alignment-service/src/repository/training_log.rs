use super::TrainingLog;
use crate::error::ServiceResult;
use crate::models::FactorizationRun;
use async_trait::async_trait;
use sqlx::PgPool;

/// Append-only log of completed factorization runs
#[derive(Clone)]
pub struct TrainingLogRepository {
    pool: PgPool,
}

impl TrainingLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrainingLog for TrainingLogRepository {
    async fn append(&self, run: &FactorizationRun) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO factorization_runs
                (scope_id, n_users, n_items, n_votes, final_loss, epochs, duration_ms)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(run.scope_id)
        .bind(run.n_users as i32)
        .bind(run.n_items as i32)
        .bind(run.n_votes as i32)
        .bind(run.final_loss)
        .bind(run.epochs as i32)
        .bind(run.duration_ms as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
