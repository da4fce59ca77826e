use super::InterceptSink;
use crate::error::ServiceResult;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Writes per-item bridging intercepts onto post/comment records.
///
/// A high intercept means the item is approved across the ideological
/// spectrum, independent of who holds what latent position.
#[derive(Clone)]
pub struct ContentRepository {
    pool: PgPool,
}

impl ContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InterceptSink for ContentRepository {
    async fn set_post_intercept(&self, post_id: Uuid, intercept: f64) -> ServiceResult<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET bridge_intercept = $2
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(intercept)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_comment_intercept(&self, comment_id: Uuid, intercept: f64) -> ServiceResult<()> {
        sqlx::query(
            r#"
            UPDATE comments
            SET bridge_intercept = $2
            WHERE id = $1
            "#,
        )
        .bind(comment_id)
        .bind(intercept)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
