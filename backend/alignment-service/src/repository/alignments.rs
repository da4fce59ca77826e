use super::AlignmentRows;
use crate::error::ServiceResult;
use crate::models::UserAlignment;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for user_alignments rows
#[derive(Clone)]
pub struct AlignmentRepository {
    pool: PgPool,
}

impl AlignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlignmentRows for AlignmentRepository {
    async fn get(&self, user_id: Uuid, scope_id: Uuid) -> ServiceResult<Option<UserAlignment>> {
        let row = sqlx::query_as::<_, UserAlignment>(
            r#"
            SELECT user_id, scope_id, x, y, mf_x, mf_y,
                   n_position_votes, n_comment_votes, basis_version, updated_at
            FROM user_alignments
            WHERE user_id = $1 AND scope_id = $2
            "#,
        )
        .bind(user_id)
        .bind(scope_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert_projection(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        x: f64,
        y: f64,
        n_position_votes: i32,
        basis_version: &str,
    ) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_alignments
                (user_id, scope_id, x, y, n_position_votes, basis_version, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id, scope_id) DO UPDATE
            SET x = EXCLUDED.x,
                y = EXCLUDED.y,
                n_position_votes = EXCLUDED.n_position_votes,
                basis_version = EXCLUDED.basis_version,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(scope_id)
        .bind(x)
        .bind(y)
        .bind(n_position_votes)
        .bind(basis_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_latent(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        mf_x: f64,
        mf_y: f64,
    ) -> ServiceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_alignments (user_id, scope_id, mf_x, mf_y, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (user_id, scope_id) DO UPDATE
            SET mf_x = EXCLUDED.mf_x,
                mf_y = EXCLUDED.mf_y,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(scope_id)
        .bind(mf_x)
        .bind(mf_y)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_engagement_counts(
        &self,
        scope_id: Uuid,
        counts: &[(Uuid, i32)],
    ) -> ServiceResult<()> {
        if counts.is_empty() {
            return Ok(());
        }

        let user_ids: Vec<Uuid> = counts.iter().map(|(u, _)| *u).collect();
        let votes: Vec<i32> = counts.iter().map(|(_, n)| *n).collect();

        sqlx::query(
            r#"
            UPDATE user_alignments ua
            SET n_comment_votes = v.n,
                updated_at = NOW()
            FROM (SELECT UNNEST($2::uuid[]) AS user_id, UNNEST($3::int[]) AS n) v
            WHERE ua.scope_id = $1 AND ua.user_id = v.user_id
            "#,
        )
        .bind(scope_id)
        .bind(&user_ids)
        .bind(&votes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, user_id: Uuid, scope_id: Uuid) -> ServiceResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_alignments
            WHERE user_id = $1 AND scope_id = $2
            "#,
        )
        .bind(user_id)
        .bind(scope_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
