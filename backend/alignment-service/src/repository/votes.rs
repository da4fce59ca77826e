use super::VoteSource;
use crate::error::ServiceResult;
use crate::models::{ContentVote, ItemKind, ItemRef, PositionVoteValue};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Read-only access to the vote corpus owned by the content service
#[derive(Clone)]
pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteSource for VoteRepository {
    async fn position_votes(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> ServiceResult<Vec<(usize, PositionVoteValue)>> {
        let rows = sqlx::query_as::<_, (i32, String)>(
            r#"
            SELECT s.basis_index, v.value
            FROM position_votes v
            JOIN position_statements s ON s.id = v.statement_id
            WHERE v.user_id = $1 AND s.scope_id = $2 AND s.basis_index IS NOT NULL
            "#,
        )
        .bind(user_id)
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await?;

        // Unknown vote kinds and negative indices are skipped, not errors;
        // the projector is defensive about out-of-range indices anyway.
        let mut votes = Vec::with_capacity(rows.len());
        for (index, kind) in rows {
            let Some(value) = PositionVoteValue::from_db(&kind) else {
                warn!(user_id = %user_id, kind = %kind, "Unknown position vote kind");
                continue;
            };
            if index < 0 {
                continue;
            }
            votes.push((index as usize, value));
        }

        Ok(votes)
    }

    async fn content_votes(&self, scope_id: Uuid) -> ServiceResult<Vec<ContentVote>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, i16, String)>(
            r#"
            SELECT v.user_id, v.post_id AS item_id, v.value, 'post' AS kind
            FROM post_votes v
            JOIN posts p ON p.id = v.post_id
            WHERE p.scope_id = $1
            UNION ALL
            SELECT v.user_id, v.comment_id AS item_id, v.value, 'comment' AS kind
            FROM comment_votes v
            JOIN comments c ON c.id = v.comment_id
            WHERE c.scope_id = $1
            "#,
        )
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await?;

        let votes = rows
            .into_iter()
            .filter(|(_, _, value, _)| *value != 0)
            .map(|(user_id, item_id, value, kind)| ContentVote {
                user_id,
                item: ItemRef {
                    kind: if kind == "post" {
                        ItemKind::Post
                    } else {
                        ItemKind::Comment
                    },
                    id: item_id,
                },
                value: if value > 0 { 1.0 } else { -1.0 },
            })
            .collect();

        Ok(votes)
    }

    async fn engagement_counts(&self, scope_id: Uuid) -> ServiceResult<Vec<(Uuid, i32)>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT t.user_id, COUNT(*)
            FROM (
                SELECT v.user_id
                FROM post_votes v
                JOIN posts p ON p.id = v.post_id
                WHERE p.scope_id = $1
                UNION ALL
                SELECT v.user_id
                FROM comment_votes v
                JOIN comments c ON c.id = v.comment_id
                WHERE c.scope_id = $1
            ) t
            GROUP BY t.user_id
            "#,
        )
        .bind(scope_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, n)| (user_id, n as i32))
            .collect())
    }

    async fn active_scopes(&self) -> ServiceResult<Vec<Uuid>> {
        let scopes = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT p.scope_id
            FROM post_votes v
            JOIN posts p ON p.id = v.post_id
            UNION
            SELECT DISTINCT c.scope_id
            FROM comment_votes v
            JOIN comments c ON c.id = v.comment_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(scopes)
    }
}
