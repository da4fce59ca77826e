//! Persistence layer
//!
//! Trait seams so services can be driven by in-memory substitutes in tests;
//! the production implementations run against PostgreSQL.

pub mod alignments;
pub mod content;
pub mod training_log;
pub mod votes;

pub use alignments::AlignmentRepository;
pub use content::ContentRepository;
pub use training_log::TrainingLogRepository;
pub use votes::VoteRepository;

use crate::error::ServiceResult;
use crate::models::{ContentVote, FactorizationRun, PositionVoteValue, UserAlignment};
use async_trait::async_trait;
use uuid::Uuid;

/// Persisted per-(user, scope) alignment rows
#[async_trait]
pub trait AlignmentRows: Send + Sync {
    async fn get(&self, user_id: Uuid, scope_id: Uuid) -> ServiceResult<Option<UserAlignment>>;

    /// Write the PCA side of a row, preserving the matrix-factorization
    /// columns on conflict.
    async fn upsert_projection(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        x: f64,
        y: f64,
        n_position_votes: i32,
        basis_version: &str,
    ) -> ServiceResult<()>;

    /// Write the matrix-factorization coordinate, creating the row if the
    /// user has no PCA side yet.
    async fn set_latent(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
        mf_x: f64,
        mf_y: f64,
    ) -> ServiceResult<()>;

    /// Bulk-refresh n_comment_votes for existing rows in a scope
    async fn set_engagement_counts(
        &self,
        scope_id: Uuid,
        counts: &[(Uuid, i32)],
    ) -> ServiceResult<()>;

    /// Delete the row outright; returns whether a row existed
    async fn delete(&self, user_id: Uuid, scope_id: Uuid) -> ServiceResult<bool>;
}

/// Read access to the vote corpus owned by the content service
#[async_trait]
pub trait VoteSource: Send + Sync {
    /// A user's position votes within a scope, mapped to basis topic indices
    async fn position_votes(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> ServiceResult<Vec<(usize, PositionVoteValue)>>;

    /// All post and comment votes within a scope, pooled
    async fn content_votes(&self, scope_id: Uuid) -> ServiceResult<Vec<ContentVote>>;

    /// Per-user pooled vote counts within a scope
    async fn engagement_counts(&self, scope_id: Uuid) -> ServiceResult<Vec<(Uuid, i32)>>;

    /// Scopes with any post/comment votes (batch-job candidates)
    async fn active_scopes(&self) -> ServiceResult<Vec<Uuid>>;
}

/// Write access for per-item bridging intercepts
#[async_trait]
pub trait InterceptSink: Send + Sync {
    async fn set_post_intercept(&self, post_id: Uuid, intercept: f64) -> ServiceResult<()>;
    async fn set_comment_intercept(&self, comment_id: Uuid, intercept: f64) -> ServiceResult<()>;
}

/// Append-only training log
#[async_trait]
pub trait TrainingLog: Send + Sync {
    async fn append(&self, run: &FactorizationRun) -> ServiceResult<()>;
}
