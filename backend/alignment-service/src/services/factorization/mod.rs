//! Matrix factorization trainer
//!
//! One synchronous run per invocation: load the pooled rating matrix for a
//! scope, load PCA anchors, fit the model, persist results. No partial or
//! resumable state is kept between runs; each persistence write is
//! independent and idempotent, so an interrupted run leaves some rows stale
//! until the next successful run rather than corrupt.

pub mod matrix;
pub mod model;

pub use matrix::RatingMatrix;
pub use model::{FactorizationModel, LATENT_DIM};

use crate::config::FactorizationConfig;
use crate::error::ServiceResult;
use crate::models::{FactorizationRun, ItemKind};
use crate::repository::{AlignmentRows, InterceptSink, TrainingLog, VoteSource};
use crate::services::alignment_store::AlignmentStore;
use crate::services::basis::BasisSource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub struct FactorizationEngine {
    store: Arc<AlignmentStore>,
    basis: Arc<dyn BasisSource>,
    rows: Arc<dyn AlignmentRows>,
    votes: Arc<dyn VoteSource>,
    intercepts: Arc<dyn InterceptSink>,
    log: Arc<dyn TrainingLog>,
    config: FactorizationConfig,
}

impl FactorizationEngine {
    pub fn new(
        store: Arc<AlignmentStore>,
        basis: Arc<dyn BasisSource>,
        rows: Arc<dyn AlignmentRows>,
        votes: Arc<dyn VoteSource>,
        intercepts: Arc<dyn InterceptSink>,
        log: Arc<dyn TrainingLog>,
        config: FactorizationConfig,
    ) -> Self {
        Self {
            store,
            basis,
            rows,
            votes,
            intercepts,
            log,
            config,
        }
    }

    /// Run one factorization pass for a scope.
    ///
    /// Returns None (a normal skip, not an error) when the scope has too few
    /// voters or votes to factor meaningfully.
    pub async fn run(&self, scope_id: Uuid) -> ServiceResult<Option<FactorizationRun>> {
        let started = Instant::now();

        let votes = self.votes.content_votes(scope_id).await?;
        let matrix = RatingMatrix::from_votes(&votes);

        if matrix.n_users() < self.config.min_voters || matrix.n_votes() < self.config.min_votes {
            info!(
                scope_id = %scope_id,
                users = matrix.n_users(),
                votes = matrix.n_votes(),
                "Skipping factorization: not enough signal"
            );
            return Ok(None);
        }

        let anchors = self.load_anchors(scope_id, &matrix).await?;
        debug!(
            scope_id = %scope_id,
            anchored = anchors.len(),
            users = matrix.n_users(),
            "PCA anchors loaded"
        );

        let model = FactorizationModel::fit(
            matrix.n_users(),
            matrix.n_items(),
            &matrix.triples,
            &anchors,
            &self.config,
        );

        for (u, user_id) in matrix.users.iter().enumerate() {
            let factor = model.user_factors[u];
            self.rows
                .set_latent(*user_id, scope_id, factor[0], factor[1])
                .await?;
        }

        for (i, item) in matrix.items.iter().enumerate() {
            let intercept = model.item_bias[i];
            match item.kind {
                ItemKind::Post => self.intercepts.set_post_intercept(item.id, intercept).await?,
                ItemKind::Comment => {
                    self.intercepts
                        .set_comment_intercept(item.id, intercept)
                        .await?
                }
            }
        }

        let counts = self.votes.engagement_counts(scope_id).await?;
        self.rows.set_engagement_counts(scope_id, &counts).await?;

        let run = FactorizationRun {
            scope_id,
            n_users: matrix.n_users(),
            n_items: matrix.n_items(),
            n_votes: matrix.n_votes(),
            final_loss: model.final_loss,
            epochs: model.epochs_run,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.log.append(&run).await?;

        info!(
            scope_id = %scope_id,
            users = run.n_users,
            items = run.n_items,
            votes = run.n_votes,
            epochs = run.epochs,
            final_loss = run.final_loss,
            duration_ms = run.duration_ms,
            "Factorization run completed"
        );

        Ok(Some(run))
    }

    /// PCA coordinates for users present in the matrix, normalized by the
    /// basis's max inter-cluster distance so their scale matches the latent
    /// space. Users without a coordinate are simply omitted.
    async fn load_anchors(
        &self,
        scope_id: Uuid,
        matrix: &RatingMatrix,
    ) -> ServiceResult<HashMap<usize, [f64; LATENT_DIM]>> {
        let basis = self.basis.get_basis(scope_id).await?;
        let scale = basis
            .as_ref()
            .and_then(|b| b.max_distance)
            .filter(|d| *d > f64::EPSILON)
            .unwrap_or(1.0);

        let mut anchors = HashMap::new();
        for (u, user_id) in matrix.users.iter().enumerate() {
            if let Some(coord) = self.store.get_or_compute(*user_id, scope_id).await? {
                anchors.insert(u, [coord.x / scale, coord.y / scale]);
            }
        }

        Ok(anchors)
    }
}
