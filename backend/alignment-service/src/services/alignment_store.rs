//! Lazy per-user coordinate store
//!
//! Cache-aside over user_alignments rows, keyed by basis version rather than
//! wall clock: a row is recomputed exactly when the statistical basis
//! changes, not on a schedule. Safe under concurrent readers - a stale read
//! at worst costs one extra recomputation.

use crate::error::ServiceResult;
use crate::models::PcaCoordinate;
use crate::repository::{AlignmentRows, VoteSource};
use crate::services::basis::BasisSource;
use crate::services::{blend, projection};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct AlignmentStore {
    basis: Arc<dyn BasisSource>,
    rows: Arc<dyn AlignmentRows>,
    votes: Arc<dyn VoteSource>,
    blend_threshold: u32,
}

impl AlignmentStore {
    pub fn new(
        basis: Arc<dyn BasisSource>,
        rows: Arc<dyn AlignmentRows>,
        votes: Arc<dyn VoteSource>,
        blend_threshold: u32,
    ) -> Self {
        Self {
            basis,
            rows,
            votes,
            blend_threshold,
        }
    }

    /// Get the user's PCA coordinate, recomputing only when the persisted row
    /// is missing or was computed against a superseded basis version.
    ///
    /// Returns None when the scope has no basis or the user has no position
    /// votes; neither case writes a row.
    pub async fn get_or_compute(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> ServiceResult<Option<PcaCoordinate>> {
        let Some(basis) = self.basis.get_basis(scope_id).await? else {
            return Ok(None);
        };

        if let Some(row) = self.rows.get(user_id, scope_id).await? {
            if let (Some(x), Some(y), Some(version)) = (row.x, row.y, row.basis_version.as_deref())
            {
                if version == basis.version {
                    debug!(user_id = %user_id, scope_id = %scope_id, "Alignment row current");
                    return Ok(Some(PcaCoordinate {
                        x,
                        y,
                        n_position_votes: row.n_position_votes,
                        basis_version: version.to_string(),
                    }));
                }
            }
        }

        let votes = self.votes.position_votes(user_id, scope_id).await?;
        if votes.is_empty() {
            return Ok(None);
        }

        let vector = projection::vote_vector(&votes);
        let (x, y) = projection::project(&vector, &basis);
        let n_position_votes = votes.len() as i32;

        self.rows
            .upsert_projection(user_id, scope_id, x, y, n_position_votes, &basis.version)
            .await?;

        debug!(
            user_id = %user_id,
            scope_id = %scope_id,
            version = %basis.version,
            "Alignment recomputed"
        );

        Ok(Some(PcaCoordinate {
            x,
            y,
            n_position_votes,
            basis_version: basis.version,
        }))
    }

    /// Delete the persisted row; the next read recomputes against the latest
    /// basis. Called whenever the user casts or changes a position vote.
    pub async fn invalidate(&self, user_id: Uuid, scope_id: Uuid) -> ServiceResult<()> {
        self.rows.delete(user_id, scope_id).await?;
        debug!(user_id = %user_id, scope_id = %scope_id, "Alignment invalidated");
        Ok(())
    }

    /// The composite coordinate consumed by vote weighting and ranking.
    ///
    /// Absent PCA coordinate means absent result, regardless of whether a
    /// factorization run has produced an MF coordinate for the user.
    pub async fn get_effective(
        &self,
        user_id: Uuid,
        scope_id: Uuid,
    ) -> ServiceResult<Option<(f64, f64)>> {
        let Some(pca) = self.get_or_compute(user_id, scope_id).await? else {
            return Ok(None);
        };

        let row = self.rows.get(user_id, scope_id).await?;
        let (mf, n_comment_votes) = match &row {
            Some(r) => (r.mf_x.zip(r.mf_y), r.n_comment_votes.max(0) as u32),
            None => (None, 0),
        };

        Ok(Some(blend::blend(
            (pca.x, pca.y),
            mf,
            n_comment_votes,
            self.blend_threshold,
        )))
    }
}
