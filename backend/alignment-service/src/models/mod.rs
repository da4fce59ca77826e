//! Domain models for the alignment engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal-component basis for a topic scope, as reported by the upstream
/// statistical service. Immutable once fetched; superseded entirely when the
/// service reports a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaBasis {
    /// The two principal component vectors (length = number of known topics)
    pub components: [Vec<f64>; 2],
    /// Per-topic centering vector
    pub center: Vec<f64>,
    /// Greatest pairwise distance between cluster centroids; None when fewer
    /// than two centroids exist
    pub max_distance: Option<f64>,
    /// Opaque monotonically-advancing version tag
    pub version: String,
}

impl PcaBasis {
    /// Number of known topics covered by this basis
    pub fn topic_count(&self) -> usize {
        self.components[0].len()
    }
}

/// A position vote as cast by a user on a position statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionVoteValue {
    Agree,
    Disagree,
    Pass,
}

impl PositionVoteValue {
    /// Sign convention shared with the upstream statistical service:
    /// agree -> -1, disagree -> +1, pass -> 0. This mapping is a fixed
    /// external contract; coordinates are not comparable without it.
    pub fn basis_sign(self) -> f64 {
        match self {
            PositionVoteValue::Agree => -1.0,
            PositionVoteValue::Disagree => 1.0,
            PositionVoteValue::Pass => 0.0,
        }
    }

    pub fn from_db(kind: &str) -> Option<Self> {
        match kind {
            "agree" => Some(PositionVoteValue::Agree),
            "disagree" => Some(PositionVoteValue::Disagree),
            "pass" => Some(PositionVoteValue::Pass),
            _ => None,
        }
    }
}

/// Item type tag; keeps posts and comments in disjoint index spaces even
/// when their ids collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

/// A post or comment identified across both id spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: Uuid,
}

/// One pooled post/comment vote: +1.0 upvote, -1.0 downvote
#[derive(Debug, Clone, Copy)]
pub struct ContentVote {
    pub user_id: Uuid,
    pub item: ItemRef,
    pub value: f64,
}

/// Persisted per-(user, scope) alignment row.
///
/// (x, y) and basis_version are written by the lazy projection path; mf_x,
/// mf_y and n_comment_votes only by a factorization run. A pure
/// comment-voter may have an MF-only row with NULL PCA columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAlignment {
    pub user_id: Uuid,
    pub scope_id: Uuid,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub mf_x: Option<f64>,
    pub mf_y: Option<f64>,
    pub n_position_votes: i32,
    pub n_comment_votes: i32,
    pub basis_version: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// PCA-side coordinate view returned by the coordinate store
#[derive(Debug, Clone, PartialEq)]
pub struct PcaCoordinate {
    pub x: f64,
    pub y: f64,
    pub n_position_votes: i32,
    pub basis_version: String,
}

/// Statistics for one completed factorization run (training log row)
#[derive(Debug, Clone, Serialize)]
pub struct FactorizationRun {
    pub scope_id: Uuid,
    pub n_users: usize,
    pub n_items: usize,
    pub n_votes: usize,
    pub final_loss: f64,
    pub epochs: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_sign_contract() {
        // Fixed contract with the upstream service; agree pulls negative.
        assert_eq!(PositionVoteValue::Agree.basis_sign(), -1.0);
        assert_eq!(PositionVoteValue::Disagree.basis_sign(), 1.0);
        assert_eq!(PositionVoteValue::Pass.basis_sign(), 0.0);
    }

    #[test]
    fn test_item_refs_never_collide_across_kinds() {
        let id = Uuid::new_v4();
        let post = ItemRef {
            kind: ItemKind::Post,
            id,
        };
        let comment = ItemRef {
            kind: ItemKind::Comment,
            id,
        };
        assert_ne!(post, comment);
    }
}
