//! User projection onto the PCA basis
//!
//! Projects a sparse position-vote vector onto the two externally-supplied
//! principal components, with sparsity compensation so a user who voted on
//! only a handful of topics is pushed outward proportionally instead of
//! collapsing toward the origin. The scaling mirrors the upstream
//! statistical engine's own sparsity treatment, so coordinates from the two
//! systems stay comparable.

use crate::models::{PcaBasis, PositionVoteValue};
use std::collections::HashMap;

/// Sparse vote vector: basis topic index -> vote sign
pub type VoteVector = HashMap<usize, f64>;

/// Build the sparse vote vector from a user's position votes.
/// Duplicate indices keep the last vote.
pub fn vote_vector(votes: &[(usize, PositionVoteValue)]) -> VoteVector {
    votes
        .iter()
        .map(|(index, value)| (*index, value.basis_sign()))
        .collect()
}

/// Project a vote vector onto the basis.
///
/// Pure and total: empty inputs and out-of-range indices yield (0.0, 0.0),
/// never an error, since a user's arbitrary vote history cannot be validated
/// in advance.
pub fn project(votes: &VoteVector, basis: &PcaBasis) -> (f64, f64) {
    let topics = basis.topic_count();
    if topics == 0 || votes.is_empty() {
        return (0.0, 0.0);
    }

    let mut p1 = 0.0;
    let mut p2 = 0.0;
    let mut matched = 0usize;

    for (&index, &vote) in votes {
        let (Some(&center), Some(&a), Some(&b)) = (
            basis.center.get(index),
            basis.components[0].get(index),
            basis.components[1].get(index),
        ) else {
            continue;
        };

        let centered = vote - center;
        p1 += centered * a;
        p2 += centered * b;
        matched += 1;
    }

    if matched == 0 {
        return (0.0, 0.0);
    }

    // Sparsity compensation: sqrt(known topics / topics voted on)
    let scale = (topics as f64 / matched as f64).sqrt();
    (p1 * scale, p2 * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_basis() -> PcaBasis {
        PcaBasis {
            components: [vec![1.0, 0.0], vec![0.0, 1.0]],
            center: vec![0.0, 0.0],
            max_distance: None,
            version: "1".to_string(),
        }
    }

    #[test]
    fn test_empty_vector_projects_to_origin() {
        let basis = identity_basis();
        assert_eq!(project(&VoteVector::new(), &basis), (0.0, 0.0));
    }

    #[test]
    fn test_out_of_range_indices_project_to_origin() {
        let basis = identity_basis();
        let votes: VoteVector = [(5, 1.0), (9, -1.0)].into_iter().collect();
        assert_eq!(project(&votes, &basis), (0.0, 0.0));
    }

    #[test]
    fn test_single_vote_gets_sparsity_scale() {
        let basis = identity_basis();
        let votes: VoteVector = [(0, 1.0)].into_iter().collect();
        let (x, y) = project(&votes, &basis);
        // scale = sqrt(2/1)
        assert!((x - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(y.abs() < 1e-12);
    }

    #[test]
    fn test_full_vector_scale_is_one() {
        let basis = identity_basis();
        let votes: VoteVector = [(0, 1.0), (1, 1.0)].into_iter().collect();
        let (x, y) = project(&votes, &basis);
        // scale = sqrt(2/2) = 1
        assert!((x - 1.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centering_applies_to_pass_votes() {
        let basis = PcaBasis {
            components: [vec![1.0, 0.0], vec![0.0, 1.0]],
            center: vec![0.5, 0.0],
            max_distance: None,
            version: "1".to_string(),
        };
        // A pass (0.0) on a centered topic still pulls away from the mean
        let votes: VoteVector = [(0, 0.0)].into_iter().collect();
        let (x, _) = project(&votes, &basis);
        assert!((x - (-0.5 * 2.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_vote_vector_applies_sign_contract() {
        let votes = vec![
            (0, PositionVoteValue::Agree),
            (1, PositionVoteValue::Disagree),
            (2, PositionVoteValue::Pass),
        ];
        let vector = vote_vector(&votes);
        assert_eq!(vector[&0], -1.0);
        assert_eq!(vector[&1], 1.0);
        assert_eq!(vector[&2], 0.0);
    }
}
