//! Coordinate blending
//!
//! Combines the PCA coordinate with the matrix-factorization coordinate as a
//! function of how much comment-voting evidence exists for the user. At zero
//! comment votes the blend is pure PCA; it saturates to pure matrix
//! factorization once the vote count reaches the threshold.

/// Comment votes at which the blend saturates to the MF coordinate
pub const DEFAULT_BLEND_THRESHOLD: u32 = 30;

/// Linear interpolation between the PCA and MF coordinates.
///
/// Pure and monotonic in `n_comment_votes`; an absent MF coordinate returns
/// the PCA coordinate unchanged.
pub fn blend(
    pca: (f64, f64),
    mf: Option<(f64, f64)>,
    n_comment_votes: u32,
    threshold: u32,
) -> (f64, f64) {
    let Some((mf_x, mf_y)) = mf else {
        return pca;
    };

    if threshold == 0 {
        return (mf_x, mf_y);
    }

    let alpha = (n_comment_votes as f64 / threshold as f64).min(1.0);
    (
        (1.0 - alpha) * pca.0 + alpha * mf_x,
        (1.0 - alpha) * pca.1 + alpha * mf_y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_votes_is_pure_pca() {
        let pca = (0.3, -0.7);
        assert_eq!(blend(pca, Some((5.0, 5.0)), 0, 30), pca);
    }

    #[test]
    fn test_threshold_votes_is_pure_mf() {
        let mf = (2.0, 4.0);
        assert_eq!(blend((0.3, -0.7), Some(mf), 30, 30), mf);
        // Saturates, does not overshoot
        assert_eq!(blend((0.3, -0.7), Some(mf), 90, 30), mf);
    }

    #[test]
    fn test_midpoint_interpolation() {
        assert_eq!(blend((0.0, 0.0), Some((2.0, 4.0)), 15, 30), (1.0, 2.0));
    }

    #[test]
    fn test_absent_mf_is_pure_pca_for_any_count() {
        let pca = (1.5, -2.5);
        for n in [0, 10, 30, 1000] {
            assert_eq!(blend(pca, None, n, 30), pca);
        }
    }

    #[test]
    fn test_monotonic_in_evidence() {
        let pca = (0.0, 0.0);
        let mf = (1.0, 0.0);
        let mut prev = -1.0;
        for n in 0..=30 {
            let (x, _) = blend(pca, Some(mf), n, 30);
            assert!(x >= prev);
            prev = x;
        }
    }
}
