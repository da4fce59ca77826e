//! Regularized biased matrix factorization fit by SGD
//!
//! predicted(u, i) = mu + bias_u[u] + bias_i[i] + factor_u[u] . factor_i[i]
//!
//! Latent factors are 2-dimensional to align with the PCA coordinate space.
//! Users with a PCA anchor are initialized at it and pulled toward it during
//! training with a separate regularization strength, so the factorization
//! stays comparable with the projection-derived coordinates.

use crate::config::FactorizationConfig;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Latent dimensionality, fixed to the PCA plane
pub const LATENT_DIM: usize = 2;

#[derive(Debug, Clone)]
pub struct FactorizationModel {
    /// Global bias (mean rating)
    pub mu: f64,
    pub user_bias: Vec<f64>,
    /// Per-item bias; persisted as the bridging intercept
    pub item_bias: Vec<f64>,
    /// Per-user latent factor; persisted as (mf_x, mf_y)
    pub user_factors: Vec<[f64; LATENT_DIM]>,
    pub item_factors: Vec<[f64; LATENT_DIM]>,
    /// Penalized loss at the last completed epoch
    pub final_loss: f64,
    pub epochs_run: usize,
}

impl FactorizationModel {
    /// Fit the model over (user_index, item_index, rating) triples.
    ///
    /// `anchors` maps user indices to normalized PCA coordinates; users
    /// without one are initialized with small random noise and trained
    /// unanchored. Degenerate inputs (single user, single item) are fine.
    pub fn fit(
        n_users: usize,
        n_items: usize,
        triples: &[(usize, usize, f64)],
        anchors: &HashMap<usize, [f64; LATENT_DIM]>,
        config: &FactorizationConfig,
    ) -> Self {
        let mut rng: StdRng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut model = Self {
            mu: 0.0,
            user_bias: vec![0.0; n_users],
            item_bias: vec![0.0; n_items],
            user_factors: (0..n_users)
                .map(|u| match anchors.get(&u) {
                    Some(anchor) => *anchor,
                    None => random_factor(&mut rng, config.init_noise),
                })
                .collect(),
            item_factors: (0..n_items)
                .map(|_| random_factor(&mut rng, config.init_noise))
                .collect(),
            final_loss: 0.0,
            epochs_run: 0,
        };

        if triples.is_empty() {
            return model;
        }

        model.mu = triples.iter().map(|t| t.2).sum::<f64>() / triples.len() as f64;

        let lr = config.learning_rate;
        let reg = config.regularization;
        let mut order: Vec<usize> = (0..triples.len()).collect();
        let mut prev_loss = f64::INFINITY;

        for epoch in 0..config.max_epochs {
            order.shuffle(&mut rng);

            for &t in &order {
                let (u, i, rating) = triples[t];
                let err = rating - model.predict(u, i);

                model.mu += lr * err;
                model.user_bias[u] += lr * (err - reg * model.user_bias[u]);
                model.item_bias[i] += lr * (err - reg * model.item_bias[i]);

                let pu = model.user_factors[u];
                let qi = model.item_factors[i];
                let anchor = anchors.get(&u);

                for d in 0..LATENT_DIM {
                    let mut user_grad = err * qi[d] - reg * pu[d];
                    if let Some(a) = anchor {
                        user_grad -= config.anchor_strength * (pu[d] - a[d]);
                    }
                    model.user_factors[u][d] = pu[d] + lr * user_grad;
                    model.item_factors[i][d] = qi[d] + lr * (err * pu[d] - reg * qi[d]);
                }
            }

            let loss = model.loss(triples, anchors, config);
            model.epochs_run = epoch + 1;
            model.final_loss = loss;

            if prev_loss.is_finite() {
                let improvement = (prev_loss - loss) / prev_loss.abs().max(f64::EPSILON);
                if improvement < config.tolerance {
                    break;
                }
            }
            prev_loss = loss;
        }

        model
    }

    pub fn predict(&self, u: usize, i: usize) -> f64 {
        let pu = &self.user_factors[u];
        let qi = &self.item_factors[i];
        self.mu + self.user_bias[u] + self.item_bias[i] + pu[0] * qi[0] + pu[1] * qi[1]
    }

    /// Mean squared residual over the observed triples
    pub fn mse(&self, triples: &[(usize, usize, f64)]) -> f64 {
        if triples.is_empty() {
            return 0.0;
        }
        triples
            .iter()
            .map(|&(u, i, r)| {
                let err = r - self.predict(u, i);
                err * err
            })
            .sum::<f64>()
            / triples.len() as f64
    }

    /// MSE plus L2 penalties, normalized by the number of observed votes
    fn loss(
        &self,
        triples: &[(usize, usize, f64)],
        anchors: &HashMap<usize, [f64; LATENT_DIM]>,
        config: &FactorizationConfig,
    ) -> f64 {
        let mut penalty = 0.0;
        for b in &self.user_bias {
            penalty += config.regularization * b * b;
        }
        for b in &self.item_bias {
            penalty += config.regularization * b * b;
        }
        for p in &self.user_factors {
            penalty += config.regularization * (p[0] * p[0] + p[1] * p[1]);
        }
        for q in &self.item_factors {
            penalty += config.regularization * (q[0] * q[0] + q[1] * q[1]);
        }
        for (u, a) in anchors {
            let p = &self.user_factors[*u];
            let dx = p[0] - a[0];
            let dy = p[1] - a[1];
            penalty += config.anchor_strength * (dx * dx + dy * dy);
        }

        self.mse(triples) + penalty / triples.len().max(1) as f64
    }
}

fn random_factor(rng: &mut StdRng, noise: f64) -> [f64; LATENT_DIM] {
    if noise <= 0.0 {
        return [0.0; LATENT_DIM];
    }
    [rng.gen_range(-noise..noise), rng.gen_range(-noise..noise)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FactorizationConfig {
        FactorizationConfig {
            learning_rate: 0.05,
            regularization: 0.01,
            anchor_strength: 0.0,
            init_noise: 0.1,
            max_epochs: 400,
            tolerance: 1e-7,
            seed: Some(7),
            min_voters: 0,
            min_votes: 0,
        }
    }

    /// Two groups with opposed votes: group A upvotes the first half of the
    /// items and downvotes the rest; group B the reverse.
    fn two_group_triples(n_users: usize, n_items: usize) -> Vec<(usize, usize, f64)> {
        let mut triples = Vec::new();
        for u in 0..n_users {
            let group_a = u < n_users / 2;
            for i in 0..n_items {
                let first_half = i < n_items / 2;
                let rating = if group_a == first_half { 1.0 } else { -1.0 };
                triples.push((u, i, rating));
            }
        }
        triples
    }

    #[test]
    fn test_recovers_group_structure() {
        let triples = two_group_triples(6, 10);
        let model = FactorizationModel::fit(6, 10, &triples, &HashMap::new(), &test_config());

        assert!(model.mse(&triples) < 0.25, "mse = {}", model.mse(&triples));

        // Mean factor per group
        let mean = |range: std::ops::Range<usize>| -> [f64; 2] {
            let mut m = [0.0; 2];
            for u in range.clone() {
                m[0] += model.user_factors[u][0];
                m[1] += model.user_factors[u][1];
            }
            [m[0] / range.len() as f64, m[1] / range.len() as f64]
        };
        let mean_a = mean(0..3);
        let mean_b = mean(3..6);
        let between =
            ((mean_a[0] - mean_b[0]).powi(2) + (mean_a[1] - mean_b[1]).powi(2)).sqrt();

        let spread = |range: std::ops::Range<usize>, m: [f64; 2]| -> f64 {
            range
                .clone()
                .map(|u| {
                    let p = model.user_factors[u];
                    ((p[0] - m[0]).powi(2) + (p[1] - m[1]).powi(2)).sqrt()
                })
                .sum::<f64>()
                / range.len() as f64
        };
        let within = (spread(0..3, mean_a) + spread(3..6, mean_b)) / 2.0;

        assert!(
            within < between,
            "within = {}, between = {}",
            within,
            between
        );
    }

    #[test]
    fn test_anchoring_pulls_factors_toward_anchors() {
        let triples = two_group_triples(6, 10);

        let mut anchors = HashMap::new();
        for u in 0..3 {
            anchors.insert(u, [-1.0, 0.0]);
        }
        for u in 3..6 {
            anchors.insert(u, [1.0, 0.0]);
        }

        let avg_anchor_dist = |model: &FactorizationModel| -> f64 {
            anchors
                .iter()
                .map(|(u, a)| {
                    let p = model.user_factors[*u];
                    ((p[0] - a[0]).powi(2) + (p[1] - a[1]).powi(2)).sqrt()
                })
                .sum::<f64>()
                / anchors.len() as f64
        };

        let unanchored = FactorizationModel::fit(6, 10, &triples, &HashMap::new(), &test_config());

        let mut anchored_config = test_config();
        anchored_config.anchor_strength = 0.5;
        let anchored = FactorizationModel::fit(6, 10, &triples, &anchors, &anchored_config);

        assert!(avg_anchor_dist(&anchored) < avg_anchor_dist(&unanchored));
    }

    #[test]
    fn test_intercept_orders_by_cross_spectrum_approval() {
        // Item 0: universally upvoted. Item 1: polarizing (half/half).
        // Item 2: universally downvoted.
        let mut triples = Vec::new();
        for u in 0..6 {
            triples.push((u, 0, 1.0));
            triples.push((u, 1, if u < 3 { 1.0 } else { -1.0 }));
            triples.push((u, 2, -1.0));
        }

        let model = FactorizationModel::fit(6, 3, &triples, &HashMap::new(), &test_config());

        assert!(model.item_bias[0] > model.item_bias[1]);
        assert!(model.item_bias[1] > model.item_bias[2]);
    }

    #[test]
    fn test_degenerate_single_user_single_item() {
        let triples = vec![(0, 0, 1.0)];
        let model = FactorizationModel::fit(1, 1, &triples, &HashMap::new(), &test_config());

        assert!(model.predict(0, 0).is_finite());
        assert!(model.mse(&triples) < 0.25);
        assert!(model.epochs_run >= 1);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let triples = two_group_triples(6, 10);
        let a = FactorizationModel::fit(6, 10, &triples, &HashMap::new(), &test_config());
        let b = FactorizationModel::fit(6, 10, &triples, &HashMap::new(), &test_config());

        assert_eq!(a.user_factors, b.user_factors);
        assert_eq!(a.item_bias, b.item_bias);
        assert_eq!(a.epochs_run, b.epochs_run);
    }

    #[test]
    fn test_empty_triples_returns_zero_model() {
        let model = FactorizationModel::fit(0, 0, &[], &HashMap::new(), &test_config());
        assert_eq!(model.mu, 0.0);
        assert_eq!(model.epochs_run, 0);
    }
}
