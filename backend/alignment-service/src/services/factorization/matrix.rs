//! Pooled sparse rating matrix
//!
//! Post and comment votes within one topic scope merged into a single
//! dense-indexed triple list. Items carry a type tag so a post and a comment
//! sharing an id never collide. Ephemeral: exists only for one training run.

use crate::models::{ContentVote, ItemRef};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RatingMatrix {
    /// (user_index, item_index, rating) triples, sorted for determinism
    pub triples: Vec<(usize, usize, f64)>,
    /// user_index -> user id
    pub users: Vec<Uuid>,
    /// item_index -> item
    pub items: Vec<ItemRef>,
}

impl RatingMatrix {
    /// Build dense-indexed triples from pooled votes.
    /// A user's repeated vote on the same item keeps the last value.
    pub fn from_votes(votes: &[ContentVote]) -> Self {
        let mut user_index: HashMap<Uuid, usize> = HashMap::new();
        let mut item_index: HashMap<ItemRef, usize> = HashMap::new();
        let mut users = Vec::new();
        let mut items = Vec::new();
        let mut ratings: HashMap<(usize, usize), f64> = HashMap::new();

        for vote in votes {
            let u = *user_index.entry(vote.user_id).or_insert_with(|| {
                users.push(vote.user_id);
                users.len() - 1
            });
            let i = *item_index.entry(vote.item).or_insert_with(|| {
                items.push(vote.item);
                items.len() - 1
            });
            ratings.insert((u, i), vote.value);
        }

        let mut triples: Vec<(usize, usize, f64)> = ratings
            .into_iter()
            .map(|((u, i), r)| (u, i, r))
            .collect();
        triples.sort_by_key(|&(u, i, _)| (u, i));

        Self {
            triples,
            users,
            items,
        }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    pub fn n_votes(&self) -> usize {
        self.triples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;

    fn vote(user: Uuid, kind: ItemKind, id: Uuid, value: f64) -> ContentVote {
        ContentVote {
            user_id: user,
            item: ItemRef { kind, id },
            value,
        }
    }

    #[test]
    fn test_posts_and_comments_get_distinct_indices() {
        let user = Uuid::new_v4();
        let shared_id = Uuid::new_v4();
        let votes = vec![
            vote(user, ItemKind::Post, shared_id, 1.0),
            vote(user, ItemKind::Comment, shared_id, -1.0),
        ];

        let matrix = RatingMatrix::from_votes(&votes);
        assert_eq!(matrix.n_items(), 2);
        assert_eq!(matrix.n_users(), 1);
        assert_eq!(matrix.n_votes(), 2);
    }

    #[test]
    fn test_repeat_vote_keeps_last_value() {
        let user = Uuid::new_v4();
        let post = Uuid::new_v4();
        let votes = vec![
            vote(user, ItemKind::Post, post, 1.0),
            vote(user, ItemKind::Post, post, -1.0),
        ];

        let matrix = RatingMatrix::from_votes(&votes);
        assert_eq!(matrix.n_votes(), 1);
        assert_eq!(matrix.triples[0], (0, 0, -1.0));
    }

    #[test]
    fn test_empty_votes() {
        let matrix = RatingMatrix::from_votes(&[]);
        assert_eq!(matrix.n_users(), 0);
        assert_eq!(matrix.n_items(), 0);
        assert_eq!(matrix.n_votes(), 0);
    }
}
