//! Ideological coordinate & matrix-factorization scoring engine
//!
//! Locates every participant on a shared two-dimensional ideological map and
//! exposes the coordinates that vote weighting and content ranking consume:
//!
//! - [`services::AlignmentStore::get_or_compute`] - lazy, basis-version
//!   invalidated PCA coordinate per (user, scope)
//! - [`services::AlignmentStore::get_effective`] - PCA/MF blend, the sole
//!   entry point other subsystems need
//! - [`services::AlignmentStore::invalidate`] - called by vote ingestion
//!   whenever a position vote changes
//! - [`services::FactorizationEngine::run`] - per-scope matrix-factorization
//!   batch run producing latent coordinates and bridging intercepts

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod repository;
pub mod services;
