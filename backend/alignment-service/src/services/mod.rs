pub mod alignment_store;
pub mod basis;
pub mod blend;
pub mod factorization;
pub mod projection;

pub use alignment_store::AlignmentStore;
pub use basis::{BasisCache, BasisProvider, BasisSource, MathServiceClient, PcaBasisService};
pub use factorization::FactorizationEngine;
