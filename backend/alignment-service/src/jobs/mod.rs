pub mod factorization_batch;

pub use factorization_batch::{FactorizationBatchConfig, FactorizationBatchJob};
