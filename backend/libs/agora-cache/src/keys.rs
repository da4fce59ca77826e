//! Unified cache key schema
//!
//! All services must use these key generators to ensure consistency.
//! Key format: v{VERSION}:{entity}:{identifier}[:sub_key]

use uuid::Uuid;

/// Cache schema version - increment when changing key formats
pub const CACHE_VERSION: u32 = 1;

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    // ============= Alignment Keys =============

    /// Current PCA basis for a topic scope
    /// Format: v1:alignment:basis:{scope_id}
    pub fn scope_basis(scope_id: Uuid) -> String {
        format!("v{}:alignment:basis:{}", CACHE_VERSION, scope_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_basis_key() {
        let scope = Uuid::nil();
        assert_eq!(
            CacheKey::scope_basis(scope),
            format!("v1:alignment:basis:{}", scope)
        );
    }
}
