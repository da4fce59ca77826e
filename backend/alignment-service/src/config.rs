/// Configuration management for Alignment Service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Engine tunables
    pub engine: EngineConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
}

/// Coordinate engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the upstream statistical service
    pub math_service_url: String,
    /// Timeout for upstream calls (seconds); timeouts degrade to "no basis"
    pub math_timeout_secs: u64,
    /// TTL for cached PCA bases (seconds)
    pub basis_ttl_secs: u64,
    /// Comment votes at which blending saturates to pure matrix factorization
    pub blend_threshold: u32,
    /// Matrix-factorization hyperparameters
    pub factorization: FactorizationConfig,
}

/// Matrix-factorization hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorizationConfig {
    /// SGD step size
    pub learning_rate: f64,
    /// L2 shrinkage on biases and latent factors
    pub regularization: f64,
    /// Pull strength toward PCA anchors
    pub anchor_strength: f64,
    /// Half-width of the uniform init range for unanchored factors
    pub init_noise: f64,
    /// Hard epoch ceiling
    pub max_epochs: usize,
    /// Stop once relative loss improvement falls below this
    pub tolerance: f64,
    /// RNG seed; None draws fresh entropy per run
    pub seed: Option<u64>,
    /// Minimum distinct voters for a scope to be factored
    pub min_voters: usize,
    /// Minimum pooled votes for a scope to be factored
    pub min_votes: usize,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.02,
            regularization: 0.02,
            anchor_strength: 0.1,
            init_noise: 0.1,
            max_epochs: 200,
            tolerance: 1e-4,
            seed: Some(42),
            min_voters: 5,
            min_votes: 25,
        }
    }
}

impl FactorizationConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            learning_rate: env_parse("MF_LEARNING_RATE", defaults.learning_rate),
            regularization: env_parse("MF_REGULARIZATION", defaults.regularization),
            anchor_strength: env_parse("MF_ANCHOR_STRENGTH", defaults.anchor_strength),
            init_noise: env_parse("MF_INIT_NOISE", defaults.init_noise),
            max_epochs: env_parse("MF_MAX_EPOCHS", defaults.max_epochs),
            tolerance: env_parse("MF_TOLERANCE", defaults.tolerance),
            // MF_SEED=random draws fresh entropy per run
            seed: match std::env::var("MF_SEED") {
                Ok(s) if s.eq_ignore_ascii_case("random") => None,
                Ok(s) => s.parse().ok().or(defaults.seed),
                Err(_) => defaults.seed,
            },
            min_voters: env_parse("MF_MIN_VOTERS", defaults.min_voters),
            min_votes: env_parse("MF_MIN_VOTES", defaults.min_votes),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL").context("REDIS_URL environment variable not set")?,
        };

        let engine = EngineConfig {
            math_service_url: std::env::var("MATH_SERVICE_URL")
                .context("MATH_SERVICE_URL environment variable not set")?,
            math_timeout_secs: env_parse("MATH_TIMEOUT_SECS", 5),
            basis_ttl_secs: env_parse("BASIS_TTL_SECS", agora_cache::ttl::PCA_BASIS),
            blend_threshold: env_parse(
                "BLEND_THRESHOLD",
                crate::services::blend::DEFAULT_BLEND_THRESHOLD,
            ),
            factorization: FactorizationConfig::from_env(),
        };

        Ok(Config {
            database,
            redis,
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorization_defaults() {
        let config = FactorizationConfig::default();
        assert_eq!(config.max_epochs, 200);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.min_voters, 5);
        assert_eq!(config.min_votes, 25);
    }
}
