use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the Agent Ethos reputation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthosConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Scoring algorithm configuration
    pub scoring: ScoringConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Rate limit per minute per client IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
    /// Admin API key for maintenance endpoints (rebuild). Disabled if unset.
    pub admin_api_key: Option<String>,
}

/// Knobs for the reputation scoring algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Lower bound on the voucher source-weight multiplier
    pub source_weight_floor: f64,
    /// Upper bound on the voucher source-weight multiplier
    pub source_weight_cap: f64,
    /// Reputation points per +1.0 of source-weight multiplier
    pub source_weight_scale: f64,
    /// Source-weight bonus for claimed (verified) vouchers, applied before the clamp
    pub claimed_source_bonus: f64,
    /// Contribution reduction per flag on an edge
    pub flag_discount_per_flag: f64,
    /// Minimum score on both edges of a mutual pair before the reciprocity discount applies
    pub reciprocity_score_threshold: i8,
    /// Window within which mutual vouches are treated as reciprocal
    pub reciprocity_window_hours: i64,
    /// Factor applied to both edges of a reciprocal pair
    pub reciprocity_factor: f64,
    /// Defensive bound on the aggregate score magnitude
    pub score_clamp: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum agent name length (characters, after trimming)
    pub max_name_len: usize,
    /// Maximum agent description length
    pub max_description_len: usize,
    /// Maximum vouch note length
    pub max_note_len: usize,
    /// Maximum flag reason length
    pub max_reason_len: usize,
    /// Maximum receipt URL length
    pub max_receipt_url_len: usize,
    /// Default page size for vouch listings
    pub default_vouch_limit: usize,
    /// Maximum page size for vouch listings
    pub max_vouch_limit: usize,
    /// Default leaderboard size
    pub default_leaderboard_limit: usize,
    /// Maximum leaderboard size
    pub max_leaderboard_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, the engine runs fully in memory)
    pub postgres_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Enable request/response logging spans
    pub log_requests: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            source_weight_floor: 0.2,
            source_weight_cap: 2.0,
            source_weight_scale: 25.0,
            claimed_source_bonus: 1.25,
            flag_discount_per_flag: 0.5,
            reciprocity_score_threshold: 4,
            reciprocity_window_hours: 48,
            reciprocity_factor: 0.5,
            score_clamp: 1_000_000.0,
        }
    }
}

impl ScoringConfig {
    /// Convert to ScoringWeights for use by the ReputationManager
    pub fn to_weights(&self) -> crate::reputation::ScoringWeights {
        crate::reputation::ScoringWeights {
            source_weight_floor: self.source_weight_floor,
            source_weight_cap: self.source_weight_cap,
            source_weight_scale: self.source_weight_scale,
            claimed_source_bonus: self.claimed_source_bonus,
            flag_discount_per_flag: self.flag_discount_per_flag,
            reciprocity_score_threshold: self.reciprocity_score_threshold,
            reciprocity_window_hours: self.reciprocity_window_hours,
            reciprocity_factor: self.reciprocity_factor,
            score_clamp: self.score_clamp,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_name_len: 64,
            max_description_len: 500,
            max_note_len: 500,
            max_reason_len: 500,
            max_receipt_url_len: 500,
            default_vouch_limit: 20,
            max_vouch_limit: 100,
            default_leaderboard_limit: 50,
            max_leaderboard_limit: 200,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/ethos".to_string(),
            postgres_enabled: false,
        }
    }
}

impl Default for EthosConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            security: SecurityConfig {
                rate_limit_per_minute: 120,
                max_request_size: 64 * 1024, // all request bodies are small JSON
                admin_api_key: None,
            },
            scoring: ScoringConfig::default(),
            limits: LimitsConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                log_requests: false,
            },
        }
    }
}

impl EthosConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = env::var("ETHOS_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("ETHOS_PORT") {
            config.server.port = port.parse().context("Invalid ETHOS_PORT value")?;
        }

        // Security configuration
        if let Ok(rate_limit) = env::var("ETHOS_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute = rate_limit
                .parse()
                .context("Invalid ETHOS_RATE_LIMIT_PER_MINUTE value")?;
        }

        if let Ok(max_size) = env::var("ETHOS_MAX_REQUEST_SIZE") {
            config.security.max_request_size = max_size
                .parse()
                .context("Invalid ETHOS_MAX_REQUEST_SIZE value")?;
        }

        if let Ok(key) = env::var("ETHOS_ADMIN_API_KEY") {
            if !key.is_empty() {
                config.security.admin_api_key = Some(key);
            }
        }

        // Scoring configuration
        if let Ok(floor) = env::var("ETHOS_SOURCE_WEIGHT_FLOOR") {
            config.scoring.source_weight_floor = floor
                .parse()
                .context("Invalid ETHOS_SOURCE_WEIGHT_FLOOR value")?;
        }

        if let Ok(cap) = env::var("ETHOS_SOURCE_WEIGHT_CAP") {
            config.scoring.source_weight_cap = cap
                .parse()
                .context("Invalid ETHOS_SOURCE_WEIGHT_CAP value")?;
        }

        if let Ok(scale) = env::var("ETHOS_SOURCE_WEIGHT_SCALE") {
            config.scoring.source_weight_scale = scale
                .parse()
                .context("Invalid ETHOS_SOURCE_WEIGHT_SCALE value")?;
        }

        if let Ok(bonus) = env::var("ETHOS_CLAIMED_SOURCE_BONUS") {
            config.scoring.claimed_source_bonus = bonus
                .parse()
                .context("Invalid ETHOS_CLAIMED_SOURCE_BONUS value")?;
        }

        if let Ok(discount) = env::var("ETHOS_FLAG_DISCOUNT_PER_FLAG") {
            config.scoring.flag_discount_per_flag = discount
                .parse()
                .context("Invalid ETHOS_FLAG_DISCOUNT_PER_FLAG value")?;
        }

        if let Ok(threshold) = env::var("ETHOS_RECIPROCITY_SCORE_THRESHOLD") {
            config.scoring.reciprocity_score_threshold = threshold
                .parse()
                .context("Invalid ETHOS_RECIPROCITY_SCORE_THRESHOLD value")?;
        }

        if let Ok(hours) = env::var("ETHOS_RECIPROCITY_WINDOW_HOURS") {
            config.scoring.reciprocity_window_hours = hours
                .parse()
                .context("Invalid ETHOS_RECIPROCITY_WINDOW_HOURS value")?;
        }

        // Database configuration
        if let Ok(url) = env::var("ETHOS_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Ok(enabled) = env::var("ETHOS_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid ETHOS_POSTGRES_ENABLED value")?;
        }

        // Logging configuration
        if let Ok(log_level) = env::var("ETHOS_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(log_requests) = env::var("ETHOS_LOG_REQUESTS") {
            config.logging.log_requests = log_requests
                .parse()
                .context("Invalid ETHOS_LOG_REQUESTS value")?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Sanity-check the loaded configuration
    fn validate(&self) -> Result<()> {
        if self.scoring.source_weight_floor < 0.0 {
            return Err(anyhow::anyhow!("source weight floor must be non-negative"));
        }

        if self.scoring.source_weight_cap < self.scoring.source_weight_floor {
            return Err(anyhow::anyhow!(
                "source weight cap {} is below the floor {}",
                self.scoring.source_weight_cap,
                self.scoring.source_weight_floor
            ));
        }

        if self.scoring.source_weight_scale <= 0.0 {
            return Err(anyhow::anyhow!("source weight scale must be positive"));
        }

        if !(0.0..=1.0).contains(&self.scoring.flag_discount_per_flag) {
            return Err(anyhow::anyhow!(
                "flag discount per flag must be within [0, 1]"
            ));
        }

        if self.limits.max_vouch_limit == 0 || self.limits.max_leaderboard_limit == 0 {
            return Err(anyhow::anyhow!("page size limits must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EthosConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_scoring_matches_weights() {
        let weights = ScoringConfig::default().to_weights();
        assert!((weights.source_weight_floor - 0.2).abs() < f64::EPSILON);
        assert!((weights.source_weight_cap - 2.0).abs() < f64::EPSILON);
        assert!((weights.flag_discount_per_flag - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_inverted_clamp() {
        let mut config = EthosConfig::default();
        config.scoring.source_weight_cap = 0.1;
        assert!(config.validate().is_err());
    }
}
