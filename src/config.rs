//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;

use uuid::Uuid;

use crate::aggregation::AggregationMode;
use crate::auth::TokenRegistry;
use crate::domain::CallerIdentity;

/// One pre-issued API token: sha256 hex of the raw token plus the identity
/// it authenticates as
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub token_hash: String,
    pub caller: CallerIdentity,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Append-only event log; None runs the store ephemerally
    pub event_log_path: Option<PathBuf>,

    /// Aggregation recompute policy
    pub aggregation_mode: AggregationMode,

    /// Seconds between aggregation reconcile passes
    pub reconcile_interval_secs: u64,

    /// Pre-issued API tokens, `sha256hex:user_uuid[:admin]` entries
    pub auth_tokens: Vec<TokenSpec>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let event_log_path = env::var("EVENT_LOG_PATH").ok().map(PathBuf::from);

        let aggregation_mode = parse_aggregation_mode(
            &env::var("AGGREGATION_MODE").unwrap_or_else(|_| "incremental".to_string()),
        )?;

        let reconcile_interval_secs = env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RECONCILE_INTERVAL_SECS"))?;

        let auth_tokens = match env::var("AUTH_TOKENS") {
            Ok(raw) => parse_auth_tokens(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            host,
            port,
            event_log_path,
            aggregation_mode,
            reconcile_interval_secs,
            auth_tokens,
        })
    }

    /// Build the token registry from the configured token specs
    pub fn token_registry(&self) -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        for spec in &self.auth_tokens {
            registry.insert_hash(spec.token_hash.clone(), spec.caller);
        }
        registry
    }
}

fn parse_aggregation_mode(raw: &str) -> Result<AggregationMode, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "full" => Ok(AggregationMode::Full),
        "incremental" => Ok(AggregationMode::Incremental),
        _ => Err(ConfigError::InvalidValue("AGGREGATION_MODE")),
    }
}

/// Parse `sha256hex:user_uuid[:admin]` entries separated by commas
fn parse_auth_tokens(raw: &str) -> Result<Vec<TokenSpec>, ConfigError> {
    let mut specs = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let mut parts = entry.split(':');
        let hash = parts.next().unwrap_or_default();
        let user_id = parts.next().unwrap_or_default();
        let role = parts.next();

        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidValue("AUTH_TOKENS"));
        }
        let user_id: Uuid = user_id
            .parse()
            .map_err(|_| ConfigError::InvalidValue("AUTH_TOKENS"))?;
        let caller = match role {
            None => CallerIdentity::user(user_id),
            Some("admin") => CallerIdentity::admin(user_id),
            Some(_) => return Err(ConfigError::InvalidValue("AUTH_TOKENS")),
        };

        specs.push(TokenSpec {
            token_hash: hash.to_lowercase(),
            caller,
        });
    }
    Ok(specs)
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_token;

    #[test]
    fn test_parse_aggregation_mode() {
        assert_eq!(
            parse_aggregation_mode("full").unwrap(),
            AggregationMode::Full
        );
        assert_eq!(
            parse_aggregation_mode(" Incremental ").unwrap(),
            AggregationMode::Incremental
        );
        assert!(parse_aggregation_mode("eager").is_err());
    }

    #[test]
    fn test_parse_auth_tokens() {
        let user = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let raw = format!(
            "{}:{},{}:{}:admin",
            hash_token("user-token"),
            user,
            hash_token("admin-token"),
            admin
        );

        let specs = parse_auth_tokens(&raw).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].caller, CallerIdentity::user(user));
        assert_eq!(specs[1].caller, CallerIdentity::admin(admin));
    }

    #[test]
    fn test_parse_auth_tokens_rejects_garbage() {
        assert!(parse_auth_tokens("nothex:not-a-uuid").is_err());
        let good_hash = hash_token("x");
        assert!(parse_auth_tokens(&format!("{}:not-a-uuid", good_hash)).is_err());
        assert!(parse_auth_tokens(&format!("{}:{}:superuser", good_hash, Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_empty_entries_skipped() {
        assert!(parse_auth_tokens("").unwrap().is_empty());
        assert!(parse_auth_tokens(" , ,").unwrap().is_empty());
    }
}
