//! Job configuration.

use serde::{Deserialize, Serialize};

/// User agent sent on anonymous refetches. A widely deployed desktop profile
/// so the request blends into ordinary traffic.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/131.0.0.0 Safari/537.36";

/// Tunables for the doublefetch job. All fields have working defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Per-request timeout for the anonymous fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// User agent for the anonymous fetch.
    pub user_agent: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 15_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: JobConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, JobConfig::default());

        let config: JobConfig = serde_json::from_str(r#"{"fetch_timeout_ms": 1000}"#).unwrap();
        assert_eq!(config.fetch_timeout_ms, 1000);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }
}
