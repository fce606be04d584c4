//! Runtime configuration from `LISTER_*` environment variables.

use crate::navigator::RetryPolicy;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub site_root: String,
    /// Base URL of the local Playwright bridge.
    pub bridge_url: String,
    pub max_attempts: u32,
    pub settle_ms: u64,
    pub exponential_backoff: bool,
    /// Ask the operator before each publish instead of running unattended.
    pub confirm_each: bool,
    /// Reject listings whose images are not in an accepted format.
    pub strict_image_formats: bool,
    /// Where to checkpoint the run report; set by the CLI per input file.
    pub report_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            site_root: "https://www.grailed.com".into(),
            bridge_url: "http://127.0.0.1:8931".into(),
            max_attempts: 3,
            settle_ms: 750,
            exponential_backoff: true,
            confirm_each: false,
            strict_image_formats: false,
            report_path: None,
        }
    }
}

impl AgentConfig {
    /// Anything unset in the environment keeps its default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            site_root: env_string("LISTER_SITE_ROOT").unwrap_or(defaults.site_root),
            bridge_url: env_string("LISTER_BRIDGE_URL").unwrap_or(defaults.bridge_url),
            max_attempts: env_parse("LISTER_MAX_ATTEMPTS")
                .filter(|value| *value >= 1)
                .unwrap_or(defaults.max_attempts),
            settle_ms: env_parse("LISTER_SETTLE_MS").unwrap_or(defaults.settle_ms),
            exponential_backoff: env_bool("LISTER_EXPONENTIAL_BACKOFF")
                .unwrap_or(defaults.exponential_backoff),
            confirm_each: env_bool("LISTER_CONFIRM_EACH").unwrap_or(defaults.confirm_each),
            strict_image_formats: env_bool("LISTER_STRICT_FORMATS")
                .unwrap_or(defaults.strict_image_formats),
            report_path: None,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            settle_ms: self.settle_ms,
            exponential: self.exponential_backoff,
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AgentConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(!config.confirm_each);
        assert!(config.site_root.starts_with("https://"));
    }

    #[test]
    fn retry_policy_mirrors_the_config() {
        let config = AgentConfig {
            max_attempts: 5,
            settle_ms: 100,
            exponential_backoff: false,
            ..AgentConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.settle_ms, 100);
        assert!(!policy.exponential);
    }
}
