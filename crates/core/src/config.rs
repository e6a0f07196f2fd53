use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
pub fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Parse a profiled env var into any `FromStr` type; unparsable values are
/// ignored with a warning.
pub fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str) -> Option<T> {
    let raw = profiled_env_opt(profile, key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring unparsable value for {}: '{}'", key, raw);
            None
        }
    }
}

/// Name of the active profile (`KAPPA_PROFILE`, upper-cased, empty = default).
pub fn active_profile() -> String {
    env_or("KAPPA_PROFILE", "").to_uppercase()
}

// ── Runtime config ────────────────────────────────────────────

/// Process-level settings for the command-line driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
    /// Optional YAML file with metric constants.
    pub metrics_config: Option<PathBuf>,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// When `KAPPA_PROFILE` is set (e.g. `SENSITIVITY`), every key is first
    /// looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        Self::for_profile(&active_profile())
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            log_filter: profiled_env_opt(p, "KAPPA_LOG")
                .or_else(|| env_opt("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),
            metrics_config: profiled_env_opt(p, "KAPPA_METRICS_CONFIG").map(PathBuf::from),
            pretty: profiled_env_bool(p, "KAPPA_PRETTY", false),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::debug!("Config loaded (profile: {}):", self.profile_label());
        tracing::debug!("  log:      filter={}", self.log_filter);
        tracing::debug!(
            "  metrics:  config={}",
            self.metrics_config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(defaults)".to_string())
        );
        tracing::debug!("  output:   pretty={}", self.pretty);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: String::new(),
            log_filter: profiled_env_or("", "KAPPA_LOG", "info"),
            metrics_config: None,
            pretty: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests use unique keys so they do not race with each other.

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        env::set_var("KAPPA_TEST_PROFILED_KEY", "plain");
        env::set_var("STUDY_KAPPA_TEST_PROFILED_KEY", "prefixed");
        assert_eq!(
            profiled_env_opt("STUDY", "KAPPA_TEST_PROFILED_KEY").as_deref(),
            Some("prefixed")
        );
        assert_eq!(
            profiled_env_opt("OTHER", "KAPPA_TEST_PROFILED_KEY").as_deref(),
            Some("plain")
        );
        assert_eq!(
            profiled_env_opt("", "KAPPA_TEST_PROFILED_KEY").as_deref(),
            Some("plain")
        );
    }

    #[test]
    fn profiled_parse_ignores_garbage() {
        env::set_var("KAPPA_TEST_PARSE_GOOD", "0.42");
        env::set_var("KAPPA_TEST_PARSE_BAD", "not-a-number");
        assert_eq!(profiled_env_parse::<f64>("", "KAPPA_TEST_PARSE_GOOD"), Some(0.42));
        assert_eq!(profiled_env_parse::<f64>("", "KAPPA_TEST_PARSE_BAD"), None);
    }

    #[test]
    fn profile_label_defaults() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
        let cfg = Config::for_profile("sensitivity");
        assert_eq!(cfg.profile_label(), "SENSITIVITY");
    }
}
