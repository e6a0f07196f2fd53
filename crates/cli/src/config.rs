use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use kappa_core::Config;
use kappa_metrics::MetricsConfig;

use crate::cli::CliArgs;

/// Effective settings for one invocation: environment first, then flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pretty: bool,
    pub metrics: MetricsConfig,
}

impl Settings {
    pub fn resolve(args: &CliArgs, env: &Config) -> Result<Self> {
        let path: Option<PathBuf> = args.config.clone().or_else(|| env.metrics_config.clone());
        let metrics = match &path {
            Some(p) => MetricsConfig::load(p)
                .with_context(|| format!("failed to load metrics config {}", p.display()))?,
            None => {
                debug!("No metrics config file; using defaults");
                MetricsConfig::default()
            }
        };
        let metrics = metrics.with_env_overrides(&env.profile);

        Ok(Self {
            pretty: args.pretty || env.pretty,
            metrics,
        })
    }
}
