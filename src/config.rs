use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::core::registry::BackendRegistry;
use crate::core::tree::AggregationPolicy;

/// Layered application configuration: built-in defaults, then
/// `arkivd.toml`, then `ARKIVD_`-prefixed environment variables, then
/// CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// Backends configured for nodes archived by this deployment.
    /// Explicit configuration, consulted only through events that carry
    /// no backend list of their own.
    #[serde(default)]
    pub backends: BackendRegistry,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("arkivd.db"),
            backends: BackendRegistry::default(),
            aggregation: AggregationPolicy::default(),
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    pub fn new<A: Serialize>(args: Option<&A>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("arkivd.toml"))
            .merge(Env::prefixed("ARKIVD_"));

        if let Some(args) = args {
            figment = figment.merge(Serialized::defaults(args));
        }

        figment.extract().context("Failed to load configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_sources() {
        let config = AppConfig::new(None::<&()>).unwrap();
        assert_eq!(config.database_path, PathBuf::from("arkivd.db"));
        assert!(!config.verbose);
        assert!(config.backends.backends.is_empty());
    }

    #[test]
    fn cli_args_override_defaults() {
        #[derive(Serialize)]
        struct Args {
            database_path: String,
            verbose: bool,
        }

        let config = AppConfig::new(Some(&Args {
            database_path: "/tmp/jobs.db".into(),
            verbose: true,
        }))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/jobs.db"));
        assert!(config.verbose);
    }
}
