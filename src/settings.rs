use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

pub const DEFAULT_INDEX_URL: &str = "https://eyerounds.org/atlas/index.htm";
pub const DEFAULT_DB_URL: &str = "https://eyerounds.org/atlas/atlasJS/atlasJS_revision_22.js";
pub const DEFAULT_OUTPUT: &str = "data/all_flashcards.json";

/// Run settings: built-in defaults, then `ATLAS_*` environment variables.
/// Command-line flags are applied on top by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub index_url: String,
    pub db_url: String,
    pub output: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// `None` keeps every fetched page; `Some(0)` disables the cache.
    pub cache_capacity: Option<usize>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_env(Environment::with_prefix("ATLAS").try_parsing(true))
    }

    fn from_env(env: Environment) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("index_url", DEFAULT_INDEX_URL)?
            .set_default("db_url", DEFAULT_DB_URL)?
            .set_default("output", DEFAULT_OUTPUT)?
            .set_default("concurrency", 8)?
            .set_default("timeout_secs", 15)?
            .set_default(
                "user_agent",
                concat!("atlas_cards/", env!("CARGO_PKG_VERSION")),
            )?
            .add_source(env)
            .build()
            .context("building settings")?
            .try_deserialize()
            .context("reading ATLAS_* settings")?;
        anyhow::ensure!(settings.concurrency > 0, "concurrency must be at least 1");
        anyhow::ensure!(settings.timeout_secs > 0, "timeout must be at least 1 second");
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix("ATLAS").try_parsing(true).source(Some(map))
    }

    #[test]
    fn defaults() {
        let s = Settings::from_env(env(&[])).unwrap();
        assert_eq!(s.index_url, DEFAULT_INDEX_URL);
        assert_eq!(s.output, DEFAULT_OUTPUT);
        assert_eq!(s.concurrency, 8);
        assert_eq!(s.timeout(), Duration::from_secs(15));
        assert_eq!(s.cache_capacity, None);
        assert!(s.user_agent.starts_with("atlas_cards/"));
    }

    #[test]
    fn environment_overrides() {
        let s = Settings::from_env(env(&[
            ("ATLAS_CONCURRENCY", "3"),
            ("ATLAS_TIMEOUT_SECS", "2"),
            ("ATLAS_OUTPUT", "/tmp/cards.json"),
            ("ATLAS_CACHE_CAPACITY", "100"),
        ]))
        .unwrap();
        assert_eq!(s.concurrency, 3);
        assert_eq!(s.timeout_secs, 2);
        assert_eq!(s.output, "/tmp/cards.json");
        assert_eq!(s.cache_capacity, Some(100));
    }

    #[test]
    fn zero_concurrency_rejected() {
        assert!(Settings::from_env(env(&[("ATLAS_CONCURRENCY", "0")])).is_err());
    }
}
