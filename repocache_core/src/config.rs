//! Engine configuration
//!
//! Configuration is layered with figment: built-in defaults, then an
//! optional TOML file, then `REPOCACHE_`-prefixed environment variables.

use crate::error::{Result, ValidationError};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "REPOCACHE_CONFIG";

/// Prefix of environment overrides, e.g. `REPOCACHE_WORKER_THREADS=4`
pub const ENV_PREFIX: &str = "REPOCACHE_";

/// Default number of background worker threads
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Name of the cache subdirectory inside the platform cache directory
const CACHE_SUBDIR: &str = "repocache";

/// Configuration of a [`CacheEngine`](crate::CacheEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory used by handles created without an explicit directory
    pub cache_dir: PathBuf,
    /// Number of background worker threads
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

/// Platform cache directory for the engine
///
/// `~/.cache/repocache` on Linux, `~/Library/Caches/repocache` on macOS,
/// `%LOCALAPPDATA%\repocache` on Windows. Falls back to `.repocache` in the
/// working directory when no cache directory can be determined.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join(CACHE_SUBDIR))
        .unwrap_or_else(|| PathBuf::from(".repocache"))
}

impl EngineConfig {
    /// Load configuration: defaults < `$REPOCACHE_CONFIG` file < environment
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::figment(path.as_deref()).extract_config()
    }

    /// Load configuration with an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::figment(Some(path)).extract_config()
    }

    /// The layered figment backing [`load`](Self::load)
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            } else {
                log::warn!("Config file {} does not exist, ignoring", path.display());
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["CONFIG"]).split("__"))
    }

    /// Check the values for consistency
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(
                ValidationError::invalid_configuration("worker_threads must be at least 1").into(),
            );
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(
                ValidationError::invalid_configuration("cache_dir must not be empty").into(),
            );
        }
        Ok(())
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }
}

trait ExtractConfig {
    fn extract_config(self) -> Result<EngineConfig>;
}

impl ExtractConfig for Figment {
    fn extract_config(self) -> Result<EngineConfig> {
        let config: EngineConfig = self.extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_threads, DEFAULT_WORKER_THREADS);
        assert!(
            config.cache_dir.ends_with(CACHE_SUBDIR) || config.cache_dir.ends_with(".repocache")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = EngineConfig::default().with_worker_threads(0);
        assert!(matches!(
            config.validate(),
            Err(Error::Validation(ValidationError::InvalidConfiguration { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_cache_dir() {
        let config = EngineConfig::default().with_cache_dir("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "repocache.toml",
                r#"
                cache_dir = "/var/cache/app"
                worker_threads = 4
                "#,
            )?;

            let config = EngineConfig::load_from(Path::new("repocache.toml")).unwrap();
            assert_eq!(config.cache_dir, PathBuf::from("/var/cache/app"));
            assert_eq!(config.worker_threads, 4);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("repocache.toml", "worker_threads = 4")?;
            jail.set_env("REPOCACHE_CONFIG", "repocache.toml");
            jail.set_env("REPOCACHE_WORKER_THREADS", "8");

            let config = EngineConfig::load().unwrap();
            assert_eq!(config.worker_threads, 8);
            Ok(())
        });
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("repocache.toml", "cache_dir = \"/tmp/rc\"")?;

            let config = EngineConfig::load_from(Path::new("repocache.toml")).unwrap();
            assert_eq!(config.cache_dir, PathBuf::from("/tmp/rc"));
            assert_eq!(config.worker_threads, DEFAULT_WORKER_THREADS);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_validation_error() {
        Jail::expect_with(|jail| {
            jail.create_file("repocache.toml", "worker_threads = 0")?;

            let err = EngineConfig::load_from(Path::new("repocache.toml")).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = EngineConfig::load_from(Path::new("absent.toml")).unwrap();
            assert_eq!(config.worker_threads, DEFAULT_WORKER_THREADS);
            Ok(())
        });
    }
}
