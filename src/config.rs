use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{FragmentCache, LruFragmentCache, MemoryFragmentCache, NoopFragmentCache};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Renderer output and logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Pretty-print documents written by the CLI
    #[serde(default)]
    pub pretty: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pretty: false,
        }
    }
}

/// Which fragment store backs rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Fresh unbounded table per document
    #[default]
    Memory,
    /// Bounded LRU shared by every document of the process
    Lru,
    /// No caching
    None,
}

/// Fragment cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in JSONAPI_RENDER_CONFIG environment variable
    /// 2. ./render.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = Self::config_path();
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        Self::from_toml_str(&config_str)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))
    }

    /// Like [`Config::load`], but a missing config file yields the defaults.
    pub fn load_or_default() -> Result<Self> {
        let _ = dotenv::dotenv();
        if Self::config_path().exists() {
            Self::load()
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Config = toml::from_str(input).context("Failed to parse render config")?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> PathBuf {
        std::env::var("JSONAPI_RENDER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("render.toml"))
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        let level = self.renderer.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "renderer.log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.renderer.log_level
            );
        }

        if self.cache.backend == CacheBackend::Lru && self.cache.capacity == 0 {
            anyhow::bail!("cache.capacity must be greater than 0 for the lru backend");
        }

        Ok(())
    }

    /// Fragment cache for the configured backend.
    ///
    /// `None` for the memory backend: documents then create their own table.
    pub fn build_cache(&self) -> Option<Arc<dyn FragmentCache>> {
        match self.cache.backend {
            CacheBackend::Memory => None,
            CacheBackend::Lru => Some(Arc::new(LruFragmentCache::new(self.cache.capacity))),
            CacheBackend::None => Some(Arc::new(NoopFragmentCache)),
        }
    }

    /// Fragment cache shared across documents, always backed by a store.
    pub fn build_shared_cache(&self) -> Arc<dyn FragmentCache> {
        self.build_cache()
            .unwrap_or_else(|| Arc::new(MemoryFragmentCache::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var("JSONAPI_RENDER_CONFIG").ok();
        std::env::set_var("JSONAPI_RENDER_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("JSONAPI_RENDER_CONFIG");
        if let Some(val) = original {
            std::env::set_var("JSONAPI_RENDER_CONFIG", val);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.renderer.log_level, "info");
        assert!(!config.renderer.pretty);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.capacity, 1000);
        assert!(config.build_cache().is_none());
    }

    #[test]
    fn test_config_lru_backend() {
        let config = Config::from_toml_str(
            r#"
[renderer]
log_level = "debug"
pretty = true

[cache]
backend = "lru"
capacity = 64
"#,
        )
        .unwrap();
        assert!(config.renderer.pretty);
        assert_eq!(config.cache.backend, CacheBackend::Lru);
        assert!(config.build_cache().is_some());
    }

    #[test]
    fn test_shared_cache_always_present() {
        let config = Config::default();
        let cache = config.build_shared_cache();
        let out = cache
            .fetch_many(&["k".to_string()], &mut |_: &str| -> crate::Result<String> {
                Ok("v".to_string())
            })
            .unwrap();
        assert_eq!(out["k"], "v");
    }

    #[test]
    fn test_config_rejects_zero_lru_capacity() {
        let err = Config::from_toml_str("[cache]\nbackend = \"lru\"\ncapacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("cache.capacity"));
    }

    #[test]
    fn test_config_rejects_unknown_log_level() {
        let err = Config::from_toml_str("[renderer]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn test_config_rejects_unknown_backend() {
        assert!(Config::from_toml_str("[cache]\nbackend = \"redis\"\n").is_err());
    }

    #[test]
    fn test_config_load_from_env_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("render.toml");
        fs::write(&config_path, "[cache]\nbackend = \"none\"\n").unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            assert_eq!(config.unwrap().cache.backend, CacheBackend::None);
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nonexistent.toml");
        with_config_env(&missing, || {
            assert!(Config::load().is_err());
            let config = Config::load_or_default().unwrap();
            assert_eq!(config.cache.backend, CacheBackend::Memory);
        });
    }
}
