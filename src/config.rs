//! Cache configuration.
//!
//! Resolution order for [`CacheConfig::from_env`]: explicit environment
//! variables, then defaults. YAML files may set any subset of fields.
//!
//! ```yaml
//! cache_dir: /var/lib/textkit/cache
//! enabled: true
//! key_salt: bart-large-cnn
//! files:
//!   summarize: summaries.json
//! ```

use crate::types::Operation;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ENV_CACHE_DIR: &str = "TEXTKIT_CACHE_DIR";
pub const ENV_CACHE_ENABLED: &str = "TEXTKIT_CACHE_ENABLED";
pub const ENV_CACHE_SALT: &str = "TEXTKIT_CACHE_SALT";

pub const DEFAULT_CACHE_DIR: &str = "cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    pub enabled: bool,
    /// Mixed into every key; change it when the underlying model changes.
    pub key_salt: Option<String>,
    /// Per-operation file name overrides, relative to `cache_dir`.
    pub files: BTreeMap<Operation, String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            enabled: true,
            key_salt: None,
            files: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_key_salt(mut self, salt: impl Into<String>) -> Self {
        self.key_salt = Some(salt.into());
        self
    }

    pub fn with_file(mut self, operation: Operation, file_name: impl Into<String>) -> Self {
        self.files.insert(operation, file_name.into());
        self
    }

    /// Full path of the cache file for `operation`.
    pub fn path_for(&self, operation: Operation) -> PathBuf {
        let name = self
            .files
            .get(&operation)
            .map(String::as_str)
            .unwrap_or_else(|| operation.default_file_name());
        self.cache_dir.join(name)
    }

    /// Defaults overridden by `TEXTKIT_CACHE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                cfg.cache_dir = PathBuf::from(dir);
            }
        }
        if let Ok(raw) = std::env::var(ENV_CACHE_ENABLED) {
            cfg.enabled = parse_bool(&raw).ok_or_else(|| {
                Error::configuration_with_context(
                    format!("{ENV_CACHE_ENABLED} must be a boolean"),
                    ErrorContext::new()
                        .with_field_path(ENV_CACHE_ENABLED)
                        .with_details(format!("got {raw:?}"))
                        .with_source("config_loader"),
                )
            })?;
        }
        if let Ok(salt) = std::env::var(ENV_CACHE_SALT) {
            if !salt.is_empty() {
                cfg.key_salt = Some(salt);
            }
        }
        Ok(cfg)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file: {e}"),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::configuration_with_context(
                "cache_dir must not be empty",
                ErrorContext::new()
                    .with_field_path("config.cache_dir")
                    .with_source("config_loader"),
            ));
        }
        for (op, name) in &self.files {
            let p = Path::new(name);
            if name.trim().is_empty() || p.is_absolute() || p.components().count() != 1 {
                return Err(Error::configuration_with_context(
                    "cache file override must be a plain file name",
                    ErrorContext::new()
                        .with_field_path(format!("config.files.{op}"))
                        .with_details(format!("got {name:?}"))
                        .with_source("config_loader"),
                ));
            }
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_layout() {
        let cfg = CacheConfig::default();
        assert!(cfg.enabled);
        assert_eq!(
            cfg.path_for(Operation::Summarize),
            PathBuf::from("cache").join("summary_cache.json")
        );
        assert_eq!(
            cfg.path_for(Operation::Complete),
            PathBuf::from("cache").join("completion_cache.json")
        );
    }

    #[test]
    fn yaml_overrides_subset() {
        let cfg = CacheConfig::from_yaml_str(
            "cache_dir: /tmp/tk\nkey_salt: bart\nfiles:\n  summarize: s.json\n",
        )
        .unwrap();
        assert_eq!(cfg.path_for(Operation::Summarize), PathBuf::from("/tmp/tk/s.json"));
        assert_eq!(
            cfg.path_for(Operation::Grammar),
            PathBuf::from("/tmp/tk/grammar_cache.json")
        );
        assert_eq!(cfg.key_salt.as_deref(), Some("bart"));
        assert!(cfg.enabled);
    }

    #[test]
    fn yaml_rejects_unknown_fields_and_paths() {
        assert!(CacheConfig::from_yaml_str("max_entries: 5\n").is_err());
        let err = CacheConfig::from_yaml_str("files:\n  grammar: ../escape.json\n").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }
}
