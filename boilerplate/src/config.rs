//! Persistent per-user configuration.
//!
//! The configuration is a flat text file of `key=value` lines, read at most
//! once per process and merged into every render namespace. Writing the file
//! (and prompting for missing values) belongs to the caller; this module only
//! reads it.

use std::{
    collections::BTreeMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "BOILERPLATE_CONFIG";

/// Fields a complete configuration is expected to carry
pub const FIELDS: [&str; 2] = ["author", "venv_cmd"];

/// Key/value settings read from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConfig {
    values: BTreeMap<String, String>,
}

impl UserConfig {
    /// Parses configuration text. `path` is only used in error messages.
    ///
    /// Each non-blank line is split at its first `=` and both sides are
    /// trimmed. A later line for the same key replaces an earlier one.
    pub fn parse(src: &str, path: &Path) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (number, line) in src.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let invalid = |message: &str| Error::Config {
                path: path.to_path_buf(),
                line: number + 1,
                message: message.to_string(),
            };
            let (key, value) = line.split_once('=').ok_or_else(|| invalid("expected key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid("empty key"));
            }
            values.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self { values })
    }

    /// Reads and parses the file at `path`.
    ///
    /// A missing file is an empty configuration, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(src) => {
                let config = Self::parse(&src, path)?;
                debug!(path = %path.display(), keys = config.len(), "loaded user configuration");
                Ok(config)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no user configuration found");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Known fields this configuration lacks, in [`FIELDS`] order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        FIELDS
            .into_iter()
            .filter(|field| !self.values.contains_key(*field))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Location of the configuration file: `$BOILERPLATE_CONFIG`, else
/// `~/.config/boilerplate.conf`.
pub fn default_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".config").join("boilerplate.conf"))
}

/// A configuration slot that is filled at most once until reset.
#[derive(Debug, Default)]
pub struct ConfigCache {
    slot: RwLock<Option<Arc<UserConfig>>>,
}

impl ConfigCache {
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached configuration, running `load` only if the slot is empty.
    pub fn get_or_load(&self, load: impl FnOnce() -> Result<UserConfig>) -> Result<Arc<UserConfig>> {
        if let Some(config) = self.slot.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(config));
        }
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = slot.as_ref() {
            return Ok(Arc::clone(config));
        }
        let config = Arc::new(load()?);
        *slot = Some(Arc::clone(&config));
        Ok(config)
    }

    /// Replaces whatever is cached with `config`.
    pub fn install(&self, config: UserConfig) -> Arc<UserConfig> {
        let config = Arc::new(config);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&config));
        config
    }

    /// Empties the slot so the next read loads again.
    pub fn reset(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

static CACHE: ConfigCache = ConfigCache::new();

fn load_default() -> Result<UserConfig> {
    match default_path() {
        Some(path) => UserConfig::load(&path),
        None => {
            warn!("no home directory; using an empty user configuration");
            Ok(UserConfig::default())
        }
    }
}

/// The process-wide configuration, loaded from [`default_path`] on first use.
pub fn cached() -> Result<Arc<UserConfig>> {
    CACHE.get_or_load(load_default)
}

/// Sets the process-wide configuration without reading any file.
pub fn install(config: UserConfig) -> Arc<UserConfig> {
    CACHE.install(config)
}

/// Forgets the process-wide configuration.
pub fn reset() {
    CACHE.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn parse(src: &str) -> Result<UserConfig> {
        UserConfig::parse(src, Path::new("boilerplate.conf"))
    }

    #[test]
    fn parses_trimmed_pairs() {
        let config = parse("author = Jane Doe \n\n  venv_cmd=python3 -m venv venv\n").unwrap();
        assert_eq!(config.get("author"), Some("Jane Doe"));
        assert_eq!(config.get("venv_cmd"), Some("python3 -m venv venv"));
        assert_eq!(config.len(), 2);
    }

    #[test]
    fn splits_at_first_equals() {
        let config = parse("venv_cmd=env A=1 make\n").unwrap();
        assert_eq!(config.get("venv_cmd"), Some("env A=1 make"));
    }

    #[test]
    fn rejects_lines_without_equals() {
        match parse("author=Jane\nnonsense\n").unwrap_err() {
            Error::Config { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_keys() {
        assert!(matches!(parse(" = x").unwrap_err(), Error::Config { .. }));
    }

    #[test]
    fn reports_missing_fields() {
        let config = parse("author=Jane").unwrap();
        assert_eq!(config.missing_fields(), vec!["venv_cmd"]);
        assert!(UserConfig::from_iter([("author", "a"), ("venv_cmd", "b")]).missing_fields().is_empty());
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boilerplate.conf");
        fs::write(&path, "author=Jane\n").unwrap();
        assert_eq!(UserConfig::load(&path).unwrap().get("author"), Some("Jane"));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = UserConfig::load(&dir.path().join("absent.conf")).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn cache_loads_once() {
        let cache = ConfigCache::new();
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(UserConfig::from_iter([("author", "Jane")]))
        };
        let first = cache.get_or_load(load).unwrap();
        let second = cache.get_or_load(load).unwrap();
        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_reset_loads_again() {
        let cache = ConfigCache::new();
        cache.install(UserConfig::from_iter([("author", "old")]));
        cache.reset();
        let config = cache
            .get_or_load(|| Ok(UserConfig::from_iter([("author", "new")])))
            .unwrap();
        assert_eq!(config.get("author"), Some("new"));
    }

    #[test]
    fn failed_load_leaves_cache_empty() {
        let cache = ConfigCache::new();
        let failed = cache.get_or_load(|| parse("broken"));
        assert!(failed.is_err());
        let config = cache.get_or_load(|| Ok(UserConfig::default())).unwrap();
        assert!(config.is_empty());
    }
}
