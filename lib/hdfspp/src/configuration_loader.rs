//! Locate, parse and layer configuration resource files.
//!
//! Resource files are TOML documents. Nested tables are flattened
//! into dotted keys, so these two files describe the same entry:
//!
//! ```toml
//! fs.defaultFS = "hdfs://namenode:8020"
//! ```
//!
//! ```toml
//! [fs]
//! defaultFS = "hdfs://namenode:8020"
//! ```

use crate::configuration::{Configuration, fix_case};
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};

/// Resource files read by [`ConfigurationLoader::load_default_resources`],
/// in overlay order.
pub const DEFAULT_RESOURCES: &[&str] = &["core-site.toml", "hdfs-site.toml"];

const FALLBACK_CONF_DIR: &str = "/etc/hadoop/conf";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration file `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse configuration: {0}")]
    ParseString(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationLoader {
    search_path: Vec<PathBuf>,
}

impl ConfigurationLoader {
    /// A loader with an empty search path.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty snapshot.
    pub fn new_config(&self) -> Configuration {
        Configuration::new()
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Resets the search path to `HADOOP_CONF_DIR`, then
    /// `$HADOOP_HOME/etc/hadoop`, then `/etc/hadoop/conf`.
    pub fn set_default_search_path(&mut self) {
        self.search_path.clear();
        if let Some(dirs) = env::var_os("HADOOP_CONF_DIR") {
            self.add_to_search_path(&dirs);
        }
        if let Some(home) = env::var_os("HADOOP_HOME") {
            self.search_path
                .push(Path::new(&home).join("etc").join("hadoop"));
        }
        self.search_path.push(PathBuf::from(FALLBACK_CONF_DIR));
    }

    /// Replaces the search path with the entries of a platform path
    /// list (`:` separated on unix).
    pub fn set_search_path(&mut self, dirs: impl AsRef<OsStr>) {
        self.search_path.clear();
        self.add_to_search_path(dirs);
    }

    pub fn add_to_search_path(&mut self, dirs: impl AsRef<OsStr>) {
        self.search_path.extend(
            env::split_paths(dirs.as_ref()).filter(|dir| !dir.as_os_str().is_empty()),
        );
    }

    /// First search-path entry containing `file_name`.
    pub fn find_resource(&self, file_name: &str) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Loads and layers [`DEFAULT_RESOURCES`] from the search path.
    ///
    /// Returns `None` when no resource was found, or when one of them
    /// could not be read.
    pub fn load_default_resources(&self) -> Option<Configuration> {
        let mut config = self.new_config();
        let mut found_any = false;

        for resource in DEFAULT_RESOURCES {
            let Some(path) = self.find_resource(resource) else {
                tracing::trace!(resource, "configuration resource not on the search path");
                continue;
            };

            match self.overlay_resource_file(&config, &path) {
                Ok(next) => {
                    tracing::debug!(path = %path.display(), "loaded configuration resource");
                    config = next;
                    found_any = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring configuration resources");
                    return None;
                }
            }
        }

        found_any.then_some(config)
    }

    pub fn load_from_string(&self, contents: &str) -> Result<Configuration, ConfigError> {
        self.overlay_string(&self.new_config(), contents)
    }

    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Configuration, ConfigError> {
        self.overlay_resource_file(&self.new_config(), path)
    }

    /// Parses `contents` and layers it on top of `base`.
    pub fn overlay_string(
        &self,
        base: &Configuration,
        contents: &str,
    ) -> Result<Configuration, ConfigError> {
        let table: Table = contents.parse()?;
        Ok(base.overlaid_with(&flatten(table)))
    }

    pub fn overlay_resource_file(
        &self,
        base: &Configuration,
        path: impl AsRef<Path>,
    ) -> Result<Configuration, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Table = contents.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(base.overlaid_with(&flatten(table)))
    }

    /// A new snapshot equal to `base` with `key` set to `value`, or
    /// `None` if the key is empty.
    pub fn overlay_value(
        &self,
        base: &Configuration,
        key: &str,
        value: &str,
    ) -> Option<Configuration> {
        if key.trim().is_empty() {
            return None;
        }
        Some(base.with_value(key, value))
    }
}

fn flatten(table: Table) -> Configuration {
    let mut values = BTreeMap::new();
    flatten_into(&mut values, None, table);
    Configuration::from_map(values)
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: Option<&str>, table: Table) {
    for (key, value) in table {
        let key = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Table(inner) => flatten_into(out, Some(&key), inner),
            Value::Array(items) => {
                let joined = items.iter().map(scalar).collect::<Vec<_>>().join(",");
                out.insert(fix_case(&key), joined);
            }
            other => {
                out.insert(fix_case(&key), scalar(&other));
            }
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn flattens_nested_tables_and_arrays() {
        let loader = ConfigurationLoader::new();
        let config = loader
            .load_from_string(
                r#"
                fs.defaultFS = "hdfs://nn:8020"

                [dfs]
                replication = 3
                client.read.shortcircuit = true
                namenodes = ["nn1", "nn2"]
                "#,
            )
            .unwrap();

        assert_eq!(config.get("fs.defaultfs"), Some("hdfs://nn:8020"));
        assert_eq!(config.get_int("dfs.replication"), Some(3));
        assert_eq!(config.get_bool("dfs.client.read.shortcircuit"), Some(true));
        assert_eq!(config.get("dfs.namenodes"), Some("nn1,nn2"));
    }

    #[test]
    fn empty_directory_has_no_default_resources() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = ConfigurationLoader::new();
        loader.set_search_path(dir.path());
        assert_eq!(loader.search_path(), &[dir.path().to_path_buf()]);
        assert!(loader.load_default_resources().is_none());
    }

    #[test]
    fn hdfs_site_overlays_core_site() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "core-site.toml", "a = 1\nb = \"core\"\n");
        write(dir.path(), "hdfs-site.toml", "b = \"hdfs\"\n");

        let mut loader = ConfigurationLoader::new();
        loader.set_search_path(dir.path());
        let config = loader.load_default_resources().unwrap();

        assert_eq!(config.get_int("a"), Some(1));
        assert_eq!(config.get("b"), Some("hdfs"));
    }

    #[test]
    fn first_directory_on_the_search_path_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write(first.path(), "core-site.toml", "who = \"first\"\n");
        write(second.path(), "core-site.toml", "who = \"second\"\n");

        let mut loader = ConfigurationLoader::new();
        let dirs = env::join_paths([first.path(), second.path()]).unwrap();
        loader.set_search_path(&dirs);
        let config = loader.load_default_resources().unwrap();

        assert_eq!(config.get("who"), Some("first"));
    }

    #[test]
    fn malformed_resource_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "core-site.toml", "this is = = not toml");

        let mut loader = ConfigurationLoader::new();
        loader.set_search_path(dir.path());
        assert!(loader.load_default_resources().is_none());

        let err = loader
            .load_from_file(dir.path().join("core-site.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn overlay_value_rejects_empty_keys() {
        let loader = ConfigurationLoader::new();
        let base = loader.new_config();
        assert!(loader.overlay_value(&base, "", "1").is_none());
        assert!(loader.overlay_value(&base, "  ", "1").is_none());
    }

    #[test]
    fn overlaying_the_same_value_twice_is_idempotent() {
        let loader = ConfigurationLoader::new();
        let base = loader.load_from_string("x = \"y\"").unwrap();
        let once = loader.overlay_value(&base, "a", "1").unwrap();
        let twice = loader.overlay_value(&once, "a", "1").unwrap();
        assert_eq!(once, twice);
        assert_eq!(base.get("a"), None);
    }

    #[test]
    fn default_search_path_ends_with_the_system_directory() {
        let mut loader = ConfigurationLoader::new();
        loader.set_default_search_path();
        assert_eq!(
            loader.search_path().last(),
            Some(&PathBuf::from(FALLBACK_CONF_DIR))
        );
    }
}
