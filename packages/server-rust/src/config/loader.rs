//! Layered configuration loading.
//!
//! Sources, lowest precedence first:
//!
//! 1. `server.yaml` from the default directories (required)
//! 2. `config.yaml` from the overlay directories (optional, deep-merged)
//! 3. environment variables named by `env.mappings`
//! 4. secret files named by `secrets.mappings`, read from `secrets.dir`
//!
//! Mapping keys are dotted paths into the configuration tree, for example
//! `database.sql.primary.url`. An environment mapping value lists one or
//! more variable names separated by commas; the first one that is set and
//! non-empty wins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use super::{BuildInfo, Config};

/// Name of the required base configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "server.yaml";
/// Name of the optional deployment overlay file.
pub const OVERLAY_CONFIG_FILE: &str = "config.yaml";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Errors raised while assembling the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file {name} not found in {dirs:?}")]
    NotFound { name: String, dirs: Vec<PathBuf> },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid mapping target {0:?}")]
    InvalidMapping(String),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

/// Builds a [`Config`] from files, environment and secrets.
#[derive(Clone)]
pub struct ConfigLoader {
    default_dirs: Vec<PathBuf>,
    overlay_dirs: Vec<PathBuf>,
    env: EnvLookup,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("default_dirs", &self.default_dirs)
            .field("overlay_dirs", &self.overlay_dirs)
            .finish_non_exhaustive()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(
            vec![PathBuf::from("config"), PathBuf::from(".")],
            vec![PathBuf::from("."), PathBuf::from("..")],
        )
    }
}

impl ConfigLoader {
    /// Creates a loader reading the process environment.
    #[must_use]
    pub fn new(default_dirs: Vec<PathBuf>, overlay_dirs: Vec<PathBuf>) -> Self {
        Self {
            default_dirs,
            overlay_dirs,
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replaces the environment lookup (used by tests).
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    ///
    /// Fails when `server.yaml` is missing, any file cannot be parsed, a
    /// mapping targets a non-mapping node, or the merged tree does not
    /// deserialize into [`Config`].
    pub fn load(&self, build: BuildInfo) -> Result<Config, ConfigError> {
        let mut tree = read_required(DEFAULT_CONFIG_FILE, &self.default_dirs)?;

        match read_optional(OVERLAY_CONFIG_FILE, &self.overlay_dirs)? {
            Some(overlay) => merge(&mut tree, overlay),
            None => debug!(
                file = OVERLAY_CONFIG_FILE,
                dirs = ?self.overlay_dirs,
                "no overlay configuration found"
            ),
        }

        self.apply_env_mappings(&mut tree)?;
        apply_secret_mappings(&mut tree)?;

        let mut config: Config = serde_yaml::from_value(tree)?;
        config.build = build;
        Ok(config)
    }

    fn apply_env_mappings(&self, tree: &mut Value) -> Result<(), ConfigError> {
        for (path, names) in string_mappings(tree, "env") {
            let found = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .find_map(|name| (self.env)(name).filter(|v| !v.is_empty()).map(|v| (name, v)));

            if let Some((name, raw)) = found {
                debug!(field = %path, env = name, "applying environment override");
                set_path(tree, &path, parse_scalar(&raw))?;
            }
        }
        Ok(())
    }
}

fn apply_secret_mappings(tree: &mut Value) -> Result<(), ConfigError> {
    let Some(dir) = tree
        .get("secrets")
        .and_then(|s| s.get("dir"))
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
    else {
        return Ok(());
    };

    if !dir.is_dir() {
        debug!(dir = %dir.display(), "secrets directory not present");
        return Ok(());
    }

    for (path, file) in string_mappings(tree, "secrets") {
        let secret_path = dir.join(&file);
        match std::fs::read_to_string(&secret_path) {
            Ok(secret) => {
                let secret = secret.trim_end_matches(['\n', '\r']);
                if !secret.is_empty() {
                    debug!(field = %path, "applying secret override");
                    set_path(tree, &path, Value::String(secret.to_string()))?;
                }
            }
            Err(err) => warn!(
                file = %secret_path.display(),
                error = %err,
                "failed to read secret file"
            ),
        }
    }
    Ok(())
}

/// Collects `<section>.mappings` as `(dotted path, value)` string pairs.
fn string_mappings(tree: &Value, section: &str) -> Vec<(String, String)> {
    tree.get(section)
        .and_then(|s| s.get("mappings"))
        .and_then(Value::as_mapping)
        .map(|mappings| {
            mappings
                .iter()
                .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn find_file(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(name)).find(|p| p.is_file())
}

fn read_required(name: &str, dirs: &[PathBuf]) -> Result<Value, ConfigError> {
    info!(file = name, dirs = ?dirs, "reading the configuration file");
    let path = find_file(name, dirs).ok_or_else(|| ConfigError::NotFound {
        name: name.to_string(),
        dirs: dirs.to_vec(),
    })?;
    read_yaml(&path)
}

fn read_optional(name: &str, dirs: &[PathBuf]) -> Result<Option<Value>, ConfigError> {
    find_file(name, dirs).map(|path| read_yaml(&path)).transpose()
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), "read the configuration file");
    Ok(value)
}

/// Deep-merges `overlay` into `base`; overlay scalars and sequences win.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Sets `value` at a dotted path, creating intermediate mappings.
fn set_path(tree: &mut Value, path: &str, value: Value) -> Result<(), ConfigError> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ConfigError::InvalidMapping(path.to_string()));
    }

    let mut node = tree;
    for segment in path.split('.') {
        if node.is_null() {
            *node = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(map) = node else {
            return Err(ConfigError::InvalidMapping(path.to_string()));
        };
        node = map
            .entry(Value::String(segment.to_string()))
            .or_insert(Value::Null);
    }
    *node = value;
    Ok(())
}

/// Interprets an environment value as a YAML scalar (`8080` becomes a number).
fn parse_scalar(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn loader(default_dir: &Path, overlay_dir: &Path) -> ConfigLoader {
        ConfigLoader::new(
            vec![default_dir.to_path_buf()],
            vec![overlay_dir.to_path_buf()],
        )
        .with_env(|_| None)
    }

    #[test]
    fn missing_server_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = loader(dir.path(), dir.path())
            .load(BuildInfo::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn base_file_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "server.yaml", "service:\n  port: 8081\n");

        let build = BuildInfo {
            version: "1.2.3".to_string(),
            build: "abc".to_string(),
            build_date: "2026-01-01".to_string(),
        };
        let config = loader(dir.path(), dir.path()).load(build.clone()).unwrap();
        assert_eq!(config.service.port, 8081);
        assert_eq!(config.build, build);
    }

    #[test]
    fn overlay_deep_merges() {
        let defaults = tempfile::tempdir().unwrap();
        let overlay = tempfile::tempdir().unwrap();
        write(
            defaults.path(),
            "server.yaml",
            "service:\n  port: 8080\n  host: 127.0.0.1\n",
        );
        write(overlay.path(), "config.yaml", "service:\n  port: 9000\n");

        let config = loader(defaults.path(), overlay.path())
            .load(BuildInfo::default())
            .unwrap();
        assert_eq!(config.service.port, 9000);
        assert_eq!(config.service.host, "127.0.0.1");
    }

    #[test]
    fn env_mapping_first_set_variable_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "server.yaml",
            "service:\n  port: 8080\nenv:\n  mappings:\n    service.port: \"UNSET_PORT, EVAL_PORT, OTHER_PORT\"\n",
        );
        let vars: HashMap<&str, &str> = [("EVAL_PORT", "9191"), ("OTHER_PORT", "1")].into();

        let config = loader(dir.path(), dir.path())
            .with_env(move |name| vars.get(name).map(|v| (*v).to_string()))
            .load(BuildInfo::default())
            .unwrap();
        assert_eq!(config.service.port, 9191);
    }

    #[test]
    fn env_mapping_creates_missing_nodes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "server.yaml",
            "service: {}\nenv:\n  mappings:\n    service.ready_file: READY_FILE\n",
        );

        let config = loader(dir.path(), dir.path())
            .with_env(|name| (name == "READY_FILE").then(|| "/tmp/ready".to_string()))
            .load(BuildInfo::default())
            .unwrap();
        assert_eq!(config.service.ready_file, Some(PathBuf::from("/tmp/ready")));
    }

    #[test]
    fn secrets_override_env_and_trim_newline() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = tempfile::tempdir().unwrap();
        write(secrets.path(), "db-url", "postgres://secret\n");
        write(
            dir.path(),
            "server.yaml",
            &format!(
                "service: {{}}\ndatabase:\n  sql:\n    primary:\n      driver: pgx\n      url: postgres://file\nenv:\n  mappings:\n    database.sql.primary.url: DB_URL\nsecrets:\n  dir: {}\n  mappings:\n    database.sql.primary.url: db-url\n",
                secrets.path().display()
            ),
        );

        let config = loader(dir.path(), dir.path())
            .with_env(|name| (name == "DB_URL").then(|| "postgres://env".to_string()))
            .load(BuildInfo::default())
            .unwrap();
        let db = &config.database.unwrap().sql["primary"];
        assert_eq!(db.url, "postgres://secret");
    }

    #[test]
    fn missing_secrets_dir_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "server.yaml",
            "service:\n  host: h\nsecrets:\n  dir: /definitely/not/here\n  mappings:\n    service.host: host\n",
        );
        let config = loader(dir.path(), dir.path())
            .load(BuildInfo::default())
            .unwrap();
        assert_eq!(config.service.host, "h");
    }

    #[test]
    fn mapping_through_scalar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "server.yaml",
            "service:\n  host: h\nenv:\n  mappings:\n    service.host.inner: X\n",
        );
        let err = loader(dir.path(), dir.path())
            .with_env(|_| Some("v".to_string()))
            .load(BuildInfo::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMapping(_)));
    }

    #[test]
    fn parse_scalar_keeps_structures_as_strings() {
        assert_eq!(parse_scalar("8080"), Value::Number(8080.into()));
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("a: b"), Value::String("a: b".to_string()));
        assert_eq!(parse_scalar("~"), Value::String("~".to_string()));
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "server.yaml", "service: [unclosed\n");
        let err = loader(dir.path(), dir.path())
            .load(BuildInfo::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
