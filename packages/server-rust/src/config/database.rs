use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named database definitions, grouped by backend family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sql: BTreeMap<String, SqlDatabaseConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub json: BTreeMap<String, JsonDatabaseConfig>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, OtherDatabaseConfig>,
}

impl DatabaseConfig {
    /// First enabled SQL database, in name order.
    #[must_use]
    pub fn enabled_sql(&self) -> Option<(&str, &SqlDatabaseConfig)> {
        self.sql
            .iter()
            .find(|(_, db)| db.enabled)
            .map(|(name, db)| (name.as_str(), db))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlDatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
    pub driver: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_max_lifetime_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_idle_conns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_open_conns: Option<u32>,
    /// Fall back to in-memory storage when this database cannot be reached.
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
    pub driver: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherDatabaseConfig {
    #[serde(default)]
    pub enabled: bool,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_sql_skips_disabled_entries() {
        let config: DatabaseConfig = serde_yaml::from_str(
            r"
sql:
  a_primary:
    driver: pgx
    url: postgres://a
  b_secondary:
    enabled: true
    driver: pgx
    url: postgres://b
    max_open_conns: 4
",
        )
        .unwrap();

        let (name, db) = config.enabled_sql().unwrap();
        assert_eq!(name, "b_secondary");
        assert_eq!(db.url, "postgres://b");
        assert_eq!(db.max_open_conns, Some(4));
        assert!(!db.fallback);
    }

    #[test]
    fn no_enabled_sql() {
        assert!(DatabaseConfig::default().enabled_sql().is_none());
    }
}
