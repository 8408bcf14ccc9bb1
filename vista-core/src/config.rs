//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default row store table name.
pub const DEFAULT_TABLE_NAME: &str = "__ViewCache";
/// Default row store schema (SQLite's main database).
pub const DEFAULT_SCHEMA_NAME: &str = "main";
/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Flat-file document store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Location of the views document.
    pub path: PathBuf,
}

impl FileStoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn validate(&self) -> VistaResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(VistaError::Config(ConfigError::InvalidValue {
                field: "file_path".to_string(),
                value: String::new(),
                reason: "file_path must not be empty".to_string(),
            }));
        }
        Ok(())
    }
}

/// Row store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowStoreConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_table_name")]
    pub table_name: String,
    #[serde(default = "default_schema_name")]
    pub schema_name: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_schema_name() -> String {
    DEFAULT_SCHEMA_NAME.to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl RowStoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            table_name: default_table_name(),
            schema_name: default_schema_name(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Validate the database path and the table/schema identifiers, which
    /// are quoted into SQL.
    pub fn validate(&self) -> VistaResult<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(VistaError::Config(ConfigError::InvalidValue {
                field: "database_path".to_string(),
                value: String::new(),
                reason: "database_path must not be empty".to_string(),
            }));
        }
        validate_identifier("table_name", &self.table_name)?;
        validate_identifier("schema_name", &self.schema_name)
    }
}

/// Which backing store holds the views document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    File(FileStoreConfig),
    Sqlite(RowStoreConfig),
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        StoreConfig::File(FileStoreConfig::new(path))
    }

    pub fn sqlite(database_path: impl Into<PathBuf>) -> Self {
        StoreConfig::Sqlite(RowStoreConfig::new(database_path))
    }

    /// Validate that paths and identifiers are usable.
    pub fn validate(&self) -> VistaResult<()> {
        match self {
            StoreConfig::File(file) => file.validate(),
            StoreConfig::Sqlite(row) => row.validate(),
        }
    }

    /// Parse and validate a TOML document such as
    ///
    /// ```toml
    /// kind = "sqlite"
    /// database_path = "views.db"
    /// table_name = "__ViewCache"
    /// ```
    pub fn from_toml_str(source: &str) -> VistaResult<Self> {
        let config: StoreConfig = toml::from_str(source).map_err(|e| {
            VistaError::Config(ConfigError::InvalidValue {
                field: "store".to_string(),
                value: e
                    .span()
                    .and_then(|span| source.get(span))
                    .unwrap_or_default()
                    .to_string(),
                reason: e.to_string(),
            })
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `VISTA_*` environment variables.
    pub fn from_env() -> VistaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset optional values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> VistaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("VISTA_STORE").ok_or_else(|| {
            VistaError::Config(ConfigError::MissingRequired {
                field: "VISTA_STORE".to_string(),
            })
        })?;

        let config = match kind.trim().to_ascii_lowercase().as_str() {
            "file" => {
                let path = lookup("VISTA_FILE_PATH").ok_or_else(|| {
                    VistaError::Config(ConfigError::MissingRequired {
                        field: "VISTA_FILE_PATH".to_string(),
                    })
                })?;
                StoreConfig::file(path)
            }
            "sqlite" => {
                let database_path = lookup("VISTA_DB_PATH").ok_or_else(|| {
                    VistaError::Config(ConfigError::MissingRequired {
                        field: "VISTA_DB_PATH".to_string(),
                    })
                })?;
                let mut row = RowStoreConfig::new(database_path);
                if let Some(table_name) = lookup("VISTA_TABLE_NAME") {
                    row.table_name = table_name;
                }
                if let Some(schema_name) = lookup("VISTA_SCHEMA_NAME") {
                    row.schema_name = schema_name;
                }
                if let Some(timeout) = lookup("VISTA_BUSY_TIMEOUT_MS") {
                    row.busy_timeout_ms = timeout.trim().parse().map_err(|_| {
                        VistaError::Config(ConfigError::InvalidValue {
                            field: "VISTA_BUSY_TIMEOUT_MS".to_string(),
                            value: timeout.clone(),
                            reason: "busy timeout must be a whole number of milliseconds"
                                .to_string(),
                        })
                    })?;
                }
                StoreConfig::Sqlite(row)
            }
            other => {
                return Err(VistaError::Config(ConfigError::InvalidValue {
                    field: "VISTA_STORE".to_string(),
                    value: other.to_string(),
                    reason: "expected 'file' or 'sqlite'".to_string(),
                }))
            }
        };

        config.validate()?;
        Ok(config)
    }
}

fn validate_identifier(field: &str, value: &str) -> VistaResult<()> {
    if value.trim().is_empty() {
        return Err(VistaError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("{} must not be empty", field),
        }));
    }
    if value.contains('"') {
        return Err(VistaError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("{} must not contain '\"'", field),
        }));
    }
    Ok(())
}
