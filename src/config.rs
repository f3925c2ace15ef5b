use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::database::{ensure_data_dir, IN_MEMORY};

/// Database settings for the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    /// Directory holding the config file and, by default, the SQLite database
    pub data_dir: String,

    /// Driver family: mysql, postgres, mssql or sqlite
    pub driver_name: String,

    /// Connection string. For mysql the database name is appended to it.
    pub data_source_name: String,

    /// Database name, used for provisioning and for mysql connection strings
    pub db_name: String,

    /// Prefix prepended to every table name
    pub table_name_prefix: String,

    /// Log every SQL statement
    pub show_sql: bool,
}

const EMPTY_CONFIG: &str = r#"### iam-store configuration file

### directory for data used by iam-store
# data_dir = "~/.iam-store"

### database driver: mysql, postgres, mssql or sqlite
# driver_name = "sqlite"

### connection string; for mysql the database name is appended,
### e.g. "root:123456@tcp(localhost:3306)/"
# data_source_name = "~/.iam-store/iam-store.sqlite3"

### database name
# db_name = "iam_store"

### prefix for every table name, e.g. "cd_"
# table_name_prefix = ""

### log every SQL statement
# show_sql = false
"#;

const DEFAULT_DRIVER: &str = "sqlite";
const DEFAULT_DB_NAME: &str = "iam_store";
const SQLITE_FILE_NAME: &str = "iam-store.sqlite3";

fn home_dir() -> Result<String> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .to_str()
        .ok_or_else(|| anyhow!("Could not convert home directory path to string"))
        .map(|s| s.to_owned())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let data_dir = format!("{}/.iam-store", home_dir);

        Self {
            data_source_name: format!("{}/{}", data_dir, SQLITE_FILE_NAME),
            data_dir,
            driver_name: DEFAULT_DRIVER.to_string(),
            db_name: DEFAULT_DB_NAME.to_string(),
            table_name_prefix: String::new(),
            show_sql: false,
        }
    }
}

impl StoreConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<StoreConfig> {
        let mut builder = Config::builder();

        let store_dir = format!("{}/.iam-store", home_dir()?);

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                ensure_data_dir(&store_dir)?;
                let p = format!("{}/iam-store.toml", store_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of IAM_STORE)
        // E.g., `IAM_STORE_DRIVER_NAME=mysql ./iam-store` would switch the driver
        builder = builder.add_source(config::Environment::with_prefix("IAM_STORE"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_map(&config, &store_dir)
    }

    /// Build a configuration from already-loaded key/value pairs
    fn from_map(config: &HashMap<String, String>, default_dir: &str) -> Result<StoreConfig> {
        let data_dir = config
            .get("data_dir")
            .cloned()
            .unwrap_or_else(|| default_dir.to_string());
        let data_dir = data_dir.trim_end_matches('/').to_string();

        let driver_name = config
            .get("driver_name")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DRIVER.to_string());

        // Only the SQLite default lives in the data directory
        let data_source_name = match config.get("data_source_name") {
            Some(dsn) => dsn.clone(),
            None => {
                ensure_data_dir(&data_dir)?;
                format!("{}/{}", data_dir, SQLITE_FILE_NAME)
            }
        };

        let db_name = config
            .get("db_name")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DB_NAME.to_string());

        let table_name_prefix = config.get("table_name_prefix").cloned().unwrap_or_default();

        let show_sql = match config.get("show_sql") {
            Some(v) => parse_bool(v).ok_or_else(|| anyhow!("Invalid show_sql value '{}'", v))?,
            None => false,
        };

        Ok(StoreConfig {
            data_dir,
            driver_name,
            data_source_name,
            db_name,
            table_name_prefix,
            show_sql,
        })
    }

    /// SQLite configuration backed by an in-memory database
    pub fn in_memory() -> StoreConfig {
        StoreConfig {
            data_source_name: IN_MEMORY.to_string(),
            ..StoreConfig::default()
        }
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("Driver:             {}", self.driver_name),
            format!("Data Source:        {}", self.masked_data_source()),
            format!("Database Name:      {}", self.db_name),
            format!(
                "Table Prefix:       {}",
                if self.table_name_prefix.is_empty() {
                    "(none)"
                } else {
                    self.table_name_prefix.as_str()
                }
            ),
            format!("Show SQL:           {}", self.show_sql),
        ]
        .join("\n")
    }

    /// Data source with its password masked
    pub fn masked_data_source(&self) -> String {
        mask_credentials(&self.data_source_name)
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.iam-store/iam-store.toml", home_dir)
    }
}

/// Mask the password in a connection string
///
/// Handles `password=`/`pwd=` pairs separated by spaces or semicolons
/// (PostgreSQL and MSSQL style, case-insensitive keys) and `user:password@`
/// userinfo, where the password may itself contain `@`.
fn mask_credentials(dsn: &str) -> String {
    let masked: String = dsn
        .split_inclusive([' ', ';'])
        .map(|token| {
            let body = token.trim_end_matches([' ', ';']);
            let delimiter = &token[body.len()..];
            match body.split_once('=') {
                Some((key, _)) if is_password_key(key) => format!("{}=****{}", key, delimiter),
                _ => token.to_string(),
            }
        })
        .collect();

    let Some(at) = masked.rfind('@') else {
        return masked;
    };
    let start = masked.find("://").map(|i| i + 3).unwrap_or(0);
    if start > at {
        return masked;
    }
    match masked[start..at].find(':') {
        Some(colon) => format!("{}:****{}", &masked[..start + colon], &masked[at..]),
        None => masked,
    }
}

fn is_password_key(key: &str) -> bool {
    matches!(key.trim().to_lowercase().as_str(), "password" | "pwd")
}
