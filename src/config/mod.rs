use crate::error::LedgerError;
use std::env;

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub environment: String,
    pub log_level: String,
    pub mongodb: MongoConfig,
    pub storage: StorageConfig,
    pub paging: PagingConfig,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    /// Ephemeral in-process store; data does not survive a restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct PagingConfig {
    /// Entries requested per feed page.
    pub page_size: usize,
    /// Upper bound on the unfiltered fetch behind totals computation.
    pub aggregate_cap: usize,
}

impl LedgerConfig {
    pub fn load() -> Result<Self, LedgerError> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let is_prod = environment == "prod";

        Ok(LedgerConfig {
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("ledger_db"), is_prod)?,
            },
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("local"), is_prod)?
                    .parse()
                    .map_err(|e: String| LedgerError::Validation(anyhow::anyhow!(e)))?,
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
            },
            paging: PagingConfig {
                page_size: parse_env("LEDGER_PAGE_SIZE", Some("20"), is_prod)?,
                aggregate_cap: parse_env("LEDGER_AGGREGATE_CAP", Some("1000"), is_prod)?,
            },
            environment,
        })
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, LedgerError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(LedgerError::Validation(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(LedgerError::Validation(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<usize, LedgerError> {
    get_env(key, default, is_prod)?.parse().map_err(|e| {
        LedgerError::Validation(anyhow::anyhow!("{} must be a positive integer: {}", key, e))
    })
}
