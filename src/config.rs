//! Configuration
//!
//! Built-in defaults, then an optional TOML file (`outreach.toml` unless
//! another path is given), then `OUTREACH_*` environment variables with
//! `__` separating nested keys:
//!
//! ```bash
//! OUTREACH_SERVER__BIND=0.0.0.0:8080
//! OUTREACH_STORAGE__TAB="Outreach Data"
//! OUTREACH_MEMORY__MODE=session
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::entry::RecordLayout;
use crate::error::{LayoutError, StorageError};
use crate::memory::{FileNameMemory, NameMemory, SharedNameMemory};
use crate::store::{FileStore, MemoryStore, TableStore};
use crate::table::Table;

const DEFAULT_CONFIG_FILE: &str = "outreach.toml";
const ENV_PREFIX: &str = "OUTREACH_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid record layout: {0}")]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub layout: RecordLayout,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Workbook file holding the tab
    pub document: PathBuf,
    pub tab: String,
    /// Row 1 of a newly created tab
    pub header: Vec<String>,
    /// CSV used instead of `header` when the tab does not exist yet
    #[serde(default)]
    pub seed_csv: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            backend: StorageBackend::File,
            document: PathBuf::from("database/outreach.bin.gz"),
            tab: "Outreach Data".to_string(),
            header: ["", "Name", "Email", "", "", "Reference"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            seed_csv: None,
        }
    }
}

/// Where the form keeps the last submitter name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// Carried in the `name` query parameter of the redirect
    Query,
    File,
    /// One value for the whole process
    Shared,
    /// Per browser, via the `session` cookie
    Session,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    pub mode: MemoryMode,
    pub file: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            mode: MemoryMode::Query,
            file: PathBuf::from("database/last_name.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, `outreach.toml` if present, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Defaults, the given TOML file, then the environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment(path.as_ref()))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Opens the configured table backend.
    pub fn open_store(&self) -> Result<Box<dyn TableStore + Send>, StorageError> {
        match self.storage.backend {
            StorageBackend::File => {
                let store = FileStore::open_with_seed(
                    &self.storage.document,
                    &self.storage.tab,
                    &self.storage.header,
                    self.storage.seed_csv.as_deref(),
                )?;
                Ok(Box::new(store))
            }
            StorageBackend::Memory => {
                let table = match &self.storage.seed_csv {
                    Some(csv) => crate::loader::from_csv(csv)?,
                    None => Table::with_header(&self.storage.header),
                };
                Ok(Box::new(MemoryStore::new(table)))
            }
        }
    }

    /// Process-level name memory for the `file` and `shared` modes. The
    /// `query` and `session` modes are resolved per request by the form.
    pub fn name_memory(&self) -> Option<Box<dyn NameMemory>> {
        match self.memory.mode {
            MemoryMode::File => Some(Box::new(FileNameMemory::new(&self.memory.file))),
            MemoryMode::Shared => Some(Box::new(SharedNameMemory::new())),
            MemoryMode::Query | MemoryMode::Session => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_sheet_layout() {
        let config = Config::default();
        assert_eq!(config.layout, RecordLayout::default());
        assert_eq!(config.storage.tab, "Outreach Data");
        assert_eq!(config.storage.header[5], "Reference");
        assert_eq!(config.memory.mode, MemoryMode::Query);
    }

    #[test]
    fn toml_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [storage]
                backend = "memory"
                document = "ignored.bin.gz"
                tab = "Leads"
                header = ["Name", "Email", "Reference"]

                [layout]
                name_column = 1
                email_column = 2
                reference_column = 3
                "#,
            )?;
            jail.set_env("OUTREACH_MEMORY__MODE", "session");
            jail.set_env("OUTREACH_SERVER__BIND", "0.0.0.0:9000");

            let config = Config::from_file("custom.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.storage.backend, StorageBackend::Memory);
            assert_eq!(config.storage.tab, "Leads");
            assert_eq!(config.layout.reference_column, 3);
            assert_eq!(config.memory.mode, MemoryMode::Session);
            assert_eq!(config.server.bind, "0.0.0.0:9000");
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn overlapping_layout_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "bad.toml",
                r#"
                [layout]
                name_column = 2
                email_column = 2
                reference_column = 6
                "#,
            )?;
            match Config::from_file("bad.toml") {
                Err(ConfigError::Layout(_)) => Ok(()),
                other => Err(format!("expected layout error, got {:?}", other).into()),
            }
        });
    }
}
