use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

use super::sqlite::config::SqliteConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DbConfig {
    #[serde(default = "DbConfig::default_name")]
    pub name: DbType,

    #[serde(default = "SqliteConfig::default")]
    pub sqlite: SqliteConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl CommonConfig for DbConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            sqlite: SqliteConfig::default(),
        }
    }

    fn complete(&mut self, ps: &PathSet) -> Result<()> {
        match self.name {
            DbType::Sqlite => self.sqlite.complete(ps).context("sqlite")?,
        }
        Ok(())
    }
}

impl DbConfig {
    pub fn default_name() -> DbType {
        DbType::Sqlite
    }
}
