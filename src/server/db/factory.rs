use std::sync::Arc;

use anyhow::{Context, Result};

use super::config::{DbConfig, DbType};
use super::sqlite::factory::SqliteFactory;
use super::{Database, UnionConnection};

pub struct DbFactory;

impl DbFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn build_db(&self, cfg: &DbConfig) -> Result<Arc<Database>> {
        let conn = match cfg.name {
            DbType::Sqlite => {
                let sqlite_factory = SqliteFactory::new();
                let sqlite = sqlite_factory
                    .build_sqlite(&cfg.sqlite)
                    .context("open sqlite")?;
                UnionConnection::Sqlite(sqlite)
            }
        };

        Ok(Arc::new(Database::new(conn)))
    }
}
