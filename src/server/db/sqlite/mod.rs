mod identity;
mod record;

pub mod config;
pub mod factory;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;
use serde_json::{Map, Value};

use crate::types::record::Record;
use crate::types::request::Query;

use super::{Connection, IdentityRecord, Transaction};

/// SQLite-based database, file-based or in-memory.
pub struct Sqlite {
    conn: RawConnection,
}

pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl Sqlite {
    /// Opens a SQLite database file, creating it and its tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Creates a new in-memory database. Content is lost when the program
    /// exits.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(db: &RawConnection) -> Result<()> {
        identity::create_identity_tables(db)?;
        record::create_record_tables(db)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for Sqlite {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_identity(&self, identity: &IdentityRecord) -> Result<u64> {
        identity::create_identity(&self.tx, identity)
    }

    fn get_identity(&self, id: u64) -> Result<Option<IdentityRecord>> {
        identity::get_identity(&self.tx, id)
    }

    fn get_identity_by_identifier(&self, identifier: u64) -> Result<Option<IdentityRecord>> {
        identity::get_identity_by_identifier(&self.tx, identifier)
    }

    fn list_identities(&self) -> Result<Vec<IdentityRecord>> {
        identity::list_identities(&self.tx)
    }

    fn update_identity_role(&self, id: u64, role: &str) -> Result<()> {
        identity::update_identity_role(&self.tx, id, role)
    }

    fn update_identity_hash(&self, id: u64, hash: &str) -> Result<()> {
        identity::update_identity_hash(&self.tx, id, hash)
    }

    fn delete_identity(&self, id: u64) -> Result<()> {
        identity::delete_identity(&self.tx, id)
    }

    fn create_record(&self, resource: &str, data: &Map<String, Value>) -> Result<Record> {
        record::create_record(&self.tx, resource, data)
    }

    fn get_record(&self, resource: &str, id: u64) -> Result<Option<Record>> {
        record::get_record(&self.tx, resource, id)
    }

    fn list_records(&self, resource: &str, query: &Query) -> Result<Vec<Record>> {
        record::list_records(&self.tx, resource, query)
    }

    fn count_records(&self, resource: &str) -> Result<u64> {
        record::count_records(&self.tx, resource)
    }

    fn update_record(
        &self,
        resource: &str,
        id: u64,
        data: &Map<String, Value>,
    ) -> Result<Option<Record>> {
        record::update_record(&self.tx, resource, id, data)
    }

    fn delete_record(&self, resource: &str, id: u64) -> Result<bool> {
        record::delete_record(&self.tx, resource, id)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
