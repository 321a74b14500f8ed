mod sqlite;

#[cfg(test)]
mod tests;

pub mod config;
pub mod factory;

use std::cell::RefCell;
use std::sync::Mutex;

use anyhow::{bail, Result};
use serde_json::{Map, Value};
use sqlite::{Sqlite, SqliteTransaction};

use crate::types::record::Record;
use crate::types::request::Query;

/// Database connection trait that can create transactions
pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    fn transaction(&'a mut self) -> Result<T>;
}

/// All database operations, executed inside one transaction.
pub trait Transaction {
    /// Inserts an identity and returns its id. The identifier must be unique.
    fn create_identity(&self, identity: &IdentityRecord) -> Result<u64>;
    fn get_identity(&self, id: u64) -> Result<Option<IdentityRecord>>;
    fn get_identity_by_identifier(&self, identifier: u64) -> Result<Option<IdentityRecord>>;
    fn list_identities(&self) -> Result<Vec<IdentityRecord>>;
    fn update_identity_role(&self, id: u64, role: &str) -> Result<()>;
    fn update_identity_hash(&self, id: u64, hash: &str) -> Result<()>;
    fn delete_identity(&self, id: u64) -> Result<()>;

    fn create_record(&self, resource: &str, data: &Map<String, Value>) -> Result<Record>;
    fn get_record(&self, resource: &str, id: u64) -> Result<Option<Record>>;
    fn list_records(&self, resource: &str, query: &Query) -> Result<Vec<Record>>;
    fn count_records(&self, resource: &str) -> Result<u64>;
    /// Replaces the data of a record, returns `None` if it does not exist.
    fn update_record(
        &self,
        resource: &str,
        id: u64,
        data: &Map<String, Value>,
    ) -> Result<Option<Record>>;
    /// Returns whether a record was deleted.
    fn delete_record(&self, resource: &str, id: u64) -> Result<bool>;

    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}

/// A row of the `identity` table.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    pub id: u64,
    /// The person's document number, used to log in
    pub identifier: u64,
    pub role: String,
    /// bcrypt hash, or a legacy plaintext value
    pub hash: String,
    pub create_time: u64,
    pub update_time: u64,
}

impl IdentityRecord {
    pub fn new(identifier: u64, role: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            identifier,
            role: role.into(),
            hash: hash.into(),
            create_time: 0,
            update_time: 0,
        }
    }
}

/// Read-only lookup of identities, used by login and by request
/// authentication.
pub trait IdentityStore: Send + Sync {
    fn find_by_id(&self, id: u64) -> Result<Option<IdentityRecord>>;
    fn find_by_identifier(&self, identifier: u64) -> Result<Option<IdentityRecord>>;
}

pub struct Database {
    conn: Mutex<RefCell<UnionConnection>>,
}

pub enum UnionConnection {
    Sqlite(Sqlite),
}

pub enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Mutex::new(RefCell::new(conn)),
        }
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        let conn = Sqlite::memory().unwrap();
        Self::new(UnionConnection::Sqlite(conn))
    }

    /// Runs `f` inside a transaction. The transaction is committed if `f`
    /// returns `Ok` and rolled back otherwise.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock database: {e:#}"),
        };
        let mut conn = conn.borrow_mut();
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

impl IdentityStore for Database {
    fn find_by_id(&self, id: u64) -> Result<Option<IdentityRecord>> {
        self.with_transaction(|tx| tx.get_identity(id))
    }

    fn find_by_identifier(&self, identifier: u64) -> Result<Option<IdentityRecord>> {
        self.with_transaction(|tx| tx.get_identity_by_identifier(identifier))
    }
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(sqlite) => sqlite.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_identity(&self, identity: &IdentityRecord) -> Result<u64> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_identity(identity),
        }
    }

    fn get_identity(&self, id: u64) -> Result<Option<IdentityRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_identity(id),
        }
    }

    fn get_identity_by_identifier(&self, identifier: u64) -> Result<Option<IdentityRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_identity_by_identifier(identifier),
        }
    }

    fn list_identities(&self) -> Result<Vec<IdentityRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_identities(),
        }
    }

    fn update_identity_role(&self, id: u64, role: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_identity_role(id, role),
        }
    }

    fn update_identity_hash(&self, id: u64, hash: &str) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_identity_hash(id, hash),
        }
    }

    fn delete_identity(&self, id: u64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_identity(id),
        }
    }

    fn create_record(&self, resource: &str, data: &Map<String, Value>) -> Result<Record> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_record(resource, data),
        }
    }

    fn get_record(&self, resource: &str, id: u64) -> Result<Option<Record>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_record(resource, id),
        }
    }

    fn list_records(&self, resource: &str, query: &Query) -> Result<Vec<Record>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_records(resource, query),
        }
    }

    fn count_records(&self, resource: &str) -> Result<u64> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.count_records(resource),
        }
    }

    fn update_record(
        &self,
        resource: &str,
        id: u64,
        data: &Map<String, Value>,
    ) -> Result<Option<Record>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_record(resource, id, data),
        }
    }

    fn delete_record(&self, resource: &str, id: u64) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_record(resource, id),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
