use anyhow::{bail, Result};
use chrono::Local;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::server::db::IdentityRecord;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS identity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier INTEGER NOT NULL UNIQUE,
    role TEXT NOT NULL,
    hash TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);
"#;

const SELECT_FIELDS: &str = "id, identifier, role, hash, create_time, update_time";

pub fn create_identity_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_identity(tx: &Transaction, identity: &IdentityRecord) -> Result<u64> {
    if get_identity_by_identifier(tx, identity.identifier)?.is_some() {
        bail!("identity with identifier {} already exists", identity.identifier);
    }

    let now = Local::now().timestamp() as u64;
    let sql = "INSERT INTO identity (identifier, role, hash, create_time, update_time) VALUES (?, ?, ?, ?, ?)";
    debug!(
        "Database create_identity: {sql}, identifier={}, role={}",
        identity.identifier, identity.role
    );
    tx.execute(
        sql,
        params![identity.identifier, identity.role, identity.hash, now, now],
    )?;
    Ok(tx.last_insert_rowid() as u64)
}

pub fn get_identity(tx: &Transaction, id: u64) -> Result<Option<IdentityRecord>> {
    // sqlite integers are signed, larger values cannot be stored
    let Ok(id) = i64::try_from(id) else {
        return Ok(None);
    };
    let sql = format!("SELECT {SELECT_FIELDS} FROM identity WHERE id = ?");
    let mut stmt = tx.prepare(&sql)?;
    let identity = stmt.query_row(params![id], convert_identity).optional()?;
    Ok(identity)
}

pub fn get_identity_by_identifier(
    tx: &Transaction,
    identifier: u64,
) -> Result<Option<IdentityRecord>> {
    let Ok(identifier) = i64::try_from(identifier) else {
        return Ok(None);
    };
    let sql = format!("SELECT {SELECT_FIELDS} FROM identity WHERE identifier = ?");
    let mut stmt = tx.prepare(&sql)?;
    let identity = stmt
        .query_row(params![identifier], convert_identity)
        .optional()?;
    Ok(identity)
}

pub fn list_identities(tx: &Transaction) -> Result<Vec<IdentityRecord>> {
    let sql = format!("SELECT {SELECT_FIELDS} FROM identity ORDER BY id");
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt.query_map([], convert_identity)?;

    let mut identities = Vec::new();
    for row in rows {
        identities.push(row?);
    }
    Ok(identities)
}

pub fn update_identity_role(tx: &Transaction, id: u64, role: &str) -> Result<()> {
    let now = Local::now().timestamp() as u64;
    let count = tx.execute(
        "UPDATE identity SET role = ?, update_time = ? WHERE id = ?",
        params![role, now, id],
    )?;
    if count == 0 {
        bail!("identity {id} not found");
    }
    Ok(())
}

pub fn update_identity_hash(tx: &Transaction, id: u64, hash: &str) -> Result<()> {
    let now = Local::now().timestamp() as u64;
    let count = tx.execute(
        "UPDATE identity SET hash = ?, update_time = ? WHERE id = ?",
        params![hash, now, id],
    )?;
    if count == 0 {
        bail!("identity {id} not found");
    }
    Ok(())
}

pub fn delete_identity(tx: &Transaction, id: u64) -> Result<()> {
    tx.execute("DELETE FROM identity WHERE id = ?", params![id])?;
    Ok(())
}

fn convert_identity(row: &Row) -> rusqlite::Result<IdentityRecord> {
    Ok(IdentityRecord {
        id: row.get(0)?,
        identifier: row.get(1)?,
        role: row.get(2)?,
        hash: row.get(3)?,
        create_time: row.get(4)?,
        update_time: row.get(5)?,
    })
}
