use anyhow::{Context, Result};
use chrono::Local;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde_json::{Map, Value};

use crate::types::record::Record;
use crate::types::request::Query;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource TEXT NOT NULL,
    data TEXT NOT NULL,
    create_time INTEGER NOT NULL,
    update_time INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_record_resource ON record(resource);
"#;

const SELECT_FIELDS: &str = "id, resource, data, create_time, update_time";

pub fn create_record_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_record(tx: &Transaction, resource: &str, data: &Map<String, Value>) -> Result<Record> {
    let now = Local::now().timestamp() as u64;
    let encoded = serde_json::to_string(data).context("encode record data")?;

    let sql = "INSERT INTO record (resource, data, create_time, update_time) VALUES (?, ?, ?, ?)";
    debug!("Database create_record: {sql}, resource={resource}");
    tx.execute(sql, params![resource, encoded, now, now])?;

    Ok(Record {
        id: tx.last_insert_rowid() as u64,
        resource: resource.to_string(),
        data: data.clone(),
        create_time: now,
        update_time: now,
    })
}

pub fn get_record(tx: &Transaction, resource: &str, id: u64) -> Result<Option<Record>> {
    let Ok(id) = i64::try_from(id) else {
        return Ok(None);
    };
    let sql = format!("SELECT {SELECT_FIELDS} FROM record WHERE resource = ? AND id = ?");
    let mut stmt = tx.prepare(&sql)?;
    let row = stmt
        .query_row(params![resource, id], convert_row)
        .optional()?;
    match row {
        Some(row) => Ok(Some(row.into_record()?)),
        None => Ok(None),
    }
}

pub fn list_records(tx: &Transaction, resource: &str, query: &Query) -> Result<Vec<Record>> {
    let sql = format!(
        "SELECT {SELECT_FIELDS} FROM record WHERE resource = ? ORDER BY id LIMIT ? OFFSET ?"
    );
    debug!(
        "Database list_records: {sql}, resource={resource}, limit={}, offset={}",
        query.limit(),
        query.offset()
    );
    let mut stmt = tx.prepare(&sql)?;
    let rows = stmt.query_map(
        params![resource, query.limit(), query.offset()],
        convert_row,
    )?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?.into_record()?);
    }
    Ok(records)
}

pub fn count_records(tx: &Transaction, resource: &str) -> Result<u64> {
    let count: u64 = tx.query_row(
        "SELECT COUNT(*) FROM record WHERE resource = ?",
        params![resource],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_record(
    tx: &Transaction,
    resource: &str,
    id: u64,
    data: &Map<String, Value>,
) -> Result<Option<Record>> {
    if i64::try_from(id).is_err() {
        return Ok(None);
    }
    let now = Local::now().timestamp() as u64;
    let encoded = serde_json::to_string(data).context("encode record data")?;

    let count = tx.execute(
        "UPDATE record SET data = ?, update_time = ? WHERE resource = ? AND id = ?",
        params![encoded, now, resource, id],
    )?;
    if count == 0 {
        return Ok(None);
    }
    get_record(tx, resource, id)
}

pub fn delete_record(tx: &Transaction, resource: &str, id: u64) -> Result<bool> {
    let Ok(id) = i64::try_from(id) else {
        return Ok(false);
    };
    let count = tx.execute(
        "DELETE FROM record WHERE resource = ? AND id = ?",
        params![resource, id],
    )?;
    Ok(count > 0)
}

/// Raw row, the data column is decoded outside of the rusqlite closure so
/// that JSON errors keep their context.
struct RecordRow {
    id: u64,
    resource: String,
    data: String,
    create_time: u64,
    update_time: u64,
}

impl RecordRow {
    fn into_record(self) -> Result<Record> {
        let data: Map<String, Value> = serde_json::from_str(&self.data)
            .with_context(|| format!("decode data of record {}", self.id))?;
        Ok(Record {
            id: self.id,
            resource: self.resource,
            data,
            create_time: self.create_time,
            update_time: self.update_time,
        })
    }
}

fn convert_row(row: &Row) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        resource: row.get(1)?,
        data: row.get(2)?,
        create_time: row.get(3)?,
        update_time: row.get(4)?,
    })
}
