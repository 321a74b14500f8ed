use std::sync::Arc;

use anyhow::Result;
use log::error;
use serde_json::{Map, Value};

use crate::server::db::{Database, Transaction};
use crate::server::response::Response;
use crate::types::record::{ListResponse, Record};
use crate::types::request::ResourceRequest;

/// Runs already authorized resource requests against the record store.
pub struct Dispatcher {
    db: Arc<Database>,
}

impl Dispatcher {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn dispatch(&self, resource: &str, req: ResourceRequest) -> Response {
        let op = req.method().to_string();
        let result = self.db.with_transaction(|tx| Self::execute(tx, resource, req));
        match result {
            Ok(resp) => resp,
            Err(e) => {
                error!("{op} {resource} database error: {e:#}");
                Response::error()
            }
        }
    }

    fn execute(tx: &dyn Transaction, resource: &str, req: ResourceRequest) -> Result<Response> {
        let resp = match req {
            ResourceRequest::List(query) => {
                let total = tx.count_records(resource)?;
                let items = tx.list_records(resource, &query)?;
                Response::json(ListResponse { total, items })
            }
            ResourceRequest::Get(id) => match tx.get_record(resource, id)? {
                Some(record) => Response::json(record),
                None => Self::record_not_found(),
            },
            ResourceRequest::Create(data) => Response::created(tx.create_record(resource, &data)?),
            ResourceRequest::Replace(id, data) => match tx.update_record(resource, id, &data)? {
                Some(record) => Response::json(record),
                None => Self::record_not_found(),
            },
            ResourceRequest::Patch(id, patch) => {
                let record = match tx.get_record(resource, id)? {
                    Some(record) => record,
                    None => return Ok(Self::record_not_found()),
                };
                let data = merge(record, patch);
                match tx.update_record(resource, id, &data)? {
                    Some(record) => Response::json(record),
                    None => Self::record_not_found(),
                }
            }
            ResourceRequest::Delete(id) => {
                if tx.delete_record(resource, id)? {
                    Response::no_content()
                } else {
                    Self::record_not_found()
                }
            }
        };
        Ok(resp)
    }

    fn record_not_found() -> Response {
        Response::not_found("record not found")
    }
}

/// Shallow merge: top-level keys of `patch` overwrite those of the record,
/// a `null` value removes the key.
fn merge(record: Record, patch: Map<String, Value>) -> Map<String, Value> {
    let mut data = record.data;
    for (key, value) in patch {
        if value.is_null() {
            data.remove(&key);
        } else {
            data.insert(key, value);
        }
    }
    data
}
