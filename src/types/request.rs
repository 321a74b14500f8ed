use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::server::authz::Method;

/// A parsed operation on a registered resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    List(Query),
    Get(u64),
    Create(Map<String, Value>),
    Replace(u64, Map<String, Value>),
    Patch(u64, Map<String, Value>),
    Delete(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl ResourceRequest {
    pub fn method(&self) -> Method {
        match self {
            ResourceRequest::List(_) | ResourceRequest::Get(_) => Method::Get,
            ResourceRequest::Create(_) => Method::Post,
            ResourceRequest::Replace(_, _) => Method::Put,
            ResourceRequest::Patch(_, _) => Method::Patch,
            ResourceRequest::Delete(_) => Method::Delete,
        }
    }
}

impl Query {
    pub const DEFAULT_LIMIT: u64 = 50;
    pub const MAX_LIMIT: u64 = 500;

    pub fn limit(&self) -> u64 {
        match self.limit {
            Some(0) | None => Self::DEFAULT_LIMIT,
            Some(limit) => limit.min(Self::MAX_LIMIT),
        }
    }

    /// Offsets past the largest sqlite integer are clamped, they select
    /// nothing either way.
    pub fn offset(&self) -> u64 {
        self.offset.unwrap_or(0).min(i64::MAX as u64)
    }
}
