use std::fmt;

use log::info;
use serde::Serialize;

use super::authz::Method;

/// One authorization decision on a protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessEvent {
    pub identity_id: Option<u64>,
    pub method: Method,
    pub resource: String,
    pub allowed: bool,
    pub peer: Option<String>,
    pub time: u64,
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = if self.allowed { "allow" } else { "deny" };
        write!(f, "{decision} {} {}", self.method, self.resource)?;
        match self.identity_id {
            Some(id) => write!(f, " identity={id}")?,
            None => write!(f, " identity=-")?,
        }
        match self.peer {
            Some(ref peer) => write!(f, " peer={peer}")?,
            None => write!(f, " peer=-")?,
        }
        write!(f, " time={}", self.time)
    }
}

/// Receives every access decision made for `/api` resources.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AccessEvent);
}

/// Writes one log line per event.
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: &AccessEvent) {
        info!("Access: {event}");
    }
}
