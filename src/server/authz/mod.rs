mod method;
mod policy;
mod role;

pub mod config;
pub mod factory;

use std::sync::Arc;

pub use method::Method;
pub use policy::{is_authorized, PolicyTable, RolePolicy, WILDCARD};
pub use role::Role;

use super::authn::Identity;

pub trait Authorizer: Send + Sync {
    fn authorize_request(&self, req: &AuthzRequest) -> AuthzResponse;
}

#[derive(Debug, Clone, Copy)]
pub struct AuthzRequest<'a> {
    pub identity: Option<&'a Identity>,
    pub method: Method,
    pub resource: &'a str,
}

/// Outcome of an authorization check, ready to be mapped to a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthzResponse {
    /// Access is granted
    Ok,
    /// No identity was resolved for the request
    Unauthenticated,
    /// An identity was resolved but lacks the permission
    Unauthorized,
}

/// Evaluates requests against a shared, immutable [`PolicyTable`].
pub struct PolicyAuthorizer {
    table: Arc<PolicyTable>,
}

impl PolicyAuthorizer {
    pub fn new(table: Arc<PolicyTable>) -> Self {
        Self { table }
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authorize_request(&self, req: &AuthzRequest) -> AuthzResponse {
        if is_authorized(&self.table, req.identity, req.method, req.resource) {
            return AuthzResponse::Ok;
        }

        match req.identity {
            Some(_) => AuthzResponse::Unauthorized,
            None => AuthzResponse::Unauthenticated,
        }
    }
}
