use std::sync::Arc;

use actix_web::http::header;
use actix_web::web::Query as QueryString;
use actix_web::HttpRequest;
use chrono::Local;
use log::debug;
use serde_json::{Map, Value};

use crate::server::audit::{AccessEvent, AuditSink};
use crate::server::authn::token::jwt::JwtTokenValidator;
use crate::server::authn::{Authenticator, BearerTokenAuthenticator, RequestContext};
use crate::server::authz::{Authorizer, AuthzRequest, AuthzResponse, Method, PolicyAuthorizer};
use crate::server::db::Database;
use crate::server::response::Response;
use crate::types::identity::{CaniResponse, WhoamiResponse};
use crate::types::request::{Query, ResourceRequest};

use super::resources::dispatch::Dispatcher;
use super::resources::is_registered;
use super::{peer_addr, Handler};

pub struct ApiHandler {
    authn: BearerTokenAuthenticator<JwtTokenValidator>,
    authz: PolicyAuthorizer,
    audit: Arc<dyn AuditSink>,

    dispatcher: Dispatcher,
}

impl ApiHandler {
    pub fn new(
        authn: BearerTokenAuthenticator<JwtTokenValidator>,
        authz: PolicyAuthorizer,
        audit: Arc<dyn AuditSink>,
        db: Arc<Database>,
    ) -> Self {
        Self {
            authn,
            authz,
            audit,
            dispatcher: Dispatcher::new(db),
        }
    }

    /// Resolves the caller once per request. Every failure ends up as an
    /// anonymous context.
    fn resolve(&self, req: &HttpRequest) -> RequestContext {
        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.as_bytes());
        RequestContext {
            identity: self.authn.authenticate(header).into_identity(),
            peer: peer_addr(req),
        }
    }

    fn handle_whoami(&self, ctx: &RequestContext) -> Response {
        match ctx.identity {
            Some(ref identity) => Response::json(WhoamiResponse {
                identity_id: identity.id,
                identifier: identity.identifier,
                role: identity.role.name().to_string(),
            }),
            None => Response::unauthenticated(),
        }
    }

    fn handle_cani(&self, ctx: &RequestContext, method: &str, resource: &str) -> Response {
        if ctx.identity.is_none() {
            return Response::unauthenticated();
        }
        let method = match Method::parse(method) {
            Some(method) => method,
            None => return Response::bad_request("invalid method"),
        };

        let resp = self.authz.authorize_request(&AuthzRequest {
            identity: ctx.identity.as_ref(),
            method,
            resource,
        });
        Response::json(CaniResponse {
            allow: resp == AuthzResponse::Ok,
        })
    }

    fn handle_resource(
        &self,
        ctx: &RequestContext,
        req: &HttpRequest,
        method: Method,
        resource: &str,
        id: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Response {
        if !is_registered(resource) {
            return Response::not_found("resource not found");
        }

        let authz_resp = self.authz.authorize_request(&AuthzRequest {
            identity: ctx.identity.as_ref(),
            method,
            resource,
        });
        self.audit.record(&AccessEvent {
            identity_id: ctx.identity.as_ref().map(|identity| identity.id),
            method,
            resource: resource.to_string(),
            allowed: authz_resp == AuthzResponse::Ok,
            peer: ctx.peer.clone(),
            time: Local::now().timestamp() as u64,
        });
        match authz_resp {
            AuthzResponse::Ok => {}
            AuthzResponse::Unauthenticated => return Response::unauthenticated(),
            AuthzResponse::Unauthorized => return Response::unauthorized(),
        }

        let rsc_req = match Self::parse_resource_request(req, method, id, body) {
            Ok(rsc_req) => rsc_req,
            Err(resp) => return resp,
        };
        self.dispatcher.dispatch(resource, rsc_req)
    }

    fn parse_resource_request(
        req: &HttpRequest,
        method: Method,
        id: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<ResourceRequest, Response> {
        let id = match id {
            Some(id) => match id.parse::<u64>() {
                Ok(id) if id > 0 => Some(id),
                _ => return Err(Response::bad_request("invalid id")),
            },
            None => None,
        };

        let rsc_req = match (method, id) {
            (Method::Get | Method::Head, None) => {
                let query = match QueryString::<Query>::from_query(req.query_string()) {
                    Ok(query) => query.into_inner(),
                    Err(e) => {
                        debug!("Invalid list query '{}': {e}", req.query_string());
                        return Err(Response::bad_request("invalid query"));
                    }
                };
                ResourceRequest::List(query)
            }
            (Method::Get | Method::Head, Some(id)) => ResourceRequest::Get(id),
            (Method::Post, None) => ResourceRequest::Create(Self::parse_object(body)?),
            (Method::Put, Some(id)) => ResourceRequest::Replace(id, Self::parse_object(body)?),
            (Method::Patch, Some(id)) => ResourceRequest::Patch(id, Self::parse_object(body)?),
            (Method::Delete, Some(id)) => ResourceRequest::Delete(id),
            _ => return Err(Response::method_not_allowed()),
        };
        Ok(rsc_req)
    }

    fn parse_object(body: Option<Vec<u8>>) -> Result<Map<String, Value>, Response> {
        let body = match body {
            Some(body) if !body.is_empty() => body,
            _ => return Err(Response::bad_request("request body is required")),
        };
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(data)) => Ok(data),
            _ => Err(Response::bad_request("request body must be a json object")),
        }
    }
}

impl Handler for ApiHandler {
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response {
        let method = match Method::parse(req.method().as_str()) {
            Some(method) => method,
            None => return Response::method_not_allowed(),
        };

        let ctx = self.resolve(&req);

        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            ["whoami"] => {
                if !method.is_read_only() {
                    return Response::method_not_allowed();
                }
                self.handle_whoami(&ctx)
            }
            ["cani", verb, resource] => {
                if !method.is_read_only() {
                    return Response::method_not_allowed();
                }
                self.handle_cani(&ctx, verb, resource)
            }
            [resource] => self.handle_resource(&ctx, &req, method, resource, None, body),
            [resource, id] => {
                self.handle_resource(&ctx, &req, method, resource, Some(*id), body)
            }
            _ => Response::not_found("resource not found"),
        }
    }
}
