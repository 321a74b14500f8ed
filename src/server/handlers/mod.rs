pub mod api;
pub mod healthz;
pub mod login;
pub mod resources;

use actix_web::HttpRequest;

use super::response::Response;

pub trait Handler: Send + Sync {
    /// `path` is the request path with the route prefix and surrounding
    /// slashes removed.
    fn handle(&self, path: &str, req: HttpRequest, body: Option<Vec<u8>>) -> Response;
}

/// Remote address of the request as seen by the server.
pub fn peer_addr(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}
