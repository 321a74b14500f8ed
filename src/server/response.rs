use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;

use crate::types::response::ErrorResponse;

pub const MISSING_CREDENTIALS: &str = "missing credentials";
pub const INVALID_CREDENTIALS: &str = "invalid credentials";
pub const AUTHENTICATION_REQUIRED: &str = "authentication required";
pub const PERMISSION_DENIED: &str = "permission denied";
pub const INTERNAL_ERROR: &str = "internal error";

/// A wrapper around [`HttpResponse`]. Error bodies are always
/// `{"error": <message>}`.
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    pub fn json<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Ok().json(data),
        }
    }

    pub fn created<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Created().json(data),
        }
    }

    pub fn no_content() -> Self {
        Self {
            http_response: HttpResponse::NoContent().finish(),
        }
    }

    pub fn bad_request(message: impl AsRef<str>) -> Self {
        Self::err_response(StatusCode::BAD_REQUEST, message.as_ref())
    }

    pub fn missing_credentials() -> Self {
        Self::bad_request(MISSING_CREDENTIALS)
    }

    pub fn invalid_credentials() -> Self {
        Self::err_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS)
    }

    pub fn unauthenticated() -> Self {
        Self::err_response(StatusCode::UNAUTHORIZED, AUTHENTICATION_REQUIRED)
    }

    pub fn unauthorized() -> Self {
        Self::err_response(StatusCode::FORBIDDEN, PERMISSION_DENIED)
    }

    pub fn not_found(message: impl AsRef<str>) -> Self {
        Self::err_response(StatusCode::NOT_FOUND, message.as_ref())
    }

    pub fn method_not_allowed() -> Self {
        Self::err_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    /// Internal failures never leak details to the caller, log them before
    /// returning this.
    pub fn error() -> Self {
        Self::err_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.http_response.status()
    }

    fn err_response(status: StatusCode, message: &str) -> Self {
        let resp = ErrorResponse {
            error: message.to_string(),
        };
        Self {
            http_response: HttpResponseBuilder::new(status).json(resp),
        }
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}
