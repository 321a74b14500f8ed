use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Body of `POST /login`. Both fields are optional at the wire level so that
/// a missing field can be told apart from a wrong one. The identifier is
/// kept as a raw number, any integer is a well-formed claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: Option<Number>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub role: String,
    pub identity_id: u64,
}
