pub mod healthz;
pub mod identity;
pub mod record;
pub mod request;
pub mod response;
pub mod token;
