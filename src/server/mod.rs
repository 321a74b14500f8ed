pub mod audit;
pub mod authn;
pub mod authz;
pub mod config;
pub mod db;
pub mod factory;
pub mod handlers;
pub mod response;
pub mod restful;
