//! HTTP API - the wizard exposed per anonymous session

pub mod handlers;
pub mod routes;

pub use routes::create_router;
