//! HTTP surface: router, health endpoint, WebSocket upgrade

pub mod routes;

pub use routes::build_router;
