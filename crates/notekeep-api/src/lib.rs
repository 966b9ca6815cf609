pub mod auth;
pub mod cached_notes;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notes;
pub mod routes;
pub mod shutdown;

mod timeout;
