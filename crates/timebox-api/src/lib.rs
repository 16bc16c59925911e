//! JSON HTTP API over the timebox services.

pub mod cache;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, serve, AppState};
