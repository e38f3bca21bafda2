//! API Module
//!
//! HTTP handlers and routing for the cache inspection API.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /has/:key` - Check for a fresh entry
//! - `DELETE /del/:key` - Delete a key
//! - `DELETE /clear` - Drop everything
//! - `GET /stats` - Cache statistics
//! - `GET /info` - Per-entry details
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
