//! API Handlers
//!
//! HTTP request handlers exposing the cache facade for inspection.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::StatsSnapshot;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::facade::{Cache, CacheInfo};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HasResponse, HealthResponse, SetRequest,
    SetResponse,
};

/// Application state shared across all handlers.
///
/// The cache handle is cheap to clone and synchronizes internally.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache<Value>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Cache<Value>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState with a memory-only cache built from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Cache::new(config.clone()))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state.cache.set(req.key.clone(), req.value, req.ttl).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a fresh value; counts as a read for stats and recency.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<HasResponse> {
    let exists = state.cache.has(&key).await;
    Json(HasResponse::new(key, exists))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.cache.get_stats().await)
}

/// Handler for GET /info
///
/// Per-entry details; does not affect recency or counters.
pub async fn info_handler(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(state.cache.get_info().await)
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
