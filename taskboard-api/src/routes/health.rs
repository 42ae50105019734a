/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2025-03-14T12:00:00Z",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 4 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use taskboard_shared::db::pool::{health_check as db_health_check, pool_stats, PoolStats};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database does not answer
    pub status: String,

    pub version: String,

    pub timestamp: DateTime<Utc>,

    /// `connected` or `disconnected`
    pub database: String,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Ok(Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        pool: pool_stats(&state.db),
    }))
}
