//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{Router, routing::get};

use crate::handlers::{get_localities, get_region_localities, get_stored_localities, health};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Comma-separated batch of up to five regions
        .route("/v1/localities/{regions}", get(get_localities))
        // Single region, flat locality list
        .route("/v1/locality/{region}", get(get_region_localities))
        // Previously scraped results
        .route("/v1/stored/{region}", get(get_stored_localities))
}
