//! HTTP API handlers
//!
//! Request handlers for region lookups and stored results.

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info};

use cep_core::{LocalityRecord, Region, RegionResult, StoredRegionResult};

use crate::error::{ApiError, Result};
use crate::server::AppState;

/// Header listing the regions left out of a partial answer
pub const FAILED_REGIONS_HEADER: &str = "x-failed-regions";

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Batch lookup - `AC,SP,RJ`
pub async fn get_localities(
    State(state): State<AppState>,
    Path(regions): Path<String>,
) -> Result<Response> {
    debug!("Locality request: {}", regions);

    let codes: Vec<&str> = regions.split(',').collect();
    let resolution = state.resolver.resolve(&codes).await?;

    record(&state, &resolution.results).await;

    info!(
        "Answering with {} regions ({} failed)",
        resolution.results.len(),
        resolution.failures.len()
    );

    let failed = resolution
        .failures
        .iter()
        .map(|f| f.region.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut response = Json(resolution.results).into_response();
    if !failed.is_empty() {
        let value = HeaderValue::from_str(&failed)
            .map_err(|e| ApiError::Internal(format!("Bad header value {}: {}", failed, e)))?;
        response.headers_mut().insert(FAILED_REGIONS_HEADER, value);
    }

    Ok(response)
}

/// Single-region lookup
pub async fn get_region_localities(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Json<Vec<LocalityRecord>>> {
    debug!("Single region request: {}", region);

    let localities = state.resolver.resolve_one(&region).await?;

    let region: Region = region.trim().parse()?;
    record(&state, &[RegionResult::new(region, localities.clone())]).await;

    Ok(Json(localities))
}

/// Stored results of one region, newest first
pub async fn get_stored_localities(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Result<Json<Vec<StoredRegionResult>>> {
    let region: Region = region.trim().parse()?;
    let store = state.store.clone().ok_or(ApiError::StoreDisabled)?;

    let stored = tokio::task::spawn_blocking(move || {
        let store = store
            .lock()
            .map_err(|e| ApiError::Internal(format!("Store lock poisoned: {}", e)))?;
        Ok::<_, ApiError>(store.find_by_region(region)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Store task failed: {}", e)))??;

    debug!("{} stored results for {}", stored.len(), region);

    Ok(Json(stored))
}

/// Hand a finished result set to the result files and the store.
///
/// Neither can change the answer: failures are only logged, and the store
/// write finishes in the background.
async fn record(state: &AppState, results: &[RegionResult]) {
    if let Some(sink) = state.sink.clone() {
        let batch = results.to_vec();
        match tokio::task::spawn_blocking(move || sink.write(&batch)).await {
            Ok(Ok(())) => debug!("Result files written"),
            Ok(Err(e)) => error!("Failed to write result files: {}", e),
            Err(e) => error!("Result file task failed: {}", e),
        }
    }

    if let Some(store) = state.store.clone() {
        let batch = results.to_vec();
        tokio::task::spawn_blocking(move || {
            let store = match store.lock() {
                Ok(store) => store,
                Err(e) => {
                    error!("Store lock poisoned: {}", e);
                    return;
                }
            };
            for result in &batch {
                if let Err(e) = store.save(result) {
                    error!("Failed to store {}: {}", result.region, e);
                }
            }
        });
    }
}
