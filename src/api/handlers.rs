use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::OwnedUrl;
use crate::service::{ServiceError, Shortener};
use crate::storage::StorageError;

pub struct AppState {
    pub service: Arc<Shortener>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct ShortenResponse {
    pub result: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub urls: i64,
    pub users: i64,
}

/// Owner identity comes from the (external) auth collaborator; the shim
/// only reads the header it sets.
fn owner_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

fn error_response(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        ServiceError::Storage(StorageError::NotFound) => StatusCode::NOT_FOUND,
        ServiceError::Storage(StorageError::Gone) => StatusCode::GONE,
        ServiceError::Storage(StorageError::Conflict) => StatusCode::CONFLICT,
        ServiceError::Storage(StorageError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::GenerationExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::PipelineClosed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Create a shortened URL. `201 Created` for a new mapping,
/// `409 Conflict` with the existing short URL for a duplicate.
pub async fn shorten(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), (StatusCode, Json<ErrorResponse>)> {
    if payload.url.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "URL cannot be empty".to_string(),
            }),
        ));
    }

    let outcome = state
        .service
        .shorten(&owner_id(&headers), &payload.url)
        .await
        .map_err(error_response)?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };
    Ok((
        status,
        Json(ShortenResponse {
            result: outcome.short_url,
        }),
    ))
}

/// Redirect a short id to its original URL.
pub async fn redirect_url(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Response {
    match state.service.resolve(&short_id).await {
        Ok(original_url) => Redirect::temporary(&original_url).into_response(),
        Err(ServiceError::Storage(StorageError::NotFound)) => {
            (StatusCode::NOT_FOUND, "URL not found").into_response()
        }
        Err(ServiceError::Storage(StorageError::Gone)) => {
            (StatusCode::GONE, "This link has been deleted").into_response()
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
    }
}

/// List the caller's live URLs. An empty list is a normal outcome, not
/// an error.
pub async fn list_owned(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OwnedUrl>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .service
        .list_owned(&owner_id(&headers))
        .await
        .map(Json)
        .map_err(error_response)
}

/// Accept a batch deletion. `202 Accepted` means the pipeline took the
/// batch, not that every record is gone yet.
pub async fn delete_batch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(short_ids): Json<Vec<String>>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state
        .service
        .delete_batch(&owner_id(&headers), short_ids)
        .await
        .map(|_| StatusCode::ACCEPTED)
        .map_err(error_response)
}

/// Backend liveness probe.
pub async fn ping(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.service.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Aggregate counts for operational tooling.
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let urls = state.service.url_count().await.map_err(error_response)?;
    let users = state.service.user_count().await.map_err(error_response)?;
    Ok(Json(StatsResponse { urls, users }))
}
