use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::middleware::issue_token;
use super::{ApiError, ApiResponse, AppState};
use crate::models::{NewProduct, UpdateProduct};
use crate::product_manager::{ProductChange, ProductListing, StatusReport};
use crate::scheduler::TriggerStatus;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdResponse {
    pub threshold: i64,
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "pricewatch"
    }))
}

/// Starts a pass in the background; a pass already in flight wins.
pub async fn check_now(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.product_manager.trigger_check().await {
        TriggerStatus::Started => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "started" })),
        ),
        TriggerStatus::AlreadyRunning => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "status": "already_running" })),
        ),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    if request.password != state.security.admin_password {
        tracing::warn!("Failed admin login attempt");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let token = issue_token(&state.security)?;
    tracing::info!("Admin logged in");
    Ok(Json(ApiResponse::success(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.security.token_expiry,
    })))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<ProductListing> {
    let listing = state.product_manager.list_products().await?;
    Ok(Json(ApiResponse::success(listing)))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> Result<(StatusCode, Json<ApiResponse<ProductChange>>), ApiError> {
    let change = state.product_manager.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(change))))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateProduct>,
) -> ApiResult<ProductChange> {
    let change = state.product_manager.update_product(&id, update).await?;
    Ok(Json(ApiResponse::success(change)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.product_manager.delete_product(&id).await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "deleted": id }))))
}

/// Accepts `{"threshold": 700}` as well as the form-style `{"threshold": "700"}`.
pub async fn set_threshold(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<ThresholdResponse> {
    let raw = match body.get("threshold") {
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(ApiError::bad_request("threshold is required")),
    };

    let threshold = state.product_manager.set_threshold(&raw).await?;
    Ok(Json(ApiResponse::success(ThresholdResponse { threshold })))
}

pub async fn status(State(state): State<AppState>) -> ApiResult<StatusReport> {
    let report = state.product_manager.status().await?;
    Ok(Json(ApiResponse::success(report)))
}
