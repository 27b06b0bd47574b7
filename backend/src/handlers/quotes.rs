use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::middleware::Actor;
use crate::models::ApiResponse;
use crate::quote::{CreateQuoteRequest, Quote, QuoteService, ScoreQuoteRequest, ValidateQuoteRequest};

pub async fn create_quote(
    State(service): State<Arc<QuoteService>>,
    Json(request): Json<CreateQuoteRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Quote>>)> {
    let quote = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(quote))))
}

pub async fn get_quote(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Quote>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn remind_quote(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Quote>>> {
    Ok(Json(ApiResponse::ok(service.remind(id).await?)))
}

/// Approve or reject; the caller's role is checked by the service
pub async fn validate_quote(
    State(service): State<Arc<QuoteService>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(request): Json<ValidateQuoteRequest>,
) -> ApiResult<Json<ApiResponse<Quote>>> {
    let quote = service.validate(id, actor.id(), request).await?;
    Ok(Json(ApiResponse::ok(quote)))
}

pub async fn score_quote(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ScoreQuoteRequest>,
) -> ApiResult<Json<ApiResponse<Quote>>> {
    Ok(Json(ApiResponse::ok(service.score(id, request).await?)))
}

pub async fn delete_quote(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Quote>>> {
    Ok(Json(ApiResponse::ok(service.delete(id).await?)))
}

#[derive(Debug, Serialize)]
pub struct ExpiredQuotes {
    pub expired: Vec<Uuid>,
}

/// External trigger for quote expiry
pub async fn expire_quotes(
    State(service): State<Arc<QuoteService>>,
) -> ApiResult<Json<ApiResponse<ExpiredQuotes>>> {
    let expired = service.expire_overdue(Utc::now()).await?;
    Ok(Json(ApiResponse::ok(ExpiredQuotes { expired })))
}
