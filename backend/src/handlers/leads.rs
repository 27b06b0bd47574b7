use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::lead::{ConversionOutcome, CreateLeadRequest, Lead, LeadFilter, LeadService};
use crate::models::{ApiResponse, PaginatedResponse, PaginationParams};

pub async fn create_lead(
    State(service): State<Arc<LeadService>>,
    Json(request): Json<CreateLeadRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Lead>>)> {
    let lead = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(lead))))
}

pub async fn get_lead(
    State(service): State<Arc<LeadService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Lead>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn list_leads(
    State(service): State<Arc<LeadService>>,
    Query(filter): Query<LeadFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Lead>>>> {
    let page = service.list(&filter, pagination.resolve()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn delete_lead(
    State(service): State<Arc<LeadService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Lead>>> {
    Ok(Json(ApiResponse::ok(service.delete(id).await?)))
}

/// Convert a lead into a client and a folder in one step
pub async fn convert_lead(
    State(service): State<Arc<LeadService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ConversionOutcome>>)> {
    let outcome = service.convert(id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(outcome))))
}
