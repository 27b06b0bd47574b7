use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{ApiResponse, PaginatedResponse, PaginationParams};
use crate::mover::{BlacklistRequest, CreateMoverRequest, Mover, MoverFilter, MoverPatch, MoverService};
use crate::quote::{Quote, QuoteService};

pub async fn create_mover(
    State(service): State<Arc<MoverService>>,
    Json(request): Json<CreateMoverRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Mover>>)> {
    let mover = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(mover))))
}

pub async fn get_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn list_movers(
    State(service): State<Arc<MoverService>>,
    Query(filter): Query<MoverFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Mover>>>> {
    let page = service.list(&filter, pagination.resolve()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn update_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<MoverPatch>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.update(id, patch).await?)))
}

pub async fn activate_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.activate(id).await?)))
}

pub async fn suspend_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.suspend(id).await?)))
}

pub async fn blacklist_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<BlacklistRequest>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.blacklist(id, request).await?)))
}

pub async fn lift_mover_blacklist(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.lift_blacklist(id).await?)))
}

pub async fn delete_mover(
    State(service): State<Arc<MoverService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Mover>>> {
    Ok(Json(ApiResponse::ok(service.delete(id).await?)))
}

pub async fn list_mover_quotes(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Quote>>>> {
    Ok(Json(ApiResponse::ok(service.list_for_mover(id).await?)))
}
