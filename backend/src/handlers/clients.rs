use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::client::{Client, ClientFilter, ClientPatch, ClientService, CreateClientRequest};
use crate::error::ApiResult;
use crate::folder::Folder;
use crate::models::{ApiResponse, PaginatedResponse, PaginationParams};

pub async fn create_client(
    State(service): State<Arc<ClientService>>,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Client>>)> {
    let client = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(client))))
}

pub async fn get_client(
    State(service): State<Arc<ClientService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Client>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn list_clients(
    State(service): State<Arc<ClientService>>,
    Query(filter): Query<ClientFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Client>>>> {
    let page = service.list(&filter, pagination.resolve()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn update_client(
    State(service): State<Arc<ClientService>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ClientPatch>,
) -> ApiResult<Json<ApiResponse<Client>>> {
    Ok(Json(ApiResponse::ok(service.update(id, patch).await?)))
}

pub async fn anonymize_client(
    State(service): State<Arc<ClientService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Client>>> {
    Ok(Json(ApiResponse::ok(service.anonymize(id).await?)))
}

pub async fn list_client_folders(
    State(service): State<Arc<ClientService>>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Folder>>>> {
    let page = service.folders(id, pagination.resolve()).await?;
    Ok(Json(ApiResponse::ok(page)))
}
