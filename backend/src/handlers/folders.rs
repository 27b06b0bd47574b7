use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::{Booking, BookingService};
use crate::error::ApiResult;
use crate::folder::{
    CreateFolderRequest, Folder, FolderFilter, FolderPatch, FolderService, SelectQuoteRequest,
};
use crate::models::{ApiResponse, PaginatedResponse, PaginationParams};
use crate::quote::{Quote, QuoteService};
use crate::top3::{Top3Selection, Top3Service};

pub async fn create_folder(
    State(service): State<Arc<FolderService>>,
    Json(request): Json<CreateFolderRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Folder>>)> {
    let folder = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(folder))))
}

pub async fn get_folder(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn list_folders(
    State(service): State<Arc<FolderService>>,
    Query(filter): Query<FolderFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Json<ApiResponse<PaginatedResponse<Folder>>>> {
    let page = service.list(&filter, pagination.resolve()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

pub async fn update_folder(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<FolderPatch>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    Ok(Json(ApiResponse::ok(service.update(id, patch).await?)))
}

pub async fn delete_folder(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    Ok(Json(ApiResponse::ok(service.delete(id).await?)))
}

pub async fn request_folder_quotes(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    Ok(Json(ApiResponse::ok(service.request_quotes(id).await?)))
}

pub async fn select_folder_quote(
    State(service): State<Arc<FolderService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectQuoteRequest>,
) -> ApiResult<Json<ApiResponse<Folder>>> {
    let folder = service.select_quote(id, request.quote_id).await?;
    Ok(Json(ApiResponse::ok(folder)))
}

pub async fn list_folder_quotes(
    State(service): State<Arc<QuoteService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Quote>>>> {
    Ok(Json(ApiResponse::ok(service.list_for_folder(id).await?)))
}

pub async fn build_folder_top3(
    State(service): State<Arc<Top3Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Top3Selection>>)> {
    let snapshot = service.build(id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(snapshot))))
}

pub async fn get_folder_top3(
    State(service): State<Arc<Top3Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Top3Selection>>> {
    Ok(Json(ApiResponse::ok(service.latest(id).await?)))
}

pub async fn list_folder_top3_history(
    State(service): State<Arc<Top3Service>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Top3Selection>>>> {
    Ok(Json(ApiResponse::ok(service.history(id).await?)))
}

pub async fn list_folder_bookings(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Booking>>>> {
    Ok(Json(ApiResponse::ok(service.list_for_folder(id).await?)))
}
