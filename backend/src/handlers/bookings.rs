use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::booking::{Booking, BookingService, CreateBookingRequest};
use crate::error::ApiResult;
use crate::models::ApiResponse;

pub async fn create_booking(
    State(service): State<Arc<BookingService>>,
    Json(request): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Booking>>)> {
    let booking = service.create(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(booking))))
}

pub async fn get_booking(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

pub async fn confirm_booking(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    Ok(Json(ApiResponse::ok(service.confirm(id).await?)))
}

pub async fn exchange_booking_contacts(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    Ok(Json(ApiResponse::ok(service.exchange_contacts(id).await?)))
}

pub async fn complete_booking(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    Ok(Json(ApiResponse::ok(service.complete(id).await?)))
}

pub async fn cancel_booking(
    State(service): State<Arc<BookingService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Booking>>> {
    Ok(Json(ApiResponse::ok(service.cancel(id).await?)))
}
