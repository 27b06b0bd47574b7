use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::ApiResponse;
use crate::payment::{CreatePaymentRequest, Payment, PaymentOutcomeRequest, PaymentService};

pub async fn create_payment(
    State(service): State<Arc<PaymentService>>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    let payment = service.create(booking_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payment))))
}

pub async fn list_booking_payments(
    State(service): State<Arc<PaymentService>>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<Payment>>>> {
    Ok(Json(ApiResponse::ok(service.list_for_booking(booking_id).await?)))
}

pub async fn get_payment(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    Ok(Json(ApiResponse::ok(service.get(id).await?)))
}

/// Processor callback for a pending payment
pub async fn record_payment_outcome(
    State(service): State<Arc<PaymentService>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentOutcomeRequest>,
) -> ApiResult<Json<ApiResponse<Payment>>> {
    Ok(Json(ApiResponse::ok(service.record_outcome(id, request).await?)))
}
