use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::actor::{ActorDirectory, RegisterUserRequest, User};
use crate::error::ApiResult;
use crate::middleware::Actor;
use crate::models::ApiResponse;

pub async fn register_user(
    State(actors): State<Arc<ActorDirectory>>,
    actor: Actor,
    Json(request): Json<RegisterUserRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<User>>)> {
    let user = actors.register(actor.id(), request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
}
