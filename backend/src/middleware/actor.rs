//! Caller identity extraction
//!
//! The engine trusts an upstream gateway for authentication and receives the
//! actor id as an opaque `X-Actor-Id` header; roles are resolved by the
//! services through the actor directory.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::ApiError;

/// Header carrying the caller's actor id
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Actor id of the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("X-Actor-Id header required".to_string()))?;

        Ok(Actor(actor.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Actor, ApiError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_actor_read_from_header() {
        let request = Request::builder()
            .header("X-Actor-Id", " ops-1 ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().id(), "ops-1");
    }

    #[tokio::test]
    async fn test_missing_actor_is_unauthorized() {
        let err = extract(Request::builder().body(()).unwrap()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let blank = Request::builder().header("X-Actor-Id", "  ").body(()).unwrap();
        assert!(extract(blank).await.is_err());
    }
}
