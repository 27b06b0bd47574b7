//! HTTP surface tests against the in-memory engine

mod common;

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use movebroker_server::middleware::ACTOR_HEADER;
    use movebroker_server::routes::app_router;

    use super::common::*;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_in_memory_store() {
        let app = app_router(engine().await);
        let (status, body) = send(
            &app,
            Request::builder().uri("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "in-memory");
    }

    #[tokio::test]
    async fn test_create_client_returns_created() {
        let app = app_router(engine().await);
        let (status, body) = send(
            &app,
            post_json(
                "/api/clients",
                json!({
                    "first_name": "Camille",
                    "last_name": "Martin",
                    "email": "Camille@Example.test"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["email"], "camille@example.test");

        let (status, body) = send(
            &app,
            post_json(
                "/api/clients",
                json!({
                    "first_name": "Other",
                    "last_name": "Person",
                    "email": "camille@example.test"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_quote_review_needs_actor_header() {
        let state = engine().await;
        let f = folder(&state).await;
        let m = mover(&state, 1).await;
        let q = quote(&state, f.id, m.id, "720.00").await;
        let app = app_router(state);
        let uri = format!("/api/quotes/{}/validate", q.id);

        let (status, body) = send(&app, post_json(&uri, json!({ "approved": true }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let mut request = post_json(&uri, json!({ "approved": true }));
        request
            .headers_mut()
            .insert(ACTOR_HEADER, OPERATOR.parse().unwrap());
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "validated");
        assert_eq!(body["data"]["validated_by"], OPERATOR);
    }

    #[tokio::test]
    async fn test_user_registration_is_admin_only() {
        let app = app_router(engine().await);
        let new_user = || {
            post_json(
                "/api/users",
                json!({
                    "id": "intruder",
                    "email": "intruder@example.test",
                    "role": "admin"
                }),
            )
        };

        let (status, _) = send(&app, new_user()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut request = new_user();
        request
            .headers_mut()
            .insert(ACTOR_HEADER, OPERATOR.parse().unwrap());
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let mut request = new_user();
        request.headers_mut().insert(ACTOR_HEADER, ADMIN.parse().unwrap());
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_unknown_resources_are_not_found() {
        let app = app_router(engine().await);

        let (status, body) = send(
            &app,
            Request::builder()
                .uri(format!("/api/quotes/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send(
            &app,
            Request::builder()
                .uri("/api/nowhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shortlist_over_http() {
        let state = engine().await;
        let f = folder(&state).await;
        ranked_quote(&state, f.id, 1, "900.00", ("90", "80", "85")).await;
        ranked_quote(&state, f.id, 2, "950.00", ("85", "85", "80")).await;
        let app = app_router(state.clone());

        let uri = format!("/api/folders/{}/top3", f.id);
        let (status, body) = send(&app, post_json(&uri, json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], Value::Null);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        ranked_quote(&state, f.id, 3, "990.00", ("70", "90", "90")).await;
        let (status, body) = send(&app, post_json(&uri, json!({}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);

        let (status, body) = send(
            &app,
            Request::builder().uri(&uri).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["folder_id"], f.id.to_string());
    }
}
