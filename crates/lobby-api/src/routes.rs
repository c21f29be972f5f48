use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::messages;
use crate::middleware::require_auth;

/// The full HTTP surface: login is public, everything else needs a token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/send", post(messages::send_message))
        .route("/messages", get(messages::get_messages))
        .route("/active_users", get(messages::active_users))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use lobby_gateway::{Chat, chat::DEFAULT_INACTIVITY};
    use lobby_store::MessageLog;

    use super::*;
    use crate::auth::AppStateInner;

    fn app() -> Router {
        let path = std::env::temp_dir()
            .join(format!("lobby-missing-{}", Uuid::new_v4()))
            .join("history.json");
        let chat = Chat::new(MessageLog::load_or_empty(path), DEFAULT_INACTIVITY);
        router(Arc::new(AppStateInner {
            chat,
            jwt_secret: "test-secret".into(),
        }))
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn login(app: &Router, name: &str) -> String {
        let req = post_json("/login", None, json!({ "username": name }));
        let (status, body) = call(app, req).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn send(app: &Router, token: &str, content: &str) -> (StatusCode, Value) {
        call(app, post_json("/send", Some(token), json!({ "content": content }))).await
    }

    fn lines(body: &Value) -> Vec<&str> {
        body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m.as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn login_send_and_first_load() {
        let app = app();
        let alice = login(&app, "alice").await;

        let (status, body) = send(&app, &alice, "hi").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let bob = login(&app, "bob").await;
        let (status, body) = call(&app, get("/messages?first_load=true", Some(&bob))).await;
        assert_eq!(status, StatusCode::OK);

        let messages = lines(&body);
        assert_eq!(messages.len(), 3);
        assert!(messages[0].ends_with("System: alice joined the chat"));
        assert!(messages[1].ends_with("alice: hi"));
        assert!(messages[2].ends_with("System: bob joined the chat"));
        assert_eq!(body["users"], json!(["alice", "bob"]));
        assert!(body.get("cursor").is_none());
    }

    #[tokio::test]
    async fn incremental_poll_then_empty() {
        let app = app();
        let alice = login(&app, "alice").await;

        let (_, body) = call(&app, get("/messages", Some(&alice))).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);

        let (status, body) = call(&app, get("/messages", Some(&alice))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"], json!([]));
        assert_eq!(body["users"], json!(["alice"]));
    }

    #[tokio::test]
    async fn cursor_poll_returns_next_position() {
        let app = app();
        let alice = login(&app, "alice").await;
        send(&app, &alice, "one").await;

        let (status, body) = call(&app, get("/messages?after=1", Some(&alice))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["cursor"], 2);
    }

    #[tokio::test]
    async fn first_load_limit_returns_latest_messages() {
        let app = app();
        let alice = login(&app, "alice").await;
        send(&app, &alice, "one").await;
        send(&app, &alice, "two").await;

        let req = get("/messages?first_load=true&limit=1", Some(&alice));
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let messages = lines(&body);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].ends_with("alice: two"));

        // Without first_load the limit is ignored and the pending buffer drains
        let (_, body) = call(&app, get("/messages?limit=1", Some(&alice))).await;
        assert_eq!(lines(&body).len(), 3);
    }

    #[tokio::test]
    async fn rejects_missing_or_bad_tokens() {
        let app = app();

        let (status, body) = call(&app, get("/messages", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Not logged in");

        let (status, _) = call(&app, get("/active_users", Some("not-a-jwt"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_blank_input() {
        let app = app();

        let req = post_json("/login", None, json!({ "username": "  " }));
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Empty name");

        let alice = login(&app, "alice").await;
        let (status, body) = send(&app, &alice, "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Empty message");
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let app = app();
        let alice = login(&app, "alice").await;
        let bob = login(&app, "bob").await;

        let (status, _) = call(&app, post_json("/logout", Some(&alice), json!({}))).await;
        assert_eq!(status, StatusCode::OK);

        // A poll with the old token must not bring alice back
        let (status, body) = call(&app, get("/messages", Some(&alice))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not logged in");

        let (_, body) = call(&app, get("/active_users", Some(&bob))).await;
        assert_eq!(body["users"], json!(["bob"]));

        let (status, _) = send(&app, &alice, "hello?").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = call(&app, post_json("/logout", Some(&alice), json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Logging in again issues a working token
        let alice = login(&app, "alice").await;
        let (status, _) = send(&app, &alice, "back").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_signed_token_without_session() {
        let app = app();
        login(&app, "alice").await;

        let forged = crate::auth::create_token("test-secret", Uuid::new_v4(), "alice").unwrap();
        let (status, _) = call(&app, get("/active_users", Some(&forged))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app();
        let resp = app.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
