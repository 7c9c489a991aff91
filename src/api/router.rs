use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::auth;
use super::health;
use super::internal;
use super::middleware::{logging_middleware, metrics_middleware, security_headers_middleware};
use super::state::AppState;
use super::types::ApiError;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Account and session endpoints
        .nest("/api/v1/auth", auth::create_auth_router(state.clone()))
        // Service-to-service lookups
        .nest("/internal", internal::create_internal_router())
        .fallback(endpoint_not_found)
        .with_state(state)
        .layer(cors_layer())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Any origin may call the API; preflights are answered before routing
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::OPTIONS,
            Method::GET,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ])
}

async fn endpoint_not_found() -> ApiError {
    ApiError::not_found("Endpoint not found").with_code("not_found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::domain::token::TokenLifecycle;
    use crate::domain::user::MockUserRepository;
    use crate::infrastructure::auth::{SigningContext, TokenManager};
    use crate::infrastructure::user::{AccountService, Argon2Hasher, InMemoryUserRepository};

    fn token_manager() -> Arc<TokenManager> {
        let context = SigningContext::from_secs("router-test-secret", 900, 3600).unwrap();
        Arc::new(TokenManager::new(context))
    }

    fn test_app() -> Router {
        let tokens = token_manager();
        let accounts = AccountService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::new()),
            tokens.clone(),
        );
        create_router(AppState::new(Arc::new(accounts), tokens))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    async fn register_alice(app: &Router) -> Value {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "a@x.com", "username": "alice", "password": "secret1"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = test_app();

        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"][0]["name"], "user_store");

        let (status, _) = send(&app, Method::GET, "/live", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_reports_store_failure() {
        let tokens = token_manager();
        let repository = Arc::new(MockUserRepository::new());
        repository.set_should_fail(true).await;
        let accounts = AccountService::new(repository, Arc::new(Argon2Hasher::new()), tokens.clone());
        let app = create_router(AppState::new(Arc::new(accounts), tokens));

        let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_register_and_duplicate() {
        let app = test_app();

        let body = register_alice(&app).await;
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["username"], "alice");
        assert!(body["user"].get("password_hash").is_none());
        assert_eq!(body["tokens"]["expires_in"], 900);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "a@x.com", "username": "alice2", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict_error");
    }

    #[tokio::test]
    async fn test_register_validation_error() {
        let app = test_app();

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "a@x.com", "username": "alice", "password": "123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_login() {
        let app = test_app();
        register_alice(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tokens"]["access_token"].is_string());

        for credentials in [
            json!({"email": "a@x.com", "password": "wrong-password"}),
            json!({"email": "nobody@x.com", "password": "secret1"}),
        ] {
            let (status, body) =
                send(&app, Method::POST, "/api/v1/auth/login", None, Some(credentials)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], "invalid_credentials");
        }
    }

    #[tokio::test]
    async fn test_refresh() {
        let app = test_app();
        let registered = register_alice(&app).await;
        let refresh_token = registered["tokens"]["refresh_token"].as_str().unwrap();
        let access_token = registered["tokens"]["access_token"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": refresh_token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tokens"]["access_token"].is_string());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({"refresh_token": access_token})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "wrong_token_type");
    }

    #[tokio::test]
    async fn test_profile_requires_access_token() {
        let app = test_app();
        let registered = register_alice(&app).await;
        let access_token = registered["tokens"]["access_token"].as_str().unwrap();
        let refresh_token = registered["tokens"]["refresh_token"].as_str().unwrap();

        let (status, _) = send(&app, Method::GET, "/api/v1/auth/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(&app, Method::GET, "/api/v1/auth/profile", Some(refresh_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&app, Method::GET, "/api/v1/auth/profile", Some(access_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let app = test_app();
        let registered = register_alice(&app).await;
        let access_token = registered["tokens"]["access_token"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/v1/auth/profile",
            Some(access_token),
            Some(json!({"username": "alice_new"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice_new");
        assert_eq!(body["user"]["email"], "a@x.com");
    }

    #[tokio::test]
    async fn test_link_and_lookup_external_identity() {
        let app = test_app();
        let registered = register_alice(&app).await;
        let access_token = registered["tokens"]["access_token"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/external",
            Some(access_token),
            Some(json!({"external_id": 987654321})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["external_id"], 987654321);

        let (status, body) =
            send(&app, Method::GET, "/internal/users/external/987654321", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "alice");

        let (status, _) = send(&app, Method::GET, "/internal/users/external/1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_external_identity_conflict() {
        let app = test_app();
        let alice = register_alice(&app).await;
        let (_, bob) = send(
            &app,
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "b@x.com", "username": "bob", "password": "secret2"})),
        )
        .await;

        let link = |token: String| {
            let app = app.clone();
            async move {
                send(
                    &app,
                    Method::POST,
                    "/api/v1/auth/external",
                    Some(&token),
                    Some(json!({"external_id": 42})),
                )
                .await
                .0
            }
        };

        let alice_token = alice["tokens"]["access_token"].as_str().unwrap().to_string();
        let bob_token = bob["tokens"]["access_token"].as_str().unwrap().to_string();

        assert_eq!(link(alice_token).await, StatusCode::OK);
        assert_eq!(link(bob_token).await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_session_uses_optional_gate() {
        let app = test_app();
        let registered = register_alice(&app).await;
        let access_token = registered["tokens"]["access_token"].as_str().unwrap();

        let (status, body) = send(&app, Method::GET, "/api/v1/auth/session", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"authenticated": false}));

        let (status, body) =
            send(&app, Method::GET, "/api/v1/auth/session", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], false);

        let (status, body) =
            send(&app, Method::GET, "/api/v1/auth/session", Some(access_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user_id"], registered["user"]["id"]);
    }

    #[tokio::test]
    async fn test_security_and_request_id_headers() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["cache-control"], "no-store");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_tokens_from_router_validate_with_manager() {
        let tokens = token_manager();
        let accounts = AccountService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(Argon2Hasher::new()),
            tokens.clone(),
        );
        let app = create_router(AppState::new(Arc::new(accounts), tokens.clone()));

        let body = register_alice(&app).await;
        let claims = tokens
            .validate_access(body["tokens"]["access_token"].as_str().unwrap())
            .unwrap();

        assert_eq!(claims.username, "alice");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/v1/auth/login")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("PATCH"));

        let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed.contains("authorization"));
        assert!(allowed.contains("content-type"));
    }

    #[tokio::test]
    async fn test_cors_headers_on_simple_request() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_unknown_endpoint_returns_error_envelope() {
        let app = test_app();

        for uri in ["/nope", "/api/v1/auth/nope", "/internal/nope"] {
            let (status, body) = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body["error"]["type"], "not_found_error");
            assert_eq!(body["error"]["code"], "not_found");
            assert_eq!(body["error"]["message"], "Endpoint not found");
        }
    }
}
