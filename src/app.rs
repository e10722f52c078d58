use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, pages};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api",
              Router::new()
                  .merge(auth::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .merge(pages::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_with_headers(app, method, uri, body, &[]).await
    }

    async fn send_with_headers(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(header::HeaderName, String)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let req = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn signup(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/signup",
            Some(json!({ "fullname": "A", "email": email, "password": password })),
        )
        .await
    }

    async fn user_count(app: &Router) -> u64 {
        let (status, body) = send(app, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        body["totalUsers"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn signup_then_duplicate_signup() {
        let app = build_app(AppState::fake());
        assert_eq!(user_count(&app).await, 0);

        let (status, body) = signup(&app, "a@b.com", "secret").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@b.com");
        assert_eq!(body["user"]["id"], 1);
        assert!(body["user"].get("password").is_none());
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(user_count(&app).await, 1);

        let (status, body) = signup(&app, "a@b.com", "another").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["userExists"], true);
        assert_eq!(user_count(&app).await, 1);
    }

    #[tokio::test]
    async fn signup_validation_errors() {
        let app = build_app(AppState::fake());

        let (status, body) = send(&app, Method::POST, "/api/signup", Some(json!({ "email": "a@b.com" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, _) = signup(&app, "a@b", "secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = signup(&app, "a@b.com", "short").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(user_count(&app).await, 0);
    }

    #[tokio::test]
    async fn login_outcomes() {
        let app = build_app(AppState::fake());
        signup(&app, "a@b.com", "secret").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/login",
            Some(json!({ "email": "nobody@b.com", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["userExists"], false);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/login",
            Some(json!({ "email": "a@b.com", "password": "wrong!" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["userExists"], true);

        let (status, _) = send(&app, Method::POST, "/api/login", Some(json!({ "email": "a@b.com" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/login",
            Some(json!({ "email": "a@b.com", "password": "secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["fullname"], "A");
    }

    #[tokio::test]
    async fn check_email_reports_existence() {
        let app = build_app(AppState::fake());
        signup(&app, "a@b.com", "secret").await;

        let (status, body) = send(&app, Method::POST, "/api/check-email", Some(json!({ "email": "a@b.com" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], true);

        let (status, body) = send(&app, Method::POST, "/api/check-email", Some(json!({ "email": "c@d.com" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["exists"], false);

        let (status, _) = send(&app, Method::POST, "/api/check-email", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_token_flow() {
        let app = build_app(AppState::fake());
        let (_, body) = signup(&app, "a@b.com", "secret").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::POST, "/api/verify-token", Some(json!({ "token": token }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["user"]["email"], "a@b.com");

        let (status, body) = send(&app, Method::POST, "/api/verify-token", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);

        let (status, malformed) =
            send(&app, Method::POST, "/api/verify-token", Some(json!({ "token": "@@not-base64@@" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let stranger = crate::auth::token::TokenCodec::new(&crate::config::AppConfig::default().token)
            .issue("ghost@b.com");
        let (status, unknown) =
            send(&app, Method::POST, "/api/verify-token", Some(json!({ "token": stranger }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(malformed["message"], unknown["message"]);
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let app = build_app(AppState::fake());
        let (_, body) = signup(&app, "a@b.com", "secret").await;
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send_with_headers(
            &app,
            Method::GET,
            "/api/me",
            None,
            &[(header::AUTHORIZATION, format!("Bearer {token}"))],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@b.com");

        let (status, _) = send(&app, Method::GET, "/api/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn pages_and_health_are_served() {
        let app = build_app(AppState::fake());
        for path in ["/", "/login", "/signup", "/dashboard", "/api/health"] {
            let req = Request::builder().uri(path).body(Body::empty()).unwrap();
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn unreadable_bodies_get_json_errors() {
        let app = build_app(AppState::fake());

        let (status, body) = send(&app, Method::POST, "/api/signup", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, body) = send(&app, Method::POST, "/api/signup", Some(json!({ "email": 5 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, body) = send(&app, Method::POST, "/api/login", Some(json!({ "password": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/check-email")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).expect("json error body");
        assert_eq!(body["error"], "VALIDATION_ERROR");

        assert_eq!(user_count(&app).await, 0);
    }

    #[tokio::test]
    async fn verify_token_without_readable_body_is_unauthorized() {
        let app = build_app(AppState::fake());

        let (status, body) = send(&app, Method::POST, "/api/verify-token", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);

        let (status, body) =
            send(&app, Method::POST, "/api/verify-token", Some(json!({ "token": 42 }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn legacy_token_goes_stale_after_issuance_millisecond() {
        use crate::auth::repo::InMemoryUserRepository;
        use crate::config::{TokenConfig, TokenFormat};
        use std::sync::Arc;

        let config = AppConfig {
            token: TokenConfig {
                format: TokenFormat::Legacy,
                ttl_minutes: 60,
            },
            ..AppConfig::default()
        };
        let app = build_app(AppState::from_parts(
            Arc::new(config),
            Arc::new(InMemoryUserRepository::new()),
        ));

        let (status, body) = signup(&app, "a@b.com", "secret").await;
        assert_eq!(status, StatusCode::CREATED);
        let token = body["token"].as_str().unwrap().to_string();

        // Verification in a later millisecond keeps the timestamp in the claim.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (status, body) =
            send(&app, Method::POST, "/api/verify-token", Some(json!({ "token": token }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Invalid token: user not found");
    }
}
