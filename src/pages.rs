use axum::{response::Html, routing::get, Router};

use crate::state::AppState;

const INDEX: &str = include_str!("../static/index.html");
const LOGIN: &str = include_str!("../static/login.html");
const SIGNUP: &str = include_str!("../static/signup.html");
const DASHBOARD: &str = include_str!("../static/dashboard.html");

/// Browser pages. They talk to the JSON API under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Html(INDEX) }))
        .route("/login", get(|| async { Html(LOGIN) }))
        .route("/signup", get(|| async { Html(SIGNUP) }))
        .route("/dashboard", get(|| async { Html(DASHBOARD) }))
}
