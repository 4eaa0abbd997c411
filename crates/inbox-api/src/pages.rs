use axum::{
    Extension,
    extract::Query,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::middleware::AuthState;
use crate::render;

/// 302 Found. Protected routes redirect with this rather than answering
/// 401/403.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub error: Option<String>,
}

/// GET /: Login/home page.
pub async fn index(Query(query): Query<IndexQuery>) -> Html<String> {
    Html(render::index_page(query.error.is_some()))
}

/// GET /dashboard
pub async fn dashboard(Extension(auth): Extension<AuthState>) -> Response {
    if !auth.is_authenticated {
        return found("/");
    }

    Html(render::dashboard_page(auth.user.as_ref())).into_response()
}

/// GET /404
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(render::not_found_page()))
}

/// Anything no route or static file matched.
pub async fn redirect_not_found() -> Response {
    found("/404")
}
