use std::path::Path;

use axum::{Router, handler::HandlerWithoutStateExt, middleware, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{self, AppState};
use crate::messages;
use crate::middleware::{AuthGate, derive_auth, derive_auth_bypassed};
use crate::pages;

/// Build the complete router: pages, the fragment API, static files from
/// `public_dir`, and a redirect to `/404` for everything else.
pub fn build_router(state: AppState, gate: AuthGate, public_dir: impl AsRef<Path>) -> Router {
    let assets = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(pages::redirect_not_found.into_service());

    let router = Router::new()
        .route("/", get(pages::index))
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/dashboard", get(pages::dashboard))
        .route("/api/messages", get(messages::list_messages))
        .route("/api/message/{id}", get(messages::get_message))
        .route("/logout", get(auth::logout))
        .route("/404", get(pages::not_found))
        .fallback_service(assets);

    let router = match gate {
        AuthGate::Enforce => {
            router.layer(middleware::from_fn_with_state(state.clone(), derive_auth))
        }
        AuthGate::Bypass => {
            warn!("Authentication gate is BYPASSED: protected routes are open to everyone");
            router.layer(middleware::from_fn_with_state(state.clone(), derive_auth_bypassed))
        }
    };

    router
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
