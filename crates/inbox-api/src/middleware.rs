use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use inbox_types::api::UserProfile;

use crate::auth::AppState;
use crate::session::{Jar, SESSION_COOKIE};

/// How protected routes treat unauthenticated requests. Chosen once, when the
/// router is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthGate {
    #[default]
    Enforce,
    /// Every request counts as authenticated. Local development only.
    Bypass,
}

/// Per-request authentication facts, inserted as a request extension.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    /// Verified session token from the cookie, if any.
    pub session_id: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
}

async fn lookup(state: &AppState, jar: &Jar) -> AuthState {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    let user = match &session_id {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    AuthState {
        is_authenticated: user.is_some(),
        session_id,
        user,
    }
}

/// Derive the authentication flag from the session. Never blocks a request;
/// handlers decide what to do with an unauthenticated one.
pub async fn derive_auth(
    State(state): State<AppState>,
    jar: Jar,
    mut req: Request,
    next: Next,
) -> Response {
    let auth = lookup(&state, &jar).await;
    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// Same as `derive_auth`, but marks every request authenticated.
pub async fn derive_auth_bypassed(
    State(state): State<AppState>,
    jar: Jar,
    mut req: Request,
    next: Next,
) -> Response {
    let mut auth = lookup(&state, &jar).await;
    auth.is_authenticated = true;
    req.extensions_mut().insert(auth);
    next.run(req).await
}
