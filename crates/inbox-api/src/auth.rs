use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension,
    extract::{FromRef, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use oauth2::AuthorizationCode;
use tracing::{info, warn};

use inbox_db::MessageStore;
use inbox_types::api::{CallbackQuery, UserProfile};

use crate::middleware::AuthState;
use crate::oauth::{IdentityProvider, OAuthError};
use crate::pages::found;
use crate::session::{CookieKey, Jar, SESSION_COOKIE, SessionStore, build_cookie, removal_cookie};

pub const OAUTH_STATE_COOKIE: &str = "oauth2-redirect-state";
const OAUTH_STATE_MAX_AGE: Duration = Duration::from_secs(10 * 60);

pub type AppState = Arc<AppStateInner>;

/// Process-wide handles, built once at startup and read-only afterwards.
pub struct AppStateInner {
    pub store: Arc<dyn MessageStore>,
    pub provider: Arc<dyn IdentityProvider>,
    pub sessions: Arc<SessionStore>,
    pub cookie_key: CookieKey,
    pub cookie_secure: bool,
    /// Inbox shown when the auth gate is bypassed and nobody is logged in.
    pub dev_receiver_id: i64,
}

impl FromRef<AppState> for CookieKey {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// GET /auth/login: Start the authorization-code flow.
pub async fn login(State(state): State<AppState>, jar: Jar) -> Response {
    let (url, csrf) = state.provider.authorize_url();

    let cookie = build_cookie(
        OAUTH_STATE_COOKIE,
        csrf.secret().clone(),
        OAUTH_STATE_MAX_AGE,
        state.cookie_secure,
    );
    (jar.add(cookie), found(url.as_str())).into_response()
}

/// GET /auth/callback: Exchange the code, fetch the profile, open a session.
pub async fn callback(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    jar: Jar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    let jar = jar.remove(removal_cookie(OAUTH_STATE_COOKIE));

    let profile = match complete_login(&state, expected_state, query).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("OAuth callback failed: {}", e);
            return (jar, found("/?error=auth")).into_response();
        }
    };

    // Never carry a pre-login session over into the authenticated one.
    if let Some(old) = auth.session_id {
        state.sessions.destroy(&old).await;
    }

    info!("User {} signed in", profile.display_name());
    let session_id = state.sessions.create(profile).await;
    let cookie = build_cookie(
        SESSION_COOKIE,
        session_id,
        state.sessions.max_age(),
        state.cookie_secure,
    );

    (jar.add(cookie), found("/dashboard")).into_response()
}

async fn complete_login(
    state: &AppState,
    expected_state: Option<String>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<UserProfile, OAuthError> {
    let Query(query) = query?;
    if let Some(error) = query.error {
        return Err(OAuthError::Denied(error));
    }
    let code = query.code.ok_or(OAuthError::MissingCode)?;

    match (expected_state, query.state) {
        (Some(expected), Some(got)) if expected == got => {}
        _ => return Err(OAuthError::StateMismatch),
    }

    let token = state
        .provider
        .exchange_code(AuthorizationCode::new(code))
        .await?;
    state.provider.fetch_profile(&token).await
}

/// GET /logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    jar: Jar,
) -> Response {
    if let Some(id) = auth.session_id {
        if state.sessions.destroy(&id).await {
            info!("Session closed");
        }
    }

    (jar.remove(removal_cookie(SESSION_COOKIE)), found("/")).into_response()
}
