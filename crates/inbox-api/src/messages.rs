use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::debug;

use inbox_db::{StoreError, load_message, load_messages, resolve_receiver};

use crate::auth::{AppState, AppStateInner};
use crate::middleware::AuthState;
use crate::pages::found;
use crate::render;

/// Which receiver's inbox this request may read. A logged-in user maps
/// through their email; a bypassed gate with nobody logged in falls back to
/// the configured development receiver.
async fn receiver_for(state: &AppStateInner, auth: &AuthState) -> Result<Option<i64>, StoreError> {
    match &auth.user {
        Some(user) => match user.email.as_deref() {
            Some(email) => resolve_receiver(state.store.as_ref(), email).await,
            None => Ok(None),
        },
        None => Ok(Some(state.dev_receiver_id)),
    }
}

fn message_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Message not found").into_response()
}

/// GET /api/messages: The inbox as concatenated HTML fragments.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
) -> Response {
    if !auth.is_authenticated {
        return found("/");
    }

    let receiver_id = match receiver_for(&state, &auth).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            debug!("No receiver for this user; showing an empty inbox");
            return Html(String::new()).into_response();
        }
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error loading messages").into_response();
        }
    };

    match load_messages(state.store.as_ref(), receiver_id).await {
        Ok(messages) => Html(render::message_list(&messages)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Error loading messages").into_response(),
    }
}

/// GET /api/message/{id}: One message body in a preformatted block.
pub async fn get_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthState>,
    Path(raw_id): Path<String>,
) -> Response {
    if !auth.is_authenticated {
        return found("/");
    }

    let Ok(message_id) = raw_id.parse::<i64>() else {
        return message_not_found();
    };

    let receiver_id = match receiver_for(&state, &auth).await {
        Ok(Some(id)) => id,
        Ok(None) => return message_not_found(),
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error loading message").into_response();
        }
    };

    match load_message(state.store.as_ref(), message_id, receiver_id).await {
        Ok(Some(message)) => Html(render::message_detail(&message)).into_response(),
        Ok(None) => message_not_found(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Error loading message").into_response(),
    }
}
