use async_trait::async_trait;
use axum::extract::rejection::QueryRejection;
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::url::{self, Url};
use oauth2::{
    AccessToken, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, HttpClientError, RedirectUrl, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use reqwest::header::ACCEPT;
use thiserror::Error;
use tracing::debug;

use inbox_types::api::UserProfile;

pub const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
pub const SCOPES: &[&str] = &["profile", "email"];

/// Failure of the code-for-token exchange.
pub type TokenError = RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>;

type GoogleClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token exchange failed: {0}")]
    Token(#[from] TokenError),

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider responded with {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed callback query: {0}")]
    MalformedCallback(#[from] QueryRejection),

    #[error("authorization denied by provider: {0}")]
    Denied(String),

    #[error("callback is missing the authorization code")]
    MissingCode,

    #[error("state parameter missing or mismatched")]
    StateMismatch,

    #[error("invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The parts of an OAuth identity provider the login flow talks to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start the authorization-code flow, and
    /// the CSRF token the callback must echo back as `state`.
    fn authorize_url(&self) -> (Url, CsrfToken);

    async fn exchange_code(&self, code: AuthorizationCode) -> Result<AccessToken, OAuthError>;

    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, OAuthError>;
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize: String,
    pub token: String,
    pub userinfo: String,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            authorize: GOOGLE_AUTHORIZE_URL.into(),
            token: GOOGLE_TOKEN_URL.into(),
            userinfo: GOOGLE_USERINFO_URL.into(),
        }
    }
}

/// Google sign-in: the code flow runs through `oauth2`, the profile comes
/// from the user-info endpoint.
pub struct GoogleProvider {
    /// Must not follow redirects; the token request carries the client secret.
    http: reqwest::Client,
    client: GoogleClient,
    userinfo: Url,
}

impl GoogleProvider {
    pub fn new(http: reqwest::Client, credentials: OAuthCredentials) -> Result<Self, OAuthError> {
        Self::with_endpoints(http, credentials, ProviderEndpoints::google())
    }

    pub fn with_endpoints(
        http: reqwest::Client,
        credentials: OAuthCredentials,
        endpoints: ProviderEndpoints,
    ) -> Result<Self, OAuthError> {
        // Google takes the client credentials in the form body.
        let client = BasicClient::new(ClientId::new(credentials.client_id))
            .set_client_secret(ClientSecret::new(credentials.client_secret))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(AuthUrl::new(endpoints.authorize)?)
            .set_token_uri(TokenUrl::new(endpoints.token)?)
            .set_redirect_uri(RedirectUrl::new(credentials.callback_url)?);

        Ok(Self {
            http,
            client,
            userinfo: Url::parse(&endpoints.userinfo)?,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self) -> (Url, CsrfToken) {
        SCOPES
            .iter()
            .fold(
                self.client.authorize_url(CsrfToken::new_random),
                |request, scope| request.add_scope(Scope::new(scope.to_string())),
            )
            .url()
    }

    async fn exchange_code(&self, code: AuthorizationCode) -> Result<AccessToken, OAuthError> {
        debug!("Exchanging authorization code");

        let token = self
            .client
            .exchange_code(code)
            .request_async(&self.http)
            .await?;

        Ok(token.access_token().clone())
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, OAuthError> {
        let response = self
            .http
            .get(self.userinfo.as_str())
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        Form, Json, Router,
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::{get, post},
    };
    use oauth2::basic::BasicErrorResponseType;
    use serde_json::json;

    use super::*;

    async fn token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
        let valid = form.get("grant_type").map(String::as_str) == Some("authorization_code")
            && form.get("client_id").map(String::as_str) == Some("client-1")
            && form.get("client_secret").map(String::as_str) == Some("shh")
            && form.get("redirect_uri").map(String::as_str) == Some("http://app/auth/callback");

        match form.get("code").map(String::as_str) {
            Some("good") if valid => Json(json!({
                "access_token": "at-123",
                "token_type": "Bearer",
                "expires_in": 3599
            }))
            .into_response(),
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_grant" })),
            )
                .into_response(),
        }
    }

    async fn userinfo(headers: HeaderMap) -> impl IntoResponse {
        match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some("Bearer at-123") => Json(json!({
                "sub": "1001",
                "name": "Ada Lovelace",
                "email": "ada@example.com"
            }))
            .into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    async fn spawn_provider() -> GoogleProvider {
        let app = Router::new()
            .route("/token", post(token))
            .route("/userinfo", get(userinfo));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        GoogleProvider::with_endpoints(
            reqwest::Client::new(),
            credentials(),
            ProviderEndpoints {
                authorize: format!("http://{addr}/authorize"),
                token: format!("http://{addr}/token"),
                userinfo: format!("http://{addr}/userinfo"),
            },
        )
        .unwrap()
    }

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "client-1".into(),
            client_secret: "shh".into(),
            callback_url: "http://app/auth/callback".into(),
        }
    }

    #[test]
    fn authorize_url_carries_client_and_state() {
        let provider = GoogleProvider::new(reqwest::Client::new(), credentials()).unwrap();
        let (url, csrf) = provider.authorize_url();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-1");
        assert_eq!(params["redirect_uri"], "http://app/auth/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "profile email");
        assert_eq!(&params["state"], csrf.secret());
        assert!(!params.contains_key("client_secret"));
    }

    #[test]
    fn every_login_gets_a_fresh_state() {
        let provider = GoogleProvider::new(reqwest::Client::new(), credentials()).unwrap();
        let (_, a) = provider.authorize_url();
        let (_, b) = provider.authorize_url();
        assert_ne!(a.secret(), b.secret());
    }

    #[test]
    fn bad_callback_url_is_rejected_up_front() {
        let mut credentials = credentials();
        credentials.callback_url = "not a url".into();
        assert!(matches!(
            GoogleProvider::new(reqwest::Client::new(), credentials),
            Err(OAuthError::Url(_))
        ));
    }

    #[tokio::test]
    async fn code_exchange_then_profile() {
        let provider = spawn_provider().await;

        let token = provider
            .exchange_code(AuthorizationCode::new("good".into()))
            .await
            .unwrap();
        assert_eq!(token.secret(), "at-123");

        let profile = provider.fetch_profile(&token).await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn rejected_code_is_a_token_error() {
        let provider = spawn_provider().await;
        let err = provider
            .exchange_code(AuthorizationCode::new("bad".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OAuthError::Token(RequestTokenError::ServerResponse(ref e))
                if *e.error() == BasicErrorResponseType::InvalidGrant
        ));
    }

    #[tokio::test]
    async fn bad_token_cannot_fetch_profile() {
        let provider = spawn_provider().await;
        let err = provider
            .fetch_profile(&AccessToken::new("stolen".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::Provider { status: 401, .. }));
    }
}
