//! Server-side sessions keyed by a signed cookie token.
//!
//! A session only exists once something is written to it (a successful
//! login), and it expires `max_age` after creation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::RwLock;
use tracing::{debug, info};

use inbox_types::api::UserProfile;

pub const SESSION_COOKIE: &str = "sessionId";
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest secret a cookie key may be derived from.
pub const MIN_SECRET_LEN: usize = 32;

/// Cookie jar whose cookies are signed with the app's [`CookieKey`].
pub type Jar = SignedCookieJar<CookieKey>;

struct SessionRecord {
    user: UserProfile,
    expires_at: Instant,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Start a session for `user` and return its token.
    pub async fn create(&self, user: UserProfile) -> String {
        let id = random_token();
        let record = SessionRecord {
            user,
            expires_at: Instant::now() + self.max_age,
        };
        self.sessions.write().await.insert(id.clone(), record);
        debug!("Session created");
        id
    }

    pub async fn get(&self, id: &str) -> Option<UserProfile> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|record| Instant::now() < record.expires_at)
            .map(|record| record.user.clone())
    }

    /// Returns whether a session was removed.
    pub async fn destroy(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| now < record.expires_at);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Background task that drops expired sessions.
pub async fn run_purge_loop(sessions: Arc<SessionStore>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let count = sessions.purge_expired().await;
        if count > 0 {
            info!("Session purge: dropped {} expired sessions", count);
        }
    }
}

/// 32 random bytes, URL-safe base64.
pub fn random_token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Signing key for every cookie the app sets, derived from the session secret.
#[derive(Clone)]
pub struct CookieKey(Key);

impl CookieKey {
    /// `None` when the secret is shorter than [`MIN_SECRET_LEN`].
    pub fn derive(secret: &[u8]) -> Option<Self> {
        (secret.len() >= MIN_SECRET_LEN).then(|| Self(Key::derive_from(secret)))
    }
}

impl From<CookieKey> for Key {
    fn from(key: CookieKey) -> Self {
        key.0
    }
}

/// Cookie attributes shared by every cookie the app sets.
pub fn build_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, header};
    use axum::response::IntoResponse;

    use super::*;

    fn user(sub: &str) -> UserProfile {
        UserProfile {
            sub: sub.to_string(),
            name: Some("Ada".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_get_destroy() {
        let store = SessionStore::new(SESSION_MAX_AGE);
        let id = store.create(user("1")).await;

        assert_eq!(store.get(&id).await.map(|u| u.sub), Some("1".to_string()));
        assert!(store.destroy(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.destroy(&id).await);
    }

    #[tokio::test]
    async fn tokens_are_unique() {
        let store = SessionStore::new(SESSION_MAX_AGE);
        let a = store.create(user("1")).await;
        let b = store.create(user("1")).await;
        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_purged() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create(user("1")).await;

        assert!(store.get(&id).await.is_none());
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    /// Cookie header pair from the Set-Cookie a jar emits.
    fn issued(jar: SignedCookieJar) -> HeaderMap {
        let response = jar.into_response();
        let pair = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        HeaderMap::from_iter([(header::COOKIE, pair.parse().unwrap())])
    }

    #[test]
    fn short_secrets_cannot_key_cookies() {
        assert!(CookieKey::derive(b"short").is_none());
        assert!(CookieKey::derive(SECRET).is_some());
    }

    #[test]
    fn signed_cookies_verify() {
        let key = CookieKey::derive(SECRET).unwrap();
        let jar = SignedCookieJar::new(key.clone().into()).add(Cookie::new("token", "value"));
        let headers = issued(jar);

        let jar = SignedCookieJar::from_headers(&headers, key.into());
        assert_eq!(jar.get("token").map(|c| c.value().to_string()), Some("value".into()));
    }

    #[test]
    fn tampered_or_foreign_cookies_are_rejected() {
        let key = CookieKey::derive(SECRET).unwrap();
        let other = CookieKey::derive(b"another-secret-another-secret-xx").unwrap();
        let jar = SignedCookieJar::new(key.clone().into()).add(Cookie::new("token", "value"));
        let headers = issued(jar);

        let foreign = SignedCookieJar::from_headers(&headers, other.into());
        assert!(foreign.get("token").is_none());

        let plain: HeaderMap =
            HeaderMap::from_iter([(header::COOKIE, "token=value".parse().unwrap())]);
        assert!(SignedCookieJar::from_headers(&plain, key.into()).get("token").is_none());
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = build_cookie(SESSION_COOKIE, "abc".into(), SESSION_MAX_AGE, false);
        let header = cookie.to_string();
        assert!(header.starts_with("sessionId=abc"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=86400"));
        assert!(!header.contains("Secure"));
    }
}
