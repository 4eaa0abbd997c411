//! Startup configuration from the command line and the environment.
//!
//! Everything the server needs is checked here; a missing or placeholder
//! value stops the process before it binds a socket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use inbox_api::AuthGate;
use inbox_api::oauth::OAuthCredentials;
use inbox_api::session::MIN_SECRET_LEN;

pub const DEFAULT_BIND: &str = "127.0.0.1:3330";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DEV_RECEIVER_ID: i64 = 1;

/// Session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "a secret with minimum length of 32 characters",
];

/// Server-rendered inbox behind Google sign-in.
///
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug, Default)]
#[command(name = "inbox", version, about)]
pub struct Cli {
    /// Listen address [env: INBOX_BIND] [default: 127.0.0.1:3330]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Open protected routes without signing in. Refused when INBOX_ENV=production.
    #[arg(long)]
    pub dev: bool,

    /// Directory of static files [env: INBOX_PUBLIC_DIR] [default: public]
    #[arg(long)]
    pub public_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("--dev is refused while INBOX_ENV=production")]
    DevBypassInProduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgrest {
        url: String,
        api_key: String,
        schema: String,
    },
    Sqlite {
        path: PathBuf,
    },
}

#[derive(Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub gate: AuthGate,
    pub public_dir: PathBuf,
    pub store: StoreConfig,
    pub session_secret: String,
    pub oauth: OAuthCredentials,
    pub cookie_secure: bool,
    pub http_timeout: Duration,
    pub dev_receiver_id: i64,
}

impl Config {
    /// `env` looks a variable up; pass `|k| std::env::var(k).ok()` in production.
    pub fn from_cli_and_env<F>(cli: Cli, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let environment = match var("INBOX_ENV").as_deref() {
            None | Some("production") => Environment::Production,
            Some("development") => Environment::Development,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "INBOX_ENV",
                    reason: format!("expected 'development' or 'production', got '{other}'"),
                });
            }
        };

        let gate = match (cli.dev, environment) {
            (false, _) => AuthGate::Enforce,
            (true, Environment::Development) => AuthGate::Bypass,
            (true, Environment::Production) => return Err(ConfigError::DevBypassInProduction),
        };

        let bind = cli
            .bind
            .or_else(|| var("INBOX_BIND"))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "INBOX_BIND",
            reason: format!("'{bind}': {e}"),
        })?;

        let public_dir = cli
            .public_dir
            .or_else(|| var("INBOX_PUBLIC_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("public"));

        let store = match var("INBOX_SQLITE_PATH") {
            Some(path) => StoreConfig::Sqlite { path: path.into() },
            None => StoreConfig::Postgrest {
                url: required("API_URL")?,
                api_key: required("API_KEY")?,
                schema: var("SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            },
        };

        let session_secret = required("SESSION_SECRET")?;
        if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: "still a placeholder".into(),
            });
        }
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "SESSION_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let oauth = OAuthCredentials {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            callback_url: required("GOOGLE_CALLBACK_URL")?,
        };

        let cookie_secure = parse_or("INBOX_COOKIE_SECURE", var("INBOX_COOKIE_SECURE"), false)?;
        let http_timeout = Duration::from_secs(parse_or(
            "INBOX_HTTP_TIMEOUT_SECS",
            var("INBOX_HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let dev_receiver_id = parse_or(
            "INBOX_DEV_RECEIVER_ID",
            var("INBOX_DEV_RECEIVER_ID"),
            DEFAULT_DEV_RECEIVER_ID,
        )?;

        Ok(Self {
            bind_addr,
            environment,
            gate,
            public_dir,
            store,
            session_secret,
            oauth,
            cookie_secure,
            http_timeout,
            dev_receiver_id,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
            key,
            reason: format!("'{raw}': {e}"),
        }),
    }
}
