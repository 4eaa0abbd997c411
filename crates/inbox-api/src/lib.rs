pub mod auth;
pub mod messages;
pub mod middleware;
pub mod oauth;
pub mod pages;
pub mod render;
pub mod router;
pub mod session;

pub use auth::{AppState, AppStateInner};
pub use middleware::AuthGate;
pub use router::build_router;
