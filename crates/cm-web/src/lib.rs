//! Catalogue Manager web layer.
//!
//! Routers per resource family under `/content-management`, OAuth2
//! sign-in, server-side sessions with a one-redirect flash context, and
//! path-parameter entity resolution. Successful mutations answer with a
//! 303 redirect; reads resolve a named view plus its context object.

use axum::middleware;
use axum::Router;

pub mod audience;
pub mod auth;
pub mod course;
pub mod error;
pub mod event;
pub mod home;
pub mod module;
pub mod organisation;
pub mod params;
pub mod provider;
pub mod session;
pub mod skills;
pub mod state;
pub mod view;

pub use auth::{Authenticated, Identity, OauthClient};
pub use error::{WebError, WebResult};
pub use session::{Flash, SessionStore};
pub use state::AppState;

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let content_management = Router::new()
        .merge(course::router())
        .merge(module::router())
        .merge(event::router())
        .merge(audience::router())
        .merge(provider::router())
        .merge(organisation::router())
        .merge(skills::router());

    Router::new()
        .merge(home::router())
        .merge(auth::router())
        .nest("/content-management", content_management)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .with_state(state)
}
