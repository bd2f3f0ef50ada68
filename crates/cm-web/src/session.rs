//! Server-side sessions and the flash context.
//!
//! One opaque session-id cookie maps to a server-side [`Session`] holding
//! the signed-in identity and at most one pending [`Flash`]. The flash is
//! written immediately before a redirect and consumed exactly once by the
//! next render; the consume-once accessor is what stops stale errors
//! leaking into unrelated requests.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Identity;
use crate::state::AppState;
use cm_catalogue::ValidationErrors;

/// State carried across exactly one redirect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,

    /// The submitted form values, so a failed step can re-fill its fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Flash {
    pub fn errors(errors: ValidationErrors, form: Value) -> Self {
        Self {
            errors: Some(errors),
            form: Some(form),
            message: None,
        }
    }

    pub fn form(form: Value) -> Self {
        Self {
            errors: None,
            form: Some(form),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            errors: None,
            form: None,
            message: Some(message.into()),
        }
    }

    /// Context fragment merged into the next render.
    pub fn into_context(self) -> Value {
        serde_json::json!({
            "errors": self.errors,
            "form": self.form,
            "message": self.message,
        })
    }
}

#[derive(Debug, Default)]
struct Session {
    identity: Option<Identity>,
    flash: Option<Flash>,
    oauth_state: Option<String>,
}

/// In-memory session store keyed by the opaque cookie value.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl SessionStore {
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions.insert(id, Session::default());
        id
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn destroy(&self, id: Uuid) {
        self.sessions.remove(&id);
    }

    pub fn identity(&self, id: Uuid) -> Option<Identity> {
        self.sessions.get(&id)?.identity.clone()
    }

    pub fn set_identity(&self, id: Uuid, identity: Identity) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.identity = Some(identity);
        }
    }

    pub fn put_flash(&self, id: Uuid, flash: Flash) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.flash = Some(flash);
        }
    }

    /// Consume-once read of the pending flash.
    pub fn take_flash(&self, id: Uuid) -> Option<Flash> {
        self.sessions.get_mut(&id)?.flash.take()
    }

    pub fn set_oauth_state(&self, id: Uuid, state: String) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.oauth_state = Some(state);
        }
    }

    pub fn take_oauth_state(&self, id: Uuid) -> Option<String> {
        self.sessions.get_mut(&id)?.oauth_state.take()
    }
}

#[derive(Debug, Clone, Copy)]
struct SessionId(Uuid);

/// Ensure every request is bound to a live session, issuing the cookie on
/// first contact.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(&state.session_config.cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
        .filter(|id| state.sessions.contains(*id));

    let (id, is_new) = match existing {
        Some(id) => (id, false),
        None => (state.sessions.create(), true),
    };

    request.extensions_mut().insert(SessionId(id));
    let response = next.run(request).await;

    if is_new {
        let cookie = Cookie::build((state.session_config.cookie_name.clone(), id.to_string()))
            .path("/")
            .http_only(true)
            .secure(state.session_config.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(state.session_config.max_age_secs))
            .build();
        (jar.add(cookie), response).into_response()
    } else {
        response
    }
}

/// Handle to the current request's session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    store: Arc<SessionStore>,
}

impl SessionHandle {
    pub fn identity(&self) -> Option<Identity> {
        self.store.identity(self.id)
    }

    pub fn set_identity(&self, identity: Identity) {
        self.store.set_identity(self.id, identity);
    }

    pub fn put_flash(&self, flash: Flash) {
        self.store.put_flash(self.id, flash);
    }

    pub fn take_flash(&self) -> Option<Flash> {
        self.store.take_flash(self.id)
    }

    pub fn set_oauth_state(&self, state: String) {
        self.store.set_oauth_state(self.id, state);
    }

    pub fn take_oauth_state(&self) -> Option<String> {
        self.store.take_oauth_state(self.id)
    }

    pub fn destroy(&self) {
        self.store.destroy(self.id);
    }
}

impl FromRequestParts<AppState> for SessionHandle {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<SessionId>()
            .map(|session| session.0)
            // a route escaped the session middleware; bind it to a fresh
            // session rather than failing the request
            .unwrap_or_else(|| state.sessions.create());

        Ok(SessionHandle {
            id,
            store: state.sessions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_is_consumed_exactly_once() {
        let store = SessionStore::default();
        let id = store.create();

        store.put_flash(id, Flash::message("organisationAddedSuccessMessage"));

        let first = store.take_flash(id);
        assert_eq!(
            first.unwrap().message.as_deref(),
            Some("organisationAddedSuccessMessage")
        );
        assert!(store.take_flash(id).is_none());
    }

    #[test]
    fn destroy_removes_identity_and_flash() {
        let store = SessionStore::default();
        let id = store.create();
        store.set_identity(
            id,
            Identity {
                uid: "u1".into(),
                roles: vec!["LEARNING_MANAGER".into()],
                access_token: "tok".into(),
            },
        );
        store.destroy(id);
        assert!(!store.contains(id));
        assert!(store.identity(id).is_none());
    }

    #[test]
    fn oauth_state_is_single_use() {
        let store = SessionStore::default();
        let id = store.create();
        store.set_oauth_state(id, "state-token".into());
        assert_eq!(store.take_oauth_state(id).as_deref(), Some("state-token"));
        assert!(store.take_oauth_state(id).is_none());
    }
}
