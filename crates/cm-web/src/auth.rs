//! OAuth2 sign-in against the identity service.
//!
//! Authorization-code flow: `/sign-in` stores the caller's target in a
//! short-lived cookie and redirects to the identity service's authorize
//! endpoint with a single-use `state` token; `/authenticate` validates the
//! state, exchanges the code for an access token, resolves the profile and
//! binds the resulting [`Identity`] to the session.

use std::time::Duration;

use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use cm_config::IdentityConfig;

use crate::error::{WebError, WebResult};
use crate::session::SessionHandle;
use crate::state::AppState;
use crate::view::see_other;

/// Cookie carrying the URL to return to after the OAuth2 round trip.
pub const REDIRECT_COOKIE_NAME: &str = "redirectTo";

/// The authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Bearer token forwarded to the upstream services.
    pub access_token: String,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(alias = "username")]
    uid: String,

    #[serde(default)]
    roles: Vec<String>,
}

/// OAuth2 client for the identity service.
pub struct OauthClient {
    http: reqwest::Client,
    config: IdentityConfig,
}

impl OauthClient {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("{}/authenticate", self.config.callback_url.trim_end_matches('/'))
    }

    /// Authorize endpoint URL carrying the single-use state token.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/oauth/authorize?response_type=code&client_id={}&redirect_uri={}&state={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, String> {
        let token_endpoint = format!("{}/oauth/token", self.config.url.trim_end_matches('/'));

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri()),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        let response = self
            .http
            .post(&token_endpoint)
            .form(&params)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await
            .map_err(|e| format!("token request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("token endpoint returned {status}: {body}"));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to parse token response: {e}"))?;

        Ok(token.access_token)
    }

    /// Resolve the signed-in user's profile into an [`Identity`].
    pub async fn resolve_identity(&self, access_token: &str) -> Result<Identity, String> {
        let profile_endpoint = format!("{}/oauth/resolve", self.config.url.trim_end_matches('/'));

        let response = self
            .http
            .get(&profile_endpoint)
            .bearer_auth(access_token)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await
            .map_err(|e| format!("profile request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("profile endpoint returned {}", response.status()));
        }

        let profile: Profile = response
            .json()
            .await
            .map_err(|e| format!("failed to parse profile: {e}"))?;

        Ok(Identity {
            uid: profile.uid,
            roles: profile.roles,
            access_token: access_token.to_string(),
        })
    }
}

/// Extractor for handlers that require a signed-in user.
///
/// Unauthenticated requests are bounced to `/sign-in`; the originally
/// requested URL is kept in the redirect cookie so the round trip lands
/// the user back where they started.
pub struct Authenticated(pub Identity);

pub struct SignInRedirect {
    original_url: String,
}

impl IntoResponse for SignInRedirect {
    fn into_response(self) -> Response {
        let jar = CookieJar::new().add(
            Cookie::build((REDIRECT_COOKIE_NAME, self.original_url))
                .path("/")
                .http_only(true)
                .build(),
        );
        (jar, see_other("/sign-in")).into_response()
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = SignInRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionHandle::from_request_parts(parts, state)
            .await
            .expect("session extraction is infallible");

        match session.identity() {
            Some(identity) => Ok(Authenticated(identity)),
            None => Err(SignInRedirect {
                original_url: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_else(|| "/".to_string()),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

async fn sign_in(State(state): State<AppState>, session: SessionHandle) -> Response {
    let oauth_state = Uuid::new_v4().simple().to_string();
    session.set_oauth_state(oauth_state.clone());

    see_other(&state.oauth.authorize_url(&oauth_state))
}

async fn authenticate(
    State(state): State<AppState>,
    session: SessionHandle,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> WebResult<Response> {
    if let Some(error) = params.error {
        warn!(%error, "identity service rejected the authorization request");
        return Err(WebError::Auth(error));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| WebError::Auth("no authorization code received".into()))?;

    let expected_state = session.take_oauth_state();
    if expected_state.is_none() || expected_state != params.state {
        warn!("state mismatch on OAuth2 callback");
        return Err(WebError::Auth("invalid state parameter".into()));
    }

    let access_token = state
        .oauth
        .exchange_code(&code)
        .await
        .map_err(WebError::Auth)?;

    let identity = state
        .oauth
        .resolve_identity(&access_token)
        .await
        .map_err(WebError::Auth)?;

    info!(uid = %identity.uid, "user signed in");
    session.set_identity(identity);

    let target = jar
        .get(REDIRECT_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|target| target.starts_with('/'))
        .unwrap_or_else(|| "/".to_string());

    let jar = jar.remove(Cookie::build((REDIRECT_COOKIE_NAME, "")).path("/").build());
    Ok((jar, see_other(&target)).into_response())
}

async fn sign_out(session: SessionHandle) -> Response {
    session.destroy();
    see_other("/sign-in")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(sign_in))
        .route("/authenticate", get(authenticate))
        .route("/sign-out", get(sign_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OauthClient {
        OauthClient::new(IdentityConfig {
            url: "http://identity:8080".into(),
            client_id: "catalogue-manager".into(),
            client_secret: "secret".into(),
            callback_url: "http://manager:3005".into(),
            timeout_ms: 5_000,
        })
    }

    #[test]
    fn authorize_url_carries_client_and_state() {
        let url = client().authorize_url("state-token");
        assert!(url.starts_with("http://identity:8080/oauth/authorize?response_type=code"));
        assert!(url.contains("client_id=catalogue-manager"));
        assert!(url.contains("state=state-token"));
        assert!(url.contains(&urlencoding::encode("http://manager:3005/authenticate").into_owned()));
    }

    #[test]
    fn identity_role_membership() {
        let identity = Identity {
            uid: "u1".into(),
            roles: vec!["LEARNING_MANAGER".into()],
            access_token: "tok".into(),
        };
        assert!(identity.has_role("LEARNING_MANAGER"));
        assert!(!identity.has_role("ADMIN"));
    }
}
