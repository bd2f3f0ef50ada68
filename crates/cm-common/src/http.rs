//! JSON REST transport adapter.
//!
//! One `RestClient` per upstream service, created with a base URL, a fixed
//! per-call timeout and the credentials the upstream expects. Created
//! resources are returned by following the `Location` response header with
//! an immediate GET, which is how the catalogue service answers POSTs.
//!
//! No retries are performed at this layer; a failed call surfaces to the
//! caller as a [`TransportError`].

use std::time::Duration;

use reqwest::{header::LOCATION, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Credentials attached to every request issued by a [`RestClient`].
#[derive(Debug, Clone)]
pub enum Credentials {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

/// Transport-level failure. Upstream 404s are distinguished so callers can
/// answer "resource absent" instead of treating them as fatal.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{method} {path}: resource not found upstream")]
    NotFound { method: Method, path: String },

    #[error("{method} {path}: upstream responded {status}: {message}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("{method} {path}: request failed")]
    Request {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("POST {path}: created response carried no Location header")]
    MissingLocation { path: String },

    #[error("{method} {path}: failed to decode response body")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// True when the upstream reported the resource missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Authenticated JSON client for one upstream base URL.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    credentials: Credentials,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            credentials,
        }
    }

    /// Clone of this client carrying a caller-supplied bearer token.
    ///
    /// Used for upstreams that expect the signed-in user's access token
    /// rather than service credentials.
    pub fn with_bearer(&self, token: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            credentials: Credentials::Bearer(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let response = self.send(Method::GET, path, None).await?;
        self.decode(Method::GET, path, response).await
    }

    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| TransportError::Decode {
                method: Method::GET,
                path: path.to_string(),
                source,
            })
    }

    /// POST, then follow the `Location` response header with an immediate
    /// GET and return the fully-populated created resource.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::POST, path, Some(body)).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| TransportError::MissingLocation {
                path: path.to_string(),
            })?;

        self.get(&resource_path(&location)).await
    }

    /// POST returning the response body itself, for upstreams that answer
    /// with a payload instead of a `Location` header.
    pub async fn post_without_following(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        self.decode(Method::POST, path, response).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::PUT, path, Some(body)).await?;
        self.decode(Method::PUT, path, response).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::PATCH, path, Some(body)).await?;
        self.decode(Method::PATCH, path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "upstream request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        request = match &self.credentials {
            Credentials::None => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            Credentials::Bearer(token) => request.bearer_auth(token),
        };

        if let Some(body) = body {
            request = request.json(body);
        }

        let response =
            request
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    method: method.clone(),
                    path: path.to_string(),
                    source,
                })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                method,
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                method,
                path: path.to_string(),
                status,
                message,
            });
        }

        Ok(response)
    }

    async fn decode(
        &self,
        method: Method,
        path: &str,
        response: reqwest::Response,
    ) -> Result<Value> {
        if response.content_length() == Some(0) {
            return Ok(Value::Null);
        }
        response
            .json::<Value>()
            .await
            .map_err(|source| TransportError::Decode {
                method,
                path: path.to_string(),
                source,
            })
    }
}

/// Reduce a `Location` header to the path (+query) the client should GET.
/// The catalogue returns absolute URLs; relative paths pass through.
fn resource_path(location: &str) -> String {
    match Url::parse(location) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, bearer_token, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RestClient {
        RestClient::new(server.uri(), Duration::from_secs(5), Credentials::None)
    }

    #[test]
    fn location_header_is_reduced_to_a_path() {
        assert_eq!(
            resource_path("http://catalogue:9001/courses/abc123"),
            "/courses/abc123"
        );
        assert_eq!(resource_path("/courses/abc123"), "/courses/abc123");
    }

    #[tokio::test]
    async fn post_follows_the_location_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(url_path("/courses"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", format!("{}/courses/new-id", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/courses/new-id"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "new-id", "title": "Working with budgets"})),
            )
            .mount(&server)
            .await;

        let created = client(&server)
            .post("/courses", &json!({"title": "Working with budgets"}))
            .await
            .unwrap();

        assert_eq!(created["id"], "new-id");
        assert_eq!(created["title"], "Working with budgets");
    }

    #[tokio::test]
    async fn post_without_location_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(url_path("/courses"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = client(&server)
            .post("/courses", &json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::MissingLocation { .. }));
    }

    #[tokio::test]
    async fn upstream_404_maps_to_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).get("/courses/missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(url_path("/courses/abc"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server)
            .put("/courses/abc", &json!({}))
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, message, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn basic_credentials_are_attached() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses"))
            .and(basic_auth("editor", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let rest = RestClient::new(
            server.uri(),
            Duration::from_secs(5),
            Credentials::Basic {
                username: "editor".into(),
                password: "secret".into(),
            },
        );

        assert!(rest.get("/courses").await.is_ok());
    }

    #[tokio::test]
    async fn bearer_scoped_clone_uses_the_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/grades"))
            .and(bearer_token("user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_embedded": {}})))
            .mount(&server)
            .await;

        let rest = client(&server).with_bearer("user-token");
        assert!(rest.get("/grades").await.is_ok());
    }
}
