//! Render-or-redirect response types.
//!
//! Page rendering itself is out of scope: a read endpoint resolves to a
//! named view plus a JSON context object, and the front end turns that
//! into markup. Mutations answer with a 303 redirect to the next wizard
//! step.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::Value;

/// A named view with its context object.
#[derive(Debug, Clone)]
pub struct View {
    name: &'static str,
    context: Value,
}

impl View {
    pub fn new(name: &'static str, context: Value) -> Self {
        Self { name, context }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        Json(serde_json::json!({
            "view": self.name,
            "context": self.context,
        }))
        .into_response()
    }
}

/// 303 See Other to the given location.
pub fn see_other(location: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn see_other_carries_the_location() {
        let response = see_other("/content-management");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/content-management"
        );
    }
}
