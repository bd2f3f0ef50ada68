//! Process-wide fault boundary.
//!
//! Validation failures never reach this module: they are handled inside
//! the originating handler via flash + redirect. What arrives here is a
//! missing path-referenced entity (404) or an upstream fault (logged,
//! generic failure view).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cm_catalogue::CatalogueError;
use cm_csrs::CsrsError;
use cm_learner_record::LearnerRecordError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::view::View;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("resource not found")]
    NotFound,

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Csrs(#[from] CsrsError),

    #[error(transparent)]
    LearnerRecord(#[from] LearnerRecordError),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl WebError {
    fn is_upstream_not_found(&self) -> bool {
        match self {
            WebError::Catalogue(CatalogueError::Transport(err))
            | WebError::Csrs(CsrsError::Transport(err))
            | WebError::LearnerRecord(LearnerRecordError::Transport(err)) => err.is_not_found(),
            _ => false,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if matches!(self, WebError::NotFound) || self.is_upstream_not_found() {
            return StatusCode::NOT_FOUND.into_response();
        }

        if let WebError::Auth(reason) = &self {
            error!(%reason, "authentication failure");
            return crate::view::see_other("/sign-in");
        }

        error!(error = %self, "upstream failure reached the fault boundary");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            View::new("page/error", json!({})),
        )
            .into_response()
    }
}

pub type WebResult<T> = Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cm_common::TransportError;
    use reqwest::Method;

    #[test]
    fn missing_entity_maps_to_404() {
        let response = WebError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_404_also_maps_to_404() {
        let err = WebError::Catalogue(CatalogueError::Transport(TransportError::NotFound {
            method: Method::GET,
            path: "/courses/x".into(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transport_faults_map_to_generic_failure() {
        let err = WebError::Catalogue(CatalogueError::Transport(TransportError::MissingLocation {
            path: "/courses".into(),
        }));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
