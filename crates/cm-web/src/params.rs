//! Path-parameter entity resolution.
//!
//! Each extractor resolves the entities referenced by the request path
//! before the handler body runs, answering 404 when the upstream reports
//! one missing. Handlers receive the resolved entities, never bare ids.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use cm_catalogue::{Audience, Course, Event, LearningProvider, Module};

use crate::error::WebError;
use crate::state::AppState;

async fn path_params(parts: &mut Parts, state: &AppState) -> HashMap<String, String> {
    Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map(|Path(params)| params)
        .unwrap_or_default()
}

fn param(params: &HashMap<String, String>, name: &str) -> Result<String, WebError> {
    params.get(name).cloned().ok_or(WebError::NotFound)
}

/// Resolves `{courseId}`.
pub struct CourseContext(pub Course);

impl FromRequestParts<AppState> for CourseContext {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await;
        let course_id = param(&params, "courseId")?;

        state
            .catalogue
            .get_course(&course_id)
            .await?
            .map(CourseContext)
            .ok_or(WebError::NotFound)
    }
}

/// Resolves `{courseId}` + `{moduleId}`.
pub struct ModuleContext {
    pub course: Course,
    pub module: Module,
}

impl FromRequestParts<AppState> for ModuleContext {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await;
        let course_id = param(&params, "courseId")?;
        let module_id = param(&params, "moduleId")?;

        let course = state
            .catalogue
            .get_course(&course_id)
            .await?
            .ok_or(WebError::NotFound)?;

        let module = state
            .catalogue
            .get_module(&course_id, &module_id)
            .await?
            .ok_or(WebError::NotFound)?;

        Ok(ModuleContext { course, module })
    }
}

/// Resolves `{courseId}` + `{moduleId}` + `{eventId}`.
pub struct EventContext {
    pub course: Course,
    pub module: Module,
    pub event: Event,
}

impl FromRequestParts<AppState> for EventContext {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await;
        let course_id = param(&params, "courseId")?;
        let module_id = param(&params, "moduleId")?;
        let event_id = param(&params, "eventId")?;

        let course = state
            .catalogue
            .get_course(&course_id)
            .await?
            .ok_or(WebError::NotFound)?;

        let module = state
            .catalogue
            .get_module(&course_id, &module_id)
            .await?
            .ok_or(WebError::NotFound)?;

        let event = state
            .catalogue
            .get_event(&course_id, &module_id, &event_id)
            .await?
            .ok_or(WebError::NotFound)?;

        Ok(EventContext {
            course,
            module,
            event,
        })
    }
}

/// Resolves `{courseId}` + `{audienceId}`.
pub struct AudienceContext {
    pub course: Course,
    pub audience: Audience,
}

impl FromRequestParts<AppState> for AudienceContext {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await;
        let course_id = param(&params, "courseId")?;
        let audience_id = param(&params, "audienceId")?;

        let course = state
            .catalogue
            .get_course(&course_id)
            .await?
            .ok_or(WebError::NotFound)?;

        let audience = state
            .catalogue
            .get_audience(&course_id, &audience_id)
            .await?
            .ok_or(WebError::NotFound)?;

        Ok(AudienceContext { course, audience })
    }
}

/// Resolves `{learningProviderId}`.
pub struct ProviderContext(pub LearningProvider);

impl FromRequestParts<AppState> for ProviderContext {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let params = path_params(parts, state).await;
        let provider_id = param(&params, "learningProviderId")?;

        state
            .catalogue
            .get_learning_provider(&provider_id)
            .await?
            .map(ProviderContext)
            .ok_or(WebError::NotFound)
    }
}
