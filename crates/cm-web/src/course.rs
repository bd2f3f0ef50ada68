//! Course creation and editing.
//!
//! Creation is a two-step wizard: title, then details. Each POST validates
//! only its own field group; a failure flashes the errors plus the
//! submitted values and redirects back to the same step.

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::json;

use cm_catalogue::factory::{CourseFactory, EntityFactory};
use cm_catalogue::validator::course_rules;

use crate::auth::Authenticated;
use crate::error::WebResult;
use crate::params::CourseContext;
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

#[derive(Debug, Deserialize)]
struct CourseTitleForm {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct CourseDetailsForm {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "shortDescription")]
    short_description: String,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "learningOutcomes")]
    learning_outcomes: String,
}

impl CourseDetailsForm {
    fn as_value(&self) -> serde_json::Value {
        json!({
            "title": self.title,
            "shortDescription": self.short_description,
            "description": self.description,
            "learningOutcomes": self.learning_outcomes,
        })
    }
}

async fn get_course_title(_auth: Authenticated, session: SessionHandle) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-course-title",
        json!({ "edit": false, "flash": flash.into_context() }),
    )
}

async fn set_course_title(
    _auth: Authenticated,
    session: SessionHandle,
    Form(form): Form<CourseTitleForm>,
) -> Response {
    let candidate = json!({ "title": form.title });
    let errors = course_rules().check(&candidate, &["title"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return see_other("/content-management/courses/add-course-title");
    }

    session.put_flash(Flash::form(candidate));
    see_other("/content-management/courses/add-course-details")
}

async fn get_course_details(_auth: Authenticated, session: SessionHandle) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-course-details",
        json!({ "edit": false, "flash": flash.into_context() }),
    )
}

async fn set_course_details(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    Form(form): Form<CourseDetailsForm>,
) -> WebResult<Response> {
    let candidate = form.as_value();
    let errors = course_rules().check_all(&candidate);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other("/content-management/courses/add-course-details"));
    }

    let course = CourseFactory::default()
        .create(candidate)
        .map_err(cm_catalogue::CatalogueError::from)?;
    let created = state.catalogue.create_course(&course).await?;

    let id = created.id.as_deref().unwrap_or_default();
    Ok(see_other(&format!("/content-management/courses/{id}/overview")))
}

async fn course_overview(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/course",
        json!({
            "course": course,
            "courseType": course.course_type(),
            "cost": course.cost(),
            "flash": flash.into_context(),
        }),
    )
}

async fn get_edit_course_title(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-course-title",
        json!({ "edit": true, "course": course, "flash": flash.into_context() }),
    )
}

async fn edit_course_title(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(mut course): CourseContext,
    Form(form): Form<CourseTitleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    let candidate = json!({ "title": form.title });
    let errors = course_rules().check(&candidate, &["title"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "/content-management/courses/{course_id}/edit-title"
        )));
    }

    course.title = form.title;
    state.catalogue.update_course(&course).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/overview")))
}

async fn get_edit_course_details(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-course-details",
        json!({ "edit": true, "course": course, "flash": flash.into_context() }),
    )
}

async fn edit_course_details(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(mut course): CourseContext,
    Form(form): Form<CourseDetailsForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    let candidate = form.as_value();
    let errors = course_rules().check(&candidate, &["shortDescription", "description"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "/content-management/courses/{course_id}/edit-details"
        )));
    }

    course.short_description = Some(form.short_description);
    course.description = Some(form.description);
    course.learning_outcomes = Some(form.learning_outcomes);
    state.catalogue.update_course(&course).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/overview")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/add-course-title",
            get(get_course_title).post(set_course_title),
        )
        .route(
            "/courses/add-course-details",
            get(get_course_details).post(set_course_details),
        )
        .route("/courses/{courseId}/overview", get(course_overview))
        .route(
            "/courses/{courseId}/edit-title",
            get(get_edit_course_title).post(edit_course_title),
        )
        .route(
            "/courses/{courseId}/edit-details",
            get(get_edit_course_details).post(edit_course_details),
        )
}
