//! Module creation - one form per module variant.
//!
//! The add-module page asks for the variant; each variant form validates
//! its own field groups and creates the module against the catalogue.
//! Durations are submitted as hours + minutes and stored as seconds.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use cm_catalogue::factory::{EntityFactory, ModuleFactory};
use cm_catalogue::validator::module_rules;
use cm_catalogue::Module;

use crate::auth::Authenticated;
use crate::error::WebResult;
use crate::params::{CourseContext, ModuleContext};
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

fn duration_seconds(hours: &str, minutes: &str) -> u64 {
    let hours: u64 = hours.parse().unwrap_or(0);
    let minutes: u64 = minutes.parse().unwrap_or(0);
    hours * 3600 + minutes * 60
}

#[derive(Debug, Deserialize)]
struct ModuleTypeForm {
    #[serde(default)]
    module: String,
}

#[derive(Debug, Deserialize)]
struct ModuleForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default, rename = "startPage")]
    start_page: String,
    #[serde(default, rename = "productCode")]
    product_code: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    hours: String,
    #[serde(default)]
    minutes: String,
    #[serde(default, rename = "isOptional")]
    is_optional: Option<String>,
}

impl ModuleForm {
    fn candidate(&self, module_type: &str) -> Value {
        json!({
            "type": module_type,
            "title": self.title,
            "description": self.description,
            "url": self.url,
            "startPage": self.start_page,
            "productCode": self.product_code,
            "file": self.file,
            "location": self.location,
            "duration": duration_seconds(&self.hours, &self.minutes),
            "optional": self.is_optional.is_some(),
        })
    }
}

async fn add_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/course/module/add-module",
        json!({ "course": course, "flash": flash.into_context() }),
    )
}

async fn set_module(
    _auth: Authenticated,
    CourseContext(course): CourseContext,
    Form(form): Form<ModuleTypeForm>,
) -> Response {
    let course_id = course.id.as_deref().unwrap_or_default();

    if form.module.is_empty() {
        return see_other(&format!("/content-management/courses/{course_id}/add-module"));
    }

    see_other(&format!(
        "/content-management/courses/{course_id}/module-{}",
        form.module
    ))
}

fn module_form_view(name: &'static str, course: &cm_catalogue::Course, flash: Flash) -> View {
    View::new(
        name,
        json!({ "course": course, "flash": flash.into_context() }),
    )
}

async fn get_link_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    module_form_view(
        "page/course/module/module-link",
        &course,
        session.take_flash().unwrap_or_default(),
    )
}

/// Shared create path: validate the requested groups, build the module
/// through the factory and persist it against the course.
async fn create_module(
    state: &AppState,
    session: &SessionHandle,
    course_id: &str,
    candidate: Value,
    groups: &[&str],
    back: &str,
    forward: &str,
) -> WebResult<Response> {
    let errors = module_rules().check(&candidate, groups);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(back));
    }

    let module = ModuleFactory::default()
        .create(candidate)
        .map_err(cm_catalogue::CatalogueError::from)?;
    state.catalogue.create_module(course_id, &module).await?;

    Ok(see_other(forward))
}

async fn set_link_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    create_module(
        &state,
        &session,
        &course_id,
        form.candidate("link"),
        &["title", "description", "url", "duration"],
        &format!("/content-management/courses/{course_id}/module-link"),
        &format!("/content-management/courses/{course_id}/add-module"),
    )
    .await
}

async fn update_link_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default().to_string();

    let candidate = form.candidate("link");
    let errors = module_rules().check(&candidate, &["title", "description", "url", "duration"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "/content-management/courses/{course_id}/module-link/{module_id}"
        )));
    }

    let mut module = context.module;
    if let Module::Link { core, url } = &mut module {
        core.title = form.title;
        core.description = form.description;
        core.duration = duration_seconds(&form.hours, &form.minutes);
        core.optional = form.is_optional.is_some();
        *url = form.url;
    }
    state.catalogue.update_module(&course_id, &module).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/add-module")))
}

async fn get_video_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    module_form_view(
        "page/course/module/module-video",
        &course,
        session.take_flash().unwrap_or_default(),
    )
}

async fn set_video_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    create_module(
        &state,
        &session,
        &course_id,
        form.candidate("video"),
        &["title", "description", "url", "duration"],
        &format!("/content-management/courses/{course_id}/module-video"),
        &format!("/content-management/courses/{course_id}/overview"),
    )
    .await
}

async fn get_elearning_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    module_form_view(
        "page/course/module/module-elearning",
        &course,
        session.take_flash().unwrap_or_default(),
    )
}

async fn set_elearning_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    create_module(
        &state,
        &session,
        &course_id,
        form.candidate("elearning"),
        &["title", "description", "startPage", "duration"],
        &format!("/content-management/courses/{course_id}/module-elearning"),
        &format!("/content-management/courses/{course_id}/overview"),
    )
    .await
}

async fn get_face_to_face_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    module_form_view(
        "page/course/module/module-face-to-face",
        &course,
        session.take_flash().unwrap_or_default(),
    )
}

async fn set_face_to_face_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    create_module(
        &state,
        &session,
        &course_id,
        form.candidate("face-to-face"),
        &["title", "description"],
        &format!("/content-management/courses/{course_id}/module-face-to-face"),
        &format!("/content-management/courses/{course_id}/overview"),
    )
    .await
}

async fn get_file_module(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    module_form_view(
        "page/course/module/module-file",
        &course,
        session.take_flash().unwrap_or_default(),
    )
}

/// The form for a previously uploaded file: the media record is looked up
/// so the page can show its name and size.
async fn get_file_module_with_media(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Path((_, media_id)): Path<(String, String)>,
) -> WebResult<View> {
    let media = state.catalogue.get_media(&media_id).await?;
    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/course/module/module-file",
        json!({
            "course": course,
            "mediaId": media_id,
            "media": media,
            "flash": flash.into_context(),
        }),
    ))
}

async fn set_file_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Path((_, media_id)): Path<(String, String)>,
    Form(form): Form<ModuleForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();

    let candidate = form.candidate("file");
    let errors = module_rules().check(&candidate, &["title", "description", "file"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "/content-management/courses/{course_id}/module-file"
        )));
    }

    // enrich the module from the uploaded media record
    let media = state.catalogue.get_media(&media_id).await?;
    let enriched = json!({
        "type": "file",
        "title": form.title,
        "description": form.description,
        "file": form.file,
        "optional": form.is_optional.is_some(),
        "duration": media.metadata.duration,
        "fileSize": media.file_size_kb,
        "mediaId": media.id,
        "url": media.path,
    });

    let module = ModuleFactory::default()
        .create(enriched)
        .map_err(cm_catalogue::CatalogueError::from)?;
    state.catalogue.create_module(&course_id, &module).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/overview")))
}

async fn delete_module(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: ModuleContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default();

    state.catalogue.delete_module(&course_id, module_id).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/overview")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{courseId}/add-module",
            get(add_module).post(set_module),
        )
        .route(
            "/courses/{courseId}/module-link",
            get(get_link_module).post(set_link_module),
        )
        .route(
            "/courses/{courseId}/module-link/{moduleId}",
            get(get_link_module).post(update_link_module),
        )
        .route(
            "/courses/{courseId}/module-video",
            get(get_video_module).post(set_video_module),
        )
        .route(
            "/courses/{courseId}/module-elearning",
            get(get_elearning_module).post(set_elearning_module),
        )
        .route(
            "/courses/{courseId}/module-face-to-face",
            get(get_face_to_face_module).post(set_face_to_face_module),
        )
        .route("/courses/{courseId}/module-file", get(get_file_module))
        .route(
            "/courses/{courseId}/module-file/{mediaId}",
            get(get_file_module_with_media).post(set_file_module),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/delete",
            post(delete_module),
        )
}
