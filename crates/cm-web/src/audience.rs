//! Audience configuration wizard.
//!
//! Name and type are collected first; the type step persists the audience
//! and lands on the configure hub. Every spoke (organisation, areas of
//! work, grades, core learning, deadline, private-course event) updates
//! the audience upstream and returns to the hub, and each has a delete
//! action clearing its attribute. The hub is left only by deleting the
//! audience.

use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::Form;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use cm_catalogue::validator::{audience_rules, ValidationErrors};
use cm_catalogue::{Audience, AudienceType};

use crate::auth::Authenticated;
use crate::error::WebResult;
use crate::params::{AudienceContext, CourseContext};
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

fn audiences_path(course_id: &str) -> String {
    format!("/content-management/courses/{course_id}/audiences")
}

fn configure_path(course_id: &str, audience_id: &str) -> String {
    format!(
        "/content-management/courses/{course_id}/audiences/{audience_id}/configure"
    )
}

#[derive(Debug, Deserialize)]
struct NameForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct TypeForm {
    #[serde(default, rename = "type")]
    audience_type: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct OrganisationForm {
    #[serde(default)]
    organisation: String,
    #[serde(default)]
    parent: String,
}

#[derive(Debug, Deserialize)]
struct AreaOfWorkForm {
    #[serde(default, rename = "area-of-work")]
    area_of_work: String,
}

#[derive(Debug, Deserialize)]
struct GradesForm {
    #[serde(default)]
    grades: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InterestsForm {
    #[serde(default)]
    interests: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeadlineForm {
    #[serde(default, rename = "deadline-year")]
    year: String,
    #[serde(default, rename = "deadline-month")]
    month: String,
    #[serde(default, rename = "deadline-day")]
    day: String,
}

#[derive(Debug, Deserialize)]
struct EventForm {
    #[serde(default)]
    events: String,
}

// ---------------------------------------------------------------------------
// Name and type steps
// ---------------------------------------------------------------------------

async fn get_audience_name(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/course/audience/audience-name",
        json!({ "course": course, "flash": flash.into_context() }),
    )
}

async fn set_audience_name(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<NameForm>,
) -> Response {
    let course_id = course.id.as_deref().unwrap_or_default();
    let candidate = json!({ "name": form.name });
    let errors = audience_rules().check(&candidate, &["audience.name"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return see_other(&audiences_path(course_id));
    }

    session.put_flash(Flash::form(json!({ "audienceName": form.name })));
    see_other(&format!("{}/type", audiences_path(course_id)))
}

async fn get_audience_type(
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/course/audience/audience-type",
        json!({
            "course": course,
            "audienceTypes": AudienceType::ALL,
            "flash": flash.into_context(),
        }),
    )
}

async fn set_audience_type(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    CourseContext(course): CourseContext,
    Form(form): Form<TypeForm>,
) -> WebResult<Response> {
    let course_id = course.id.clone().unwrap_or_default();
    let candidate = json!({ "type": form.audience_type, "name": form.name });
    let errors = audience_rules().check(&candidate, &["audience.type"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!("{}/type", audiences_path(&course_id))));
    }

    let mut audience = Audience::new(form.name);
    audience.audience_type = AudienceType::parse(&form.audience_type);

    let created = state.catalogue.create_audience(&course_id, &audience).await?;
    let audience_id = created.id.as_deref().unwrap_or_default();

    Ok(see_other(&configure_path(&course_id, audience_id)))
}

async fn update_audience_type(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<TypeForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    let candidate = json!({ "type": form.audience_type });
    let errors = audience_rules().check(&candidate, &["audience.type"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/{audience_id}/type",
            audiences_path(&course_id)
        )));
    }

    let mut audience = context.audience;
    audience.audience_type = AudienceType::parse(&form.audience_type);
    state.catalogue.update_audience(&course_id, &audience).await?;

    Ok(see_other(&configure_path(&course_id, &audience_id)))
}

// ---------------------------------------------------------------------------
// Configure hub
// ---------------------------------------------------------------------------

async fn get_configure_audience(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: AudienceContext,
) -> WebResult<View> {
    let department_code_to_name = state
        .csrs
        .department_code_to_name(&identity.access_token)
        .await?;
    let grade_code_to_name = state
        .csrs
        .grade_code_to_name(&identity.access_token)
        .await?;

    // which event each private-course audience is pinned to
    let audience_id_to_event: serde_json::Map<String, serde_json::Value> = context
        .course
        .audiences
        .iter()
        .filter_map(|audience| {
            let id = audience.id.clone()?;
            let event_id = audience.event_id.as_deref()?;
            let event = context.course.events().find(|e| e.id.as_deref() == Some(event_id))?;
            Some((id, serde_json::to_value(event).ok()?))
        })
        .collect();

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/course/audience/configure-audience",
        json!({
            "course": context.course,
            "audience": context.audience,
            "audienceTypes": AudienceType::ALL,
            "departmentCodeToName": department_code_to_name,
            "gradeCodeToName": grade_code_to_name,
            "audienceIdToEvent": audience_id_to_event,
            "flash": flash.into_context(),
        }),
    ))
}

/// Persist a mutated audience and return to the configure hub.
async fn save_and_configure(
    state: &AppState,
    course_id: &str,
    audience: &Audience,
) -> WebResult<Response> {
    state.catalogue.update_audience(course_id, audience).await?;
    let audience_id = audience.id.as_deref().unwrap_or_default();
    Ok(see_other(&configure_path(course_id, audience_id)))
}

// ---------------------------------------------------------------------------
// Organisation spoke
// ---------------------------------------------------------------------------

async fn get_organisation(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    context: AudienceContext,
) -> WebResult<View> {
    let organisations = state.csrs.organisations(&identity.access_token).await?;

    Ok(View::new(
        "page/course/audience/add-organisation",
        json!({
            "course": context.course,
            "audience": context.audience,
            "organisationalUnits": organisations,
        }),
    ))
}

async fn set_organisation(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    context: AudienceContext,
    Form(form): Form<OrganisationForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();

    let departments = if form.organisation == "all" {
        state
            .csrs
            .all_organisation_codes(&identity.access_token)
            .await?
    } else {
        vec![form.parent]
    };

    let mut audience = context.audience;
    audience.departments = departments;
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_organisation(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.departments = vec![];
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Areas of work spoke
// ---------------------------------------------------------------------------

async fn get_areas_of_work(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    context: AudienceContext,
) -> WebResult<View> {
    let areas_of_work = state.csrs.areas_of_work(&identity.access_token).await?;

    Ok(View::new(
        "page/course/audience/add-area-of-work",
        json!({
            "course": context.course,
            "audience": context.audience,
            "areasOfWork": areas_of_work,
        }),
    ))
}

async fn set_areas_of_work(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<AreaOfWorkForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    if !state
        .csrs
        .is_area_of_work_valid(&identity.access_token, &form.area_of_work)
        .await?
    {
        let mut errors = ValidationErrors::default();
        errors.add("areaOfWork", "audience.validation.areasOfWork.invalid");
        session.put_flash(Flash::errors(errors, json!({ "areaOfWork": form.area_of_work })));
        return Ok(see_other(&format!(
            "{}/{audience_id}/area-of-work",
            audiences_path(&course_id)
        )));
    }

    let mut audience = context.audience;
    audience.areas_of_work = vec![form.area_of_work];
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_areas_of_work(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.areas_of_work = vec![];
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Grades spoke
// ---------------------------------------------------------------------------

async fn get_grades(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    context: AudienceContext,
) -> WebResult<View> {
    let grades = state.csrs.grades(&identity.access_token).await?;

    Ok(View::new(
        "page/course/audience/add-grades",
        json!({
            "course": context.course,
            "audience": context.audience,
            "grades": grades,
        }),
    ))
}

async fn set_grades(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<GradesForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    let mut all_valid = !form.grades.is_empty();
    for grade_code in &form.grades {
        if !state
            .csrs
            .is_grade_code_valid(&identity.access_token, grade_code)
            .await?
        {
            all_valid = false;
            break;
        }
    }

    if !all_valid {
        let mut errors = ValidationErrors::default();
        errors.add("grades", "audience.validation.grades.invalid");
        session.put_flash(Flash::errors(errors, json!({ "grades": form.grades })));
        return Ok(see_other(&format!(
            "{}/{audience_id}/grades",
            audiences_path(&course_id)
        )));
    }

    let mut audience = context.audience;
    audience.grades = form.grades;
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_grades(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.grades = vec![];
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Core learning spoke
// ---------------------------------------------------------------------------

async fn get_core_learning(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    context: AudienceContext,
) -> WebResult<View> {
    let interests = state.csrs.interests(&identity.access_token).await?;

    Ok(View::new(
        "page/course/audience/add-core-learning",
        json!({
            "course": context.course,
            "audience": context.audience,
            "interests": interests,
        }),
    ))
}

async fn set_core_learning(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<InterestsForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    let mut all_valid = !form.interests.is_empty();
    for interest in &form.interests {
        if !state
            .csrs
            .is_interest_valid(&identity.access_token, interest)
            .await?
        {
            all_valid = false;
            break;
        }
    }

    if !all_valid {
        let mut errors = ValidationErrors::default();
        errors.add("interests", "audience.validation.interests.invalid");
        session.put_flash(Flash::errors(errors, json!({ "interests": form.interests })));
        return Ok(see_other(&format!(
            "{}/{audience_id}/add-core-learning",
            audiences_path(&course_id)
        )));
    }

    let mut audience = context.audience;
    audience.interests = form.interests;
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_core_learning(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.interests = vec![];
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Deadline spoke
// ---------------------------------------------------------------------------

async fn get_deadline(
    _auth: Authenticated,
    session: SessionHandle,
    context: AudienceContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    let example_year = chrono::Utc::now().date_naive().format("%Y").to_string();

    View::new(
        "page/course/audience/add-deadline",
        json!({
            "course": context.course,
            "audience": context.audience,
            "exampleYear": example_year,
            "flash": flash.into_context(),
        }),
    )
}

async fn set_deadline(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<DeadlineForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    let date = NaiveDate::from_ymd_opt(
        form.year.parse().unwrap_or(0),
        form.month.parse().unwrap_or(0),
        form.day.parse().unwrap_or(0),
    );

    let candidate = json!({
        "requiredBy": date.map(|d| d.format("%Y-%m-%d").to_string()),
    });
    let errors = audience_rules().check(&candidate, &["audience.requiredBy"]);

    let deadline = match (date, errors.size()) {
        (Some(date), 0) => date,
        _ => {
            session.put_flash(Flash::errors(
                errors,
                json!({ "deadlineDate": { "year": form.year, "month": form.month, "day": form.day } }),
            ));
            return Ok(see_other(&format!(
                "{}/{audience_id}/deadline",
                audiences_path(&course_id)
            )));
        }
    };

    let mut audience = context.audience;
    audience.required_by = deadline.and_hms_opt(0, 0, 0);
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_deadline(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.required_by = None;
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Private-course event spoke
// ---------------------------------------------------------------------------

async fn get_private_course_event(_auth: Authenticated, context: AudienceContext) -> View {
    let course_events: Vec<serde_json::Value> = context
        .course
        .events()
        .map(|event| {
            json!({
                "id": event.id,
                "venue": event.venue,
                "dateRanges": event.sorted_date_ranges(),
            })
        })
        .collect();

    View::new(
        "page/course/audience/add-event",
        json!({
            "course": context.course,
            "audience": context.audience,
            "courseEvents": course_events,
        }),
    )
}

async fn set_private_course_event(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: AudienceContext,
    Form(form): Form<EventForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    let exists = !form.events.is_empty()
        && context
            .course
            .events()
            .any(|event| event.id.as_deref() == Some(form.events.as_str()));

    if !exists {
        let mut errors = ValidationErrors::default();
        errors.add("events", "audience.validation.event.invalid");
        session.put_flash(Flash::errors(errors, json!({ "events": form.events })));
        return Ok(see_other(&format!(
            "{}/{audience_id}/event",
            audiences_path(&course_id)
        )));
    }

    let mut audience = context.audience;
    audience.event_id = Some(form.events);
    save_and_configure(&state, &course_id, &audience).await
}

async fn delete_private_course_event(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let mut audience = context.audience;
    audience.event_id = None;
    save_and_configure(&state, &course_id, &audience).await
}

// ---------------------------------------------------------------------------
// Delete audience
// ---------------------------------------------------------------------------

async fn delete_audience_confirmation(_auth: Authenticated, context: AudienceContext) -> View {
    View::new(
        "page/course/audience/delete-audience-confirmation",
        json!({ "course": context.course, "audience": context.audience }),
    )
}

async fn delete_audience(
    State(state): State<AppState>,
    _auth: Authenticated,
    context: AudienceContext,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let audience_id = context.audience.id.clone().unwrap_or_default();

    state.catalogue.delete_audience(&course_id, &audience_id).await?;

    Ok(see_other(&format!("/content-management/courses/{course_id}/overview")))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{courseId}/audiences",
            get(get_audience_name).post(set_audience_name),
        )
        .route(
            "/courses/{courseId}/audiences/type",
            get(get_audience_type).post(set_audience_type),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/type",
            get(get_audience_type).post(update_audience_type),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/configure",
            get(get_configure_audience),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/organisation",
            get(get_organisation).post(set_organisation),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/organisation/delete",
            post(delete_organisation),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/area-of-work",
            get(get_areas_of_work).post(set_areas_of_work),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/area-of-work/delete",
            post(delete_areas_of_work),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/grades",
            get(get_grades).post(set_grades),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/grades/delete",
            post(delete_grades),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/add-core-learning",
            get(get_core_learning).post(set_core_learning),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/core-learning/delete",
            post(delete_core_learning),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/deadline",
            get(get_deadline).post(set_deadline),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/deadline/delete",
            post(delete_deadline),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/event",
            get(get_private_course_event).post(set_private_course_event),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/event/delete",
            post(delete_private_course_event),
        )
        .route(
            "/courses/{courseId}/audiences/{audienceId}/delete",
            get(delete_audience_confirmation).post(delete_audience),
        )
}
