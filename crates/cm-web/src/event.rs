//! Event scheduling for face-to-face modules.
//!
//! An event is drafted one day at a time (date-range step), then given a
//! venue (location step), which is when it is first persisted upstream.
//! The draft travels between steps as a JSON blob in a hidden form field,
//! exactly as the rendered pages resubmit it.

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use cm_catalogue::factory::{EntityFactory, EventFactory};
use cm_catalogue::validator::{date_range_rules, event_rules, ValidationErrors};
use cm_catalogue::{DateRange, Event, Venue};
use cm_learner_record::BookingStatus;

use crate::auth::Authenticated;
use crate::error::{WebError, WebResult};
use crate::params::{EventContext, ModuleContext};
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

#[derive(Debug, Deserialize)]
struct DateRangeForm {
    #[serde(default)]
    day: String,
    #[serde(default)]
    month: String,
    #[serde(default)]
    year: String,
    #[serde(default, rename = "startHours")]
    start_hours: String,
    #[serde(default, rename = "startMinutes")]
    start_minutes: String,
    #[serde(default, rename = "endHours")]
    end_hours: String,
    #[serde(default, rename = "endMinutes")]
    end_minutes: String,
    #[serde(default, rename = "eventJson")]
    event_json: String,
}

#[derive(Debug, Deserialize)]
struct LocationForm {
    #[serde(default)]
    location: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    capacity: String,
    #[serde(default, rename = "minCapacity")]
    min_capacity: String,
    #[serde(default, rename = "eventJson")]
    event_json: String,
}

#[derive(Debug, Deserialize)]
struct EventJsonForm {
    #[serde(default, rename = "eventJson")]
    event_json: String,
}

#[derive(Debug, Deserialize)]
struct BookingForm {
    #[serde(default)]
    status: String,
    #[serde(default, rename = "cancellationReason")]
    cancellation_reason: String,
}

fn draft_event(event_json: &str) -> Event {
    serde_json::from_str::<Value>(event_json)
        .ok()
        .and_then(|raw| EventFactory.create(raw).ok())
        .unwrap_or(Event {
            id: None,
            date_ranges: vec![],
            venue: None,
        })
}

fn parse_date(form: &DateRangeForm) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        form.year.parse().ok()?,
        form.month.parse().ok()?,
        form.day.parse().ok()?,
    )
}

fn parse_time(hours: &str, minutes: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

fn compose_date_range(form: &DateRangeForm, errors: &mut ValidationErrors) -> Option<DateRange> {
    let date = match parse_date(form) {
        Some(date) => date,
        None => {
            errors.add("date", "validation.module.event.dateRange.invalid");
            return None;
        }
    };

    if date <= Utc::now().date_naive() {
        errors.add("date", "validation.module.event.dateRange.past");
    }

    let start_time = parse_time(&form.start_hours, &form.start_minutes);
    let end_time = parse_time(&form.end_hours, &form.end_minutes);

    let (start_time, end_time) = match (start_time, end_time) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            errors.add("startTime", "validation.module.event.dateRange.time.invalid");
            return None;
        }
    };

    if end_time <= start_time {
        errors.add("endTime", "validation.module.event.dateRange.endBeforeStart");
    }

    if errors.size() > 0 {
        return None;
    }

    Some(DateRange {
        date,
        start_time,
        end_time,
    })
}

fn events_path(course_id: &str, module_id: &str) -> String {
    format!("/content-management/courses/{course_id}/modules/{module_id}/events")
}

async fn get_date_time(
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    let example_year = Utc::now().date_naive().format("%Y").to_string();

    View::new(
        "page/course/module/events/events",
        json!({
            "course": context.course,
            "module": context.module,
            "exampleYear": example_year,
            "flash": flash.into_context(),
        }),
    )
}

async fn set_date_time(
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
    Form(form): Form<DateRangeForm>,
) -> Response {
    let course_id = context.course.id.as_deref().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default();
    let back = events_path(course_id, module_id);

    let candidate = json!({
        "day": form.day,
        "month": form.month,
        "year": form.year,
    });
    let mut errors = date_range_rules().check(&candidate, &["all"]);

    let date_range = if errors.size() == 0 {
        compose_date_range(&form, &mut errors)
    } else {
        None
    };

    let mut event = draft_event(&form.event_json);

    match date_range {
        Some(range) => {
            event.date_ranges.push(range);
            session.put_flash(Flash::form(json!({ "event": event })));
        }
        None => {
            session.put_flash(Flash {
                errors: Some(errors),
                form: Some(json!({ "event": event, "submitted": candidate })),
                message: None,
            });
        }
    }

    see_other(&back)
}

async fn get_location(
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();

    View::new(
        "page/course/module/events/event-location",
        json!({
            "course": context.course,
            "module": context.module,
            "flash": flash.into_context(),
        }),
    )
}

/// The date-range page posts the draft here before the location form is
/// shown; the draft rides the flash across the redirect.
async fn continue_to_location(
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
    Form(form): Form<EventJsonForm>,
) -> Response {
    let course_id = context.course.id.as_deref().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default();

    let event = draft_event(&form.event_json);
    session.put_flash(Flash::form(json!({ "event": event })));

    see_other(&format!("{}/location", events_path(course_id, module_id)))
}

async fn set_location(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: ModuleContext,
    Form(form): Form<LocationForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default().to_string();

    let capacity: i64 = form.capacity.parse().unwrap_or(0);
    let min_capacity: i64 = form.min_capacity.parse().unwrap_or(0);

    let candidate = json!({
        "venue": {
            "location": form.location,
            "address": form.address,
            "capacity": capacity,
            "minCapacity": min_capacity,
        }
    });
    let errors = event_rules().check(&candidate, &["event.location"]);

    if errors.size() > 0 {
        let event = draft_event(&form.event_json);
        session.put_flash(Flash {
            errors: Some(errors),
            form: Some(json!({ "event": event })),
            message: None,
        });
        return Ok(see_other(&format!(
            "{}/location",
            events_path(&course_id, &module_id)
        )));
    }

    let mut event = draft_event(&form.event_json);
    event.venue = Some(Venue {
        location: form.location,
        address: form.address,
        capacity: capacity as u32,
        min_capacity: min_capacity as u32,
    });

    let saved = state
        .catalogue
        .create_event(&course_id, &module_id, &event)
        .await?;

    let event_id = saved.id.as_deref().unwrap_or_default();
    Ok(see_other(&format!(
        "/content-management/courses/{course_id}/modules/{module_id}/events-overview/{event_id}"
    )))
}

async fn get_event(_auth: Authenticated, session: SessionHandle, context: EventContext) -> View {
    let flash = session.take_flash().unwrap_or_default();

    View::new(
        "page/course/module/events/events",
        json!({
            "course": context.course,
            "module": context.module,
            "event": context.event,
            "eventJson": serde_json::to_string(&context.event).unwrap_or_default(),
            "flash": flash.into_context(),
        }),
    )
}

async fn event_overview(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: EventContext,
) -> WebResult<View> {
    let event_id = context.event.id.as_deref().unwrap_or_default();
    let bookings = state
        .learner_record
        .event_bookings(&identity.access_token, event_id)
        .await?;

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/course/module/events/events-overview",
        json!({
            "course": context.course,
            "module": context.module,
            "event": context.event,
            "dateRanges": context.event.sorted_date_ranges(),
            "bookings": bookings,
            "flash": flash.into_context(),
        }),
    ))
}

async fn edit_date_range(
    _auth: Authenticated,
    context: EventContext,
    Path(params): Path<std::collections::HashMap<String, String>>,
) -> WebResult<View> {
    let index: usize = params
        .get("dateRangeIndex")
        .and_then(|raw| raw.parse().ok())
        .ok_or(WebError::NotFound)?;

    let range = context
        .event
        .date_ranges
        .get(index)
        .ok_or(WebError::NotFound)?;

    Ok(View::new(
        "page/course/module/events/event-dateRange-edit",
        json!({
            "day": range.date.format("%d").to_string(),
            "month": range.date.format("%m").to_string(),
            "year": range.date.format("%Y").to_string(),
            "startHours": range.start_time.format("%H").to_string(),
            "startMinutes": range.start_time.format("%M").to_string(),
            "endHours": range.end_time.format("%H").to_string(),
            "endMinutes": range.end_time.format("%M").to_string(),
            "dateRangeIndex": index,
        }),
    ))
}

async fn update_date_range(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    context: EventContext,
    Path(params): Path<std::collections::HashMap<String, String>>,
    Form(form): Form<DateRangeForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default().to_string();
    let event_id = context.event.id.clone().unwrap_or_default();

    let index: usize = params
        .get("dateRangeIndex")
        .and_then(|raw| raw.parse().ok())
        .ok_or(WebError::NotFound)?;

    let mut errors = ValidationErrors::default();
    let range = compose_date_range(&form, &mut errors);

    let range = match range {
        Some(range) if errors.size() == 0 => range,
        _ => {
            session.put_flash(Flash {
                errors: Some(errors),
                form: None,
                message: None,
            });
            return Ok(see_other(&format!(
                "{}/{event_id}/dateRanges/{index}",
                events_path(&course_id, &module_id)
            )));
        }
    };

    let mut event = context.event;
    *event
        .date_ranges
        .get_mut(index)
        .ok_or(WebError::NotFound)? = range;

    state
        .catalogue
        .update_event(&course_id, &module_id, &event_id, &event)
        .await?;

    Ok(see_other(&format!(
        "{}/{event_id}",
        events_path(&course_id, &module_id)
    )))
}

async fn update_booking(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    context: EventContext,
    Path(params): Path<std::collections::HashMap<String, String>>,
    Form(form): Form<BookingForm>,
) -> WebResult<Response> {
    let course_id = context.course.id.clone().unwrap_or_default();
    let module_id = context.module.id().unwrap_or_default().to_string();
    let event_id = context.event.id.clone().unwrap_or_default();

    let booking_id: u64 = params
        .get("bookingId")
        .and_then(|raw| raw.parse().ok())
        .ok_or(WebError::NotFound)?;

    let status = match form.status.as_str() {
        "Confirmed" => BookingStatus::Confirmed,
        "Cancelled" => BookingStatus::Cancelled,
        _ => BookingStatus::Requested,
    };

    let reason = Some(form.cancellation_reason.as_str()).filter(|r| !r.is_empty());

    state
        .learner_record
        .update_booking(&identity.access_token, &event_id, booking_id, status, reason)
        .await?;

    session.put_flash(Flash::message("bookingUpdatedMessage"));
    Ok(see_other(&format!(
        "/content-management/courses/{course_id}/modules/{module_id}/events-overview/{event_id}"
    )))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/{courseId}/modules/{moduleId}/events",
            get(get_date_time).post(set_date_time),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events/location",
            get(get_location).post(set_location),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events/location/create",
            post(continue_to_location),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events/{eventId}",
            get(get_event).post(set_date_time),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events-overview/{eventId}",
            get(event_overview),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events/{eventId}/dateRanges/{dateRangeIndex}",
            get(edit_date_range).post(update_date_range),
        )
        .route(
            "/courses/{courseId}/modules/{moduleId}/events/{eventId}/bookings/{bookingId}",
            post(update_booking),
        )
}
