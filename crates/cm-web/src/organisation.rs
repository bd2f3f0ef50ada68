//! Organisational unit management (CSRS-backed).

use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use cm_common::TransportError;
use cm_csrs::{CsrsError, OrganisationalUnit};

use cm_catalogue::validator::organisational_unit_rules;

use crate::auth::Authenticated;
use crate::error::{WebError, WebResult};
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

#[derive(Debug, Deserialize)]
struct OrganisationForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    abbreviation: String,
    #[serde(default)]
    parent: String,
}

async fn get_organisations(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> WebResult<View> {
    let organisational_units = state
        .csrs
        .organisational_units_tree(&identity.access_token)
        .await?;

    Ok(View::new(
        "page/organisation/manage-organisations",
        json!({ "organisationalUnits": organisational_units }),
    ))
}

async fn add_organisation(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
) -> WebResult<View> {
    let organisational_units = state.csrs.organisations(&identity.access_token).await?;
    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/organisation/add-organisation",
        json!({
            "organisationalUnits": organisational_units,
            "flash": flash.into_context(),
        }),
    ))
}

async fn create_organisation(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    Form(form): Form<OrganisationForm>,
) -> WebResult<Response> {
    let candidate = json!({
        "name": form.name,
        "code": form.code,
        "abbreviation": form.abbreviation,
        "parent": form.parent,
    });
    let errors = organisational_unit_rules().check_all(&candidate);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other("/content-management/add-organisation"));
    }

    let unit = OrganisationalUnit {
        id: None,
        name: form.name,
        code: form.code,
        abbreviation: Some(form.abbreviation).filter(|a| !a.is_empty()),
        payment_methods: vec![],
        sub_orgs: vec![],
        parent: Some(form.parent).filter(|p| !p.is_empty()),
    };

    match state
        .csrs
        .create_organisational_unit(&identity.access_token, &unit)
        .await
    {
        Ok(created) => {
            session.put_flash(Flash::message("organisationAddedSuccessMessage"));
            let id = created.id.as_deref().unwrap_or_default();
            Ok(see_other(&format!(
                "/content-management/organisations/{id}/overview"
            )))
        }
        // the upstream rejects duplicate codes; surface it as a form error
        Err(CsrsError::Transport(TransportError::Status { status, .. }))
            if status == StatusCode::CONFLICT =>
        {
            let mut errors = cm_catalogue::ValidationErrors::default();
            errors.add(
                "organisation",
                "organisations.validation.organisation.alreadyExists",
            );
            session.put_flash(Flash::errors(errors, candidate_for_retry(&unit)));
            Ok(see_other("/content-management/add-organisation"))
        }
        Err(err) => Err(WebError::from(err)),
    }
}

fn candidate_for_retry(unit: &OrganisationalUnit) -> serde_json::Value {
    json!({
        "name": unit.name,
        "code": unit.code,
        "abbreviation": unit.abbreviation,
        "parent": unit.parent,
    })
}

async fn organisation_overview(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    Path(organisation_id): Path<String>,
) -> WebResult<View> {
    let organisational_unit = state
        .csrs
        .get_organisational_unit(&identity.access_token, &organisation_id)
        .await?
        .ok_or(WebError::NotFound)?;

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/organisation/organisation-overview",
        json!({
            "organisationalUnit": organisational_unit,
            "flash": flash.into_context(),
        }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/organisations", get(get_organisations))
        .route("/add-organisation", get(add_organisation))
        .route("/organisations/organisation", post(create_organisation))
        .route(
            "/organisations/{organisationId}/overview",
            get(organisation_overview),
        )
}
