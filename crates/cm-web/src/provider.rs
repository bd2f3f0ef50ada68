//! Learning providers and their cancellation policies and terms and
//! conditions.

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::json;

use cm_catalogue::validator::{
    cancellation_policy_rules, learning_provider_rules, terms_and_conditions_rules,
};
use cm_catalogue::{CancellationPolicy, LearningProvider, TermsAndConditions};

use crate::auth::Authenticated;
use crate::error::{WebError, WebResult};
use crate::home::PageQuery;
use crate::params::ProviderContext;
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

fn providers_path() -> &'static str {
    "/content-management/learning-providers"
}

#[derive(Debug, Deserialize)]
struct ProviderForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CancellationPolicyForm {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "shortVersion")]
    short_version: String,
    #[serde(default, rename = "fullVersion")]
    full_version: String,
}

#[derive(Debug, Deserialize)]
struct TermsForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

async fn index(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<PageQuery>,
) -> WebResult<View> {
    let page_results = state
        .catalogue
        .list_learning_providers(query.pagination())
        .await?;

    Ok(View::new(
        "page/learning-providers",
        json!({ "pageResults": page_results }),
    ))
}

async fn get_learning_provider(_auth: Authenticated, session: SessionHandle) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-learning-provider",
        json!({ "flash": flash.into_context() }),
    )
}

async fn set_learning_provider(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    Form(form): Form<ProviderForm>,
) -> WebResult<Response> {
    let candidate = json!({ "name": form.name });
    let errors = learning_provider_rules().check(&candidate, &["name"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/add-learning-provider",
            providers_path()
        )));
    }

    let provider = LearningProvider {
        id: None,
        name: form.name,
    };
    let created = state.catalogue.create_learning_provider(&provider).await?;

    let id = created.id.as_deref().unwrap_or_default();
    Ok(see_other(&format!("{}/{id}", providers_path())))
}

async fn provider_overview(
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/learning-provider-overview",
        json!({ "learningProvider": provider, "flash": flash.into_context() }),
    )
}

// ---------------------------------------------------------------------------
// Cancellation policies
// ---------------------------------------------------------------------------

async fn get_cancellation_policy(
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-cancellation-policy",
        json!({ "learningProvider": provider, "flash": flash.into_context() }),
    )
}

async fn set_cancellation_policy(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Form(form): Form<CancellationPolicyForm>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let candidate = json!({ "name": form.name });
    let errors = cancellation_policy_rules().check(&candidate, &["name"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/{provider_id}/add-cancellation-policy",
            providers_path()
        )));
    }

    let policy = CancellationPolicy {
        id: None,
        name: form.name,
        short_version: Some(form.short_version),
        full_version: Some(form.full_version),
    };
    state
        .catalogue
        .create_cancellation_policy(&provider_id, &policy)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

async fn edit_cancellation_policy(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Path((_, policy_id)): Path<(String, String)>,
) -> WebResult<View> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let policy = state
        .catalogue
        .get_cancellation_policy(&provider_id, &policy_id)
        .await?
        .ok_or(WebError::NotFound)?;

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/add-cancellation-policy",
        json!({
            "learningProvider": provider,
            "cancellationPolicy": policy,
            "edit": true,
            "flash": flash.into_context(),
        }),
    ))
}

async fn update_cancellation_policy(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Path((_, policy_id)): Path<(String, String)>,
    Form(form): Form<CancellationPolicyForm>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let candidate = json!({ "name": form.name });
    let errors = cancellation_policy_rules().check(&candidate, &["name"]);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/{provider_id}/cancellation-policies/{policy_id}",
            providers_path()
        )));
    }

    let policy = CancellationPolicy {
        id: Some(policy_id),
        name: form.name,
        short_version: Some(form.short_version),
        full_version: Some(form.full_version),
    };
    state
        .catalogue
        .update_cancellation_policy(&provider_id, &policy)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

async fn delete_cancellation_policy(
    State(state): State<AppState>,
    _auth: Authenticated,
    ProviderContext(provider): ProviderContext,
    Path((_, policy_id)): Path<(String, String)>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    state
        .catalogue
        .delete_cancellation_policy(&provider_id, &policy_id)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

// ---------------------------------------------------------------------------
// Terms and conditions
// ---------------------------------------------------------------------------

async fn get_terms_and_conditions(
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/add-terms-and-conditions",
        json!({ "learningProvider": provider, "flash": flash.into_context() }),
    )
}

async fn set_terms_and_conditions(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Form(form): Form<TermsForm>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let candidate = json!({ "name": form.name, "content": form.content });
    let errors = terms_and_conditions_rules().check_all(&candidate);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/{provider_id}/add-terms-and-conditions",
            providers_path()
        )));
    }

    let terms = TermsAndConditions {
        id: None,
        name: form.name,
        content: form.content,
    };
    state
        .catalogue
        .create_terms_and_conditions(&provider_id, &terms)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

async fn edit_terms_and_conditions(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Path((_, terms_id)): Path<(String, String)>,
) -> WebResult<View> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let terms = state
        .catalogue
        .get_terms_and_conditions(&provider_id, &terms_id)
        .await?
        .ok_or(WebError::NotFound)?;

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/add-terms-and-conditions",
        json!({
            "learningProvider": provider,
            "termsAndConditions": terms,
            "edit": true,
            "flash": flash.into_context(),
        }),
    ))
}

async fn update_terms_and_conditions(
    State(state): State<AppState>,
    _auth: Authenticated,
    session: SessionHandle,
    ProviderContext(provider): ProviderContext,
    Path((_, terms_id)): Path<(String, String)>,
    Form(form): Form<TermsForm>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    let candidate = json!({ "name": form.name, "content": form.content });
    let errors = terms_and_conditions_rules().check_all(&candidate);

    if errors.size() > 0 {
        session.put_flash(Flash::errors(errors, candidate));
        return Ok(see_other(&format!(
            "{}/{provider_id}/terms-and-conditions/{terms_id}",
            providers_path()
        )));
    }

    let terms = TermsAndConditions {
        id: Some(terms_id),
        name: form.name,
        content: form.content,
    };
    state
        .catalogue
        .update_terms_and_conditions(&provider_id, &terms)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

async fn delete_terms_and_conditions(
    State(state): State<AppState>,
    _auth: Authenticated,
    ProviderContext(provider): ProviderContext,
    Path((_, terms_id)): Path<(String, String)>,
) -> WebResult<Response> {
    let provider_id = provider.id.clone().unwrap_or_default();

    state
        .catalogue
        .delete_terms_and_conditions(&provider_id, &terms_id)
        .await?;

    Ok(see_other(&format!("{}/{provider_id}", providers_path())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/learning-providers", get(index))
        .route(
            "/learning-providers/add-learning-provider",
            get(get_learning_provider).post(set_learning_provider),
        )
        .route(
            "/learning-providers/{learningProviderId}",
            get(provider_overview),
        )
        .route(
            "/learning-providers/{learningProviderId}/add-cancellation-policy",
            get(get_cancellation_policy).post(set_cancellation_policy),
        )
        .route(
            "/learning-providers/{learningProviderId}/cancellation-policies/{cancellationPolicyId}",
            get(edit_cancellation_policy).post(update_cancellation_policy),
        )
        .route(
            "/learning-providers/{learningProviderId}/cancellation-policies/{cancellationPolicyId}/delete",
            post(delete_cancellation_policy),
        )
        .route(
            "/learning-providers/{learningProviderId}/add-terms-and-conditions",
            get(get_terms_and_conditions).post(set_terms_and_conditions),
        )
        .route(
            "/learning-providers/{learningProviderId}/terms-and-conditions/{termsAndConditionsId}",
            get(edit_terms_and_conditions).post(update_terms_and_conditions),
        )
        .route(
            "/learning-providers/{learningProviderId}/terms-and-conditions/{termsAndConditionsId}/delete",
            post(delete_terms_and_conditions),
        )
}
