//! End-to-end wizard behaviour against stubbed upstream services.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cm_catalogue::LearningCatalogue;
use cm_config::{BackendConfig, CatalogueConfig, IdentityConfig, SessionConfig};
use cm_csrs::{CsrsClient, ReferenceCache};
use cm_learner_record::LearnerRecord;
use cm_web::{build_router, AppState, Identity, OauthClient, SessionStore};

struct Harness {
    router: Router,
    state: AppState,
    catalogue: MockServer,
    // held so the stubbed CSRS/learner-record endpoints stay up
    _csrs: MockServer,
}

async fn harness() -> Harness {
    let catalogue = MockServer::start().await;
    let csrs = MockServer::start().await;

    let state = AppState {
        catalogue: Arc::new(LearningCatalogue::new(&CatalogueConfig {
            url: catalogue.uri(),
            username: "user".into(),
            password: "password".into(),
            timeout_ms: 5_000,
        })),
        csrs: Arc::new(CsrsClient::new(
            &BackendConfig {
                url: csrs.uri(),
                timeout_ms: 5_000,
            },
            Arc::new(ReferenceCache::default()),
        )),
        learner_record: Arc::new(LearnerRecord::new(&BackendConfig {
            url: csrs.uri(),
            timeout_ms: 5_000,
        })),
        oauth: Arc::new(OauthClient::new(IdentityConfig {
            url: "http://identity.invalid".into(),
            client_id: "catalogue-manager".into(),
            client_secret: "secret".into(),
            callback_url: "http://localhost:3005".into(),
            timeout_ms: 5_000,
        })),
        sessions: Arc::new(SessionStore::default()),
        session_config: SessionConfig::default(),
    };

    Harness {
        router: build_router(state.clone()),
        state,
        catalogue,
        _csrs: csrs,
    }
}

fn signed_in_cookie(state: &AppState) -> String {
    let id = state.sessions.create();
    state.sessions.set_identity(
        id,
        Identity {
            uid: "manager-1".into(),
            roles: vec!["LEARNING_MANAGER".into()],
            access_token: "tok".into(),
        },
    );
    format!("{}={id}", state.session_config.cookie_name)
}

fn form_post(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn empty_course_title_redirects_back_with_flashed_errors() {
    let harness = harness().await;
    let cookie = signed_in_cookie(&harness.state);

    let response = harness
        .router
        .clone()
        .oneshot(form_post(
            "/content-management/courses/add-course-title",
            &cookie,
            "title=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/content-management/courses/add-course-title"
    );

    // the next render consumes the flash
    let view = harness
        .router
        .clone()
        .oneshot(get("/content-management/courses/add-course-title", &cookie))
        .await
        .unwrap();
    let body = body_json(view).await;

    assert_eq!(
        body["context"]["flash"]["errors"]["fields"]["title"][0],
        "validation.course.title.empty"
    );

    // consume-once: a second render sees no errors
    let view = harness
        .router
        .clone()
        .oneshot(get("/content-management/courses/add-course-title", &cookie))
        .await
        .unwrap();
    let body = body_json(view).await;
    assert!(body["context"]["flash"]["errors"].is_null());
}

#[tokio::test]
async fn valid_course_title_advances_to_the_details_step() {
    let harness = harness().await;
    let cookie = signed_in_cookie(&harness.state);

    let response = harness
        .router
        .clone()
        .oneshot(form_post(
            "/content-management/courses/add-course-title",
            &cookie,
            "title=Intro+to+X",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/content-management/courses/add-course-details"
    );
}

#[tokio::test]
async fn course_details_step_creates_the_course_and_lands_on_overview() {
    let harness = harness().await;
    let cookie = signed_in_cookie(&harness.state);

    Mock::given(method("POST"))
        .and(url_path("/courses"))
        .respond_with(ResponseTemplate::new(201).insert_header(
            "Location",
            format!("{}/courses/c9", harness.catalogue.uri()),
        ))
        .mount(&harness.catalogue)
        .await;
    Mock::given(method("GET"))
        .and(url_path("/courses/c9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c9",
            "title": "Intro to X",
            "shortDescription": "short",
            "description": "long"
        })))
        .mount(&harness.catalogue)
        .await;

    let response = harness
        .router
        .clone()
        .oneshot(form_post(
            "/content-management/courses/add-course-details",
            &cookie,
            "title=Intro+to+X&shortDescription=short&description=long&learningOutcomes=outcomes",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/content-management/courses/c9/overview");
}

#[tokio::test]
async fn module_routes_answer_404_when_the_course_is_missing() {
    let harness = harness().await;
    let cookie = signed_in_cookie(&harness.state);

    Mock::given(method("GET"))
        .and(url_path("/courses/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&harness.catalogue)
        .await;

    let response = harness
        .router
        .clone()
        .oneshot(get("/content-management/courses/missing/add-module", &cookie))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unauthenticated_requests_are_bounced_to_sign_in() {
    let harness = harness().await;

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/content-management/courses/add-course-title")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/sign-in");
}

#[tokio::test]
async fn audience_name_step_flashes_and_returns_on_validation_failure() {
    let harness = harness().await;
    let cookie = signed_in_cookie(&harness.state);

    Mock::given(method("GET"))
        .and(url_path("/courses/c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "c1",
            "title": "Working with budgets"
        })))
        .mount(&harness.catalogue)
        .await;

    let long_name = "x".repeat(41);
    let response = harness
        .router
        .clone()
        .oneshot(form_post(
            "/content-management/courses/c1/audiences",
            &cookie,
            &format!("name={long_name}"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/content-management/courses/c1/audiences");

    let view = harness
        .router
        .clone()
        .oneshot(get("/content-management/courses/c1/audiences", &cookie))
        .await
        .unwrap();
    let body = body_json(view).await;
    assert_eq!(
        body["context"]["flash"]["errors"]["fields"]["name"][0],
        "audience.validation.name.maxLength"
    );
}
