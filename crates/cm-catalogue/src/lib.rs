//! Learning-catalogue access layer.
//!
//! [`LearningCatalogue`] is the single entry point the web layer talks to.
//! It wires one [`EntityService`] per upstream resource type, each
//! composing the shared transport adapter with that entity's factory.

use std::sync::Arc;
use std::time::Duration;

use cm_common::{Credentials, RestClient};
use cm_config::CatalogueConfig;
use serde_json::Value;

pub mod error;
pub mod factory;
pub mod model;
pub mod page;
pub mod service;
pub mod validator;

pub use error::{CatalogueError, FactoryError, Result};
pub use model::{
    Audience, AudienceType, CancellationPolicy, Course, DateRange, Event, LearningProvider,
    Media, Module, ModuleCore, Price, TermsAndConditions, Venue, MODULE_TYPES,
};
pub use page::{PageResults, Pagination};
pub use validator::{ValidationErrors, Validator};

use factory::{
    AudienceFactory, CancellationPolicyFactory, CourseFactory, EventFactory,
    LearningProviderFactory, ModuleFactory, TermsAndConditionsFactory,
};
use service::EntityService;

pub struct LearningCatalogue {
    rest: Arc<RestClient>,
    courses: EntityService<Course>,
    modules: EntityService<Module>,
    events: EntityService<Event>,
    audiences: EntityService<Audience>,
    learning_providers: EntityService<LearningProvider>,
    cancellation_policies: EntityService<CancellationPolicy>,
    terms_and_conditions: EntityService<TermsAndConditions>,
}

impl LearningCatalogue {
    pub fn new(config: &CatalogueConfig) -> Self {
        let rest = Arc::new(RestClient::new(
            config.url.clone(),
            Duration::from_millis(config.timeout_ms),
            Credentials::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            },
        ));

        Self {
            courses: EntityService::new(rest.clone(), Arc::new(CourseFactory::default())),
            modules: EntityService::new(rest.clone(), Arc::new(ModuleFactory::default())),
            events: EntityService::new(rest.clone(), Arc::new(EventFactory)),
            audiences: EntityService::new(rest.clone(), Arc::new(AudienceFactory)),
            learning_providers: EntityService::new(
                rest.clone(),
                Arc::new(LearningProviderFactory),
            ),
            cancellation_policies: EntityService::new(
                rest.clone(),
                Arc::new(CancellationPolicyFactory),
            ),
            terms_and_conditions: EntityService::new(
                rest.clone(),
                Arc::new(TermsAndConditionsFactory),
            ),
            rest,
        }
    }

    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    pub async fn list_courses(&self, pagination: Pagination) -> Result<PageResults<Course>> {
        self.courses
            .list_all(&format!("/courses?{}", pagination.query_string()))
            .await
    }

    pub async fn create_course(&self, course: &Course) -> Result<Course> {
        self.courses
            .create("/courses", &serde_json::to_value(course)?)
            .await
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        self.courses.get(&format!("/courses/{course_id}")).await
    }

    pub async fn update_course(&self, course: &Course) -> Result<Course> {
        let id = course.id.as_deref().unwrap_or_default();
        self.courses
            .update(&format!("/courses/{id}"), &serde_json::to_value(course)?)
            .await
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    pub async fn create_module(&self, course_id: &str, module: &Module) -> Result<Module> {
        self.modules
            .create(
                &format!("/courses/{course_id}/modules"),
                &serde_json::to_value(module)?,
            )
            .await
    }

    pub async fn get_module(&self, course_id: &str, module_id: &str) -> Result<Option<Module>> {
        self.modules
            .get(&format!("/courses/{course_id}/modules/{module_id}"))
            .await
    }

    pub async fn update_module(&self, course_id: &str, module: &Module) -> Result<Module> {
        let id = module.id().unwrap_or_default();
        self.modules
            .update(
                &format!("/courses/{course_id}/modules/{id}"),
                &serde_json::to_value(module)?,
            )
            .await
    }

    pub async fn delete_module(&self, course_id: &str, module_id: &str) -> Result<()> {
        self.modules
            .delete(&format!("/courses/{course_id}/modules/{module_id}"))
            .await
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub async fn create_event(
        &self,
        course_id: &str,
        module_id: &str,
        event: &Event,
    ) -> Result<Event> {
        self.events
            .create(
                &format!("/courses/{course_id}/modules/{module_id}/events"),
                &serde_json::to_value(event)?,
            )
            .await
    }

    pub async fn get_event(
        &self,
        course_id: &str,
        module_id: &str,
        event_id: &str,
    ) -> Result<Option<Event>> {
        self.events
            .get(&format!(
                "/courses/{course_id}/modules/{module_id}/events/{event_id}"
            ))
            .await
    }

    pub async fn update_event(
        &self,
        course_id: &str,
        module_id: &str,
        event_id: &str,
        event: &Event,
    ) -> Result<Event> {
        self.events
            .update(
                &format!("/courses/{course_id}/modules/{module_id}/events/{event_id}"),
                &serde_json::to_value(event)?,
            )
            .await
    }

    // ------------------------------------------------------------------
    // Audiences
    // ------------------------------------------------------------------

    pub async fn create_audience(&self, course_id: &str, audience: &Audience) -> Result<Audience> {
        self.audiences
            .create(
                &format!("/courses/{course_id}/audiences"),
                &serde_json::to_value(audience)?,
            )
            .await
    }

    pub async fn get_audience(
        &self,
        course_id: &str,
        audience_id: &str,
    ) -> Result<Option<Audience>> {
        self.audiences
            .get(&format!("/courses/{course_id}/audiences/{audience_id}"))
            .await
    }

    pub async fn update_audience(&self, course_id: &str, audience: &Audience) -> Result<Audience> {
        let id = audience.id.as_deref().unwrap_or_default();
        self.audiences
            .update(
                &format!("/courses/{course_id}/audiences/{id}"),
                &serde_json::to_value(audience)?,
            )
            .await
    }

    pub async fn delete_audience(&self, course_id: &str, audience_id: &str) -> Result<()> {
        self.audiences
            .delete(&format!("/courses/{course_id}/audiences/{audience_id}"))
            .await
    }

    // ------------------------------------------------------------------
    // Learning providers and their sub-resources
    // ------------------------------------------------------------------

    pub async fn list_learning_providers(
        &self,
        pagination: Pagination,
    ) -> Result<PageResults<LearningProvider>> {
        self.learning_providers
            .list_all(&format!("/learning-providers?{}", pagination.query_string()))
            .await
    }

    pub async fn get_learning_provider(
        &self,
        provider_id: &str,
    ) -> Result<Option<LearningProvider>> {
        self.learning_providers
            .get(&format!("/learning-providers/{provider_id}"))
            .await
    }

    pub async fn create_learning_provider(
        &self,
        provider: &LearningProvider,
    ) -> Result<LearningProvider> {
        self.learning_providers
            .create("/learning-providers", &serde_json::to_value(provider)?)
            .await
    }

    pub async fn get_cancellation_policy(
        &self,
        provider_id: &str,
        policy_id: &str,
    ) -> Result<Option<CancellationPolicy>> {
        self.cancellation_policies
            .get(&format!(
                "/learning-providers/{provider_id}/cancellation-policies/{policy_id}"
            ))
            .await
    }

    pub async fn create_cancellation_policy(
        &self,
        provider_id: &str,
        policy: &CancellationPolicy,
    ) -> Result<CancellationPolicy> {
        self.cancellation_policies
            .create(
                &format!("/learning-providers/{provider_id}/cancellation-policies"),
                &serde_json::to_value(policy)?,
            )
            .await
    }

    pub async fn update_cancellation_policy(
        &self,
        provider_id: &str,
        policy: &CancellationPolicy,
    ) -> Result<CancellationPolicy> {
        let id = policy.id.as_deref().unwrap_or_default();
        self.cancellation_policies
            .update(
                &format!("/learning-providers/{provider_id}/cancellation-policies/{id}"),
                &serde_json::to_value(policy)?,
            )
            .await
    }

    pub async fn delete_cancellation_policy(
        &self,
        provider_id: &str,
        policy_id: &str,
    ) -> Result<()> {
        self.cancellation_policies
            .delete(&format!(
                "/learning-providers/{provider_id}/cancellation-policies/{policy_id}"
            ))
            .await
    }

    pub async fn get_terms_and_conditions(
        &self,
        provider_id: &str,
        terms_id: &str,
    ) -> Result<Option<TermsAndConditions>> {
        self.terms_and_conditions
            .get(&format!(
                "/learning-providers/{provider_id}/terms-and-conditions/{terms_id}"
            ))
            .await
    }

    pub async fn create_terms_and_conditions(
        &self,
        provider_id: &str,
        terms: &TermsAndConditions,
    ) -> Result<TermsAndConditions> {
        self.terms_and_conditions
            .create(
                &format!("/learning-providers/{provider_id}/terms-and-conditions"),
                &serde_json::to_value(terms)?,
            )
            .await
    }

    pub async fn update_terms_and_conditions(
        &self,
        provider_id: &str,
        terms: &TermsAndConditions,
    ) -> Result<TermsAndConditions> {
        let id = terms.id.as_deref().unwrap_or_default();
        self.terms_and_conditions
            .update(
                &format!("/learning-providers/{provider_id}/terms-and-conditions/{id}"),
                &serde_json::to_value(terms)?,
            )
            .await
    }

    pub async fn delete_terms_and_conditions(
        &self,
        provider_id: &str,
        terms_id: &str,
    ) -> Result<()> {
        self.terms_and_conditions
            .delete(&format!(
                "/learning-providers/{provider_id}/terms-and-conditions/{terms_id}"
            ))
            .await
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    /// Metadata for an uploaded file, used when a file module is created.
    pub async fn get_media(&self, media_id: &str) -> Result<Media> {
        let raw: Value = self.rest.get(&format!("/media/{media_id}")).await?;
        Ok(serde_json::from_value(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalogue(server: &MockServer) -> LearningCatalogue {
        LearningCatalogue::new(&CatalogueConfig {
            url: server.uri(),
            username: "user".into(),
            password: "password".into(),
            timeout_ms: 5_000,
        })
    }

    #[tokio::test]
    async fn audience_crud_targets_the_nested_resource() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses/c1/audiences/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a1",
                "name": "Finance staff",
                "type": "OPEN"
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(url_path("/courses/c1/audiences/a1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let catalogue = catalogue(&server);

        let audience = catalogue.get_audience("c1", "a1").await.unwrap().unwrap();
        assert_eq!(audience.audience_type, Some(AudienceType::Open));

        catalogue.delete_audience("c1", "a1").await.unwrap();
    }

    #[tokio::test]
    async fn missing_course_resolves_to_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(catalogue(&server).get_course("nope").await.unwrap().is_none());
    }
}
