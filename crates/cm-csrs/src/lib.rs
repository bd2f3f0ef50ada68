//! Civil-service-reference-service (CSRS) client.
//!
//! Reference data, the signed-in user's profile, organisational units and
//! the skills-quiz API. Calls are made with the signed-in user's bearer
//! token; slow-moving reference data goes through the region-keyed
//! [`ReferenceCache`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use cm_common::{Credentials, RestClient, TransportError};
use cm_config::BackendConfig;
use serde_json::{json, Value};
use thiserror::Error;

pub mod cache;
pub mod model;

pub use cache::{CacheRegion, EvictionPolicy, MaxAge, NeverEvict, ReferenceCache};
pub use model::{
    Choice, CivilServant, Grade, GradesPayload, Interest, InterestsPayload, OrganisationalUnit,
    Profession, Question, Quiz,
};

#[derive(Debug, Error)]
pub enum CsrsError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to decode CSRS payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CsrsError>;

pub struct CsrsClient {
    rest: RestClient,
    cache: Arc<ReferenceCache>,
}

impl CsrsClient {
    pub fn new(config: &BackendConfig, cache: Arc<ReferenceCache>) -> Self {
        Self {
            rest: RestClient::new(
                config.url.clone(),
                Duration::from_millis(config.timeout_ms),
                Credentials::None,
            ),
            cache,
        }
    }

    fn scoped(&self, token: &str) -> RestClient {
        self.rest.with_bearer(token)
    }

    // ------------------------------------------------------------------
    // Organisational units
    // ------------------------------------------------------------------

    /// Flat, normalised list of every organisational unit.
    pub async fn organisations(&self, token: &str) -> Result<Vec<OrganisationalUnit>> {
        let raw = self.scoped(token).get("/organisationalUnits/normalised").await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Organisational units as the upstream tree.
    pub async fn organisational_units_tree(&self, token: &str) -> Result<Vec<OrganisationalUnit>> {
        let raw = self.scoped(token).get("/organisationalUnits/tree").await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn get_organisational_unit(
        &self,
        token: &str,
        unit_id: &str,
    ) -> Result<Option<OrganisationalUnit>> {
        match self
            .scoped(token)
            .get(&format!("/organisationalUnits/{unit_id}"))
            .await
        {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(TransportError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn create_organisational_unit(
        &self,
        token: &str,
        unit: &OrganisationalUnit,
    ) -> Result<OrganisationalUnit> {
        let raw = self
            .scoped(token)
            .post("/organisationalUnits", &serde_json::to_value(unit)?)
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Every organisation code, used when an audience targets all
    /// departments.
    pub async fn all_organisation_codes(&self, token: &str) -> Result<Vec<String>> {
        Ok(self
            .organisations(token)
            .await?
            .into_iter()
            .map(|unit| unit.code)
            .collect())
    }

    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------

    pub async fn grades(&self, token: &str) -> Result<Vec<Grade>> {
        let rest = self.scoped(token);
        let raw = self
            .cache
            .get_or_fetch(CacheRegion::Grades, || async move {
                rest.get("/grades").await
            })
            .await?;
        let payload: GradesPayload = serde_json::from_value(raw)?;
        Ok(payload.embedded.grades)
    }

    pub async fn interests(&self, token: &str) -> Result<Vec<Interest>> {
        let rest = self.scoped(token);
        let raw = self
            .cache
            .get_or_fetch(CacheRegion::Interests, || async move {
                rest.get("/interests").await
            })
            .await?;
        let payload: InterestsPayload = serde_json::from_value(raw)?;
        Ok(payload.embedded.interests)
    }

    pub async fn areas_of_work(&self, token: &str) -> Result<Vec<Profession>> {
        let raw = self.scoped(token).get("/professions/flat").await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn is_grade_code_valid(&self, token: &str, grade_code: &str) -> Result<bool> {
        Ok(self
            .grades(token)
            .await?
            .iter()
            .any(|grade| grade.code == grade_code))
    }

    pub async fn is_area_of_work_valid(&self, token: &str, area_of_work: &str) -> Result<bool> {
        Ok(self
            .areas_of_work(token)
            .await?
            .iter()
            .any(|profession| profession.name == area_of_work))
    }

    pub async fn is_interest_valid(&self, token: &str, interest: &str) -> Result<bool> {
        Ok(self
            .interests(token)
            .await?
            .iter()
            .any(|candidate| candidate.name == interest))
    }

    // ------------------------------------------------------------------
    // Code-to-name mappings
    // ------------------------------------------------------------------

    pub async fn department_code_to_name(&self, token: &str) -> Result<BTreeMap<String, String>> {
        self.cached_mapping(CacheRegion::DepartmentCodeToName, token, |unit| {
            Some((unit.code.clone(), unit.name.clone()))
        })
        .await
    }

    pub async fn department_code_to_abbreviation(
        &self,
        token: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.cached_mapping(CacheRegion::DepartmentCodeToAbbreviation, token, |unit| {
            unit.abbreviation
                .clone()
                .map(|abbreviation| (unit.code.clone(), abbreviation))
        })
        .await
    }

    pub async fn grade_code_to_name(&self, token: &str) -> Result<BTreeMap<String, String>> {
        let grades = self.grades(token).await?;
        let raw = self
            .cache
            .get_or_fetch(CacheRegion::GradeCodeToName, || async move {
                let mapping: BTreeMap<String, String> = grades
                    .into_iter()
                    .map(|grade| (grade.code, grade.name))
                    .collect();
                Ok::<_, TransportError>(json!(mapping))
            })
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn cached_mapping(
        &self,
        region: CacheRegion,
        token: &str,
        entry: impl Fn(&OrganisationalUnit) -> Option<(String, String)>,
    ) -> Result<BTreeMap<String, String>> {
        if let Some(raw) = self.cache.get(region) {
            return Ok(serde_json::from_value(raw)?);
        }

        let mapping: BTreeMap<String, String> = self
            .organisations(token)
            .await?
            .iter()
            .filter_map(entry)
            .collect();
        self.cache.put(region, json!(mapping));
        Ok(mapping)
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    pub async fn civil_servant_me(&self, token: &str) -> Result<CivilServant> {
        let raw = self.scoped(token).get("/civilServants/me").await?;
        Ok(serde_json::from_value(raw)?)
    }

    // ------------------------------------------------------------------
    // Skills quizzes
    // ------------------------------------------------------------------

    pub async fn create_quiz_for_profession(&self, token: &str, profession_id: u64) -> Result<Value> {
        Ok(self
            .scoped(token)
            .post_without_following("/api/quiz", &json!({ "id": profession_id }))
            .await?)
    }

    /// Quiz details for a profession; `None` when no quiz exists yet.
    pub async fn quiz_info(&self, token: &str, profession_id: u64) -> Result<Option<Quiz>> {
        match self
            .scoped(token)
            .get(&format!("/api/quiz/{profession_id}/info"))
            .await
        {
            Ok(raw) => Ok(Some(serde_json::from_value(raw)?)),
            Err(TransportError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn questions_for_profession(&self, token: &str, profession_id: u64) -> Result<Value> {
        Ok(self
            .scoped(token)
            .get(&format!("/api/quiz?professionId={profession_id}&limit=10"))
            .await?)
    }

    pub async fn add_question(&self, token: &str, question: &Question) -> Result<Value> {
        Ok(self
            .scoped(token)
            .post_without_following("/api/questions/add-question", &serde_json::to_value(question)?)
            .await?)
    }

    pub async fn delete_quiz(&self, token: &str, profession_id: u64) -> Result<()> {
        Ok(self
            .scoped(token)
            .delete(&format!("/api/quiz/{profession_id}/delete"))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CsrsClient {
        CsrsClient::new(
            &BackendConfig {
                url: server.uri(),
                timeout_ms: 5_000,
            },
            Arc::new(ReferenceCache::default()),
        )
    }

    async fn mount_grades(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(url_path("/grades"))
            .and(bearer_token("tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_embedded": {"grades": [
                    {"code": "AA", "name": "Administrative assistant"},
                    {"code": "G7", "name": "Grade 7"}
                ]}
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn grades_are_fetched_once_then_cached() {
        let server = MockServer::start().await;
        mount_grades(&server, 1).await;

        let csrs = client(&server);
        let first = csrs.grades("tok").await.unwrap();
        let second = csrs.grades("tok").await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn grade_code_membership_uses_the_cached_listing() {
        let server = MockServer::start().await;
        mount_grades(&server, 1).await;

        let csrs = client(&server);
        assert!(csrs.is_grade_code_valid("tok", "G7").await.unwrap());
        assert!(!csrs.is_grade_code_valid("tok", "SCS").await.unwrap());
    }

    #[tokio::test]
    async fn department_mapping_is_built_from_normalised_organisations() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/organisationalUnits/normalised"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Cabinet Office", "code": "co", "abbreviation": "CO"},
                {"name": "HM Revenue & Customs", "code": "hmrc", "abbreviation": "HMRC"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let csrs = client(&server);
        let mapping = csrs.department_code_to_name("tok").await.unwrap();
        assert_eq!(mapping["co"], "Cabinet Office");

        // second mapping read comes from the cache
        let again = csrs.department_code_to_name("tok").await.unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn missing_quiz_resolves_to_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/api/quiz/14/info"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client(&server).quiz_info("tok", 14).await.unwrap().is_none());
    }
}
