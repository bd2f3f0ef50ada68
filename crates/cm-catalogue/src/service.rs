//! Generic entity service - composes the transport adapter and an entity
//! factory into list/get/create/update/delete operations for one upstream
//! resource type.

use std::sync::Arc;

use cm_common::{RestClient, TransportError};
use serde_json::Value;

use crate::error::Result;
use crate::factory::EntityFactory;
use crate::page::PageResults;

pub struct EntityService<T> {
    rest: Arc<RestClient>,
    factory: Arc<dyn EntityFactory<T>>,
}

impl<T> EntityService<T> {
    pub fn new(rest: Arc<RestClient>, factory: Arc<dyn EntityFactory<T>>) -> Self {
        Self { rest, factory }
    }

    /// GET a paged listing; page metadata is preserved verbatim and every
    /// raw item is mapped through the factory.
    pub async fn list_all(&self, path: &str) -> Result<PageResults<T>> {
        let data = self.rest.get(path).await?;

        let results = data
            .get("results")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| self.factory.create(item.clone()))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(PageResults {
            page: data.get("page").and_then(Value::as_u64).unwrap_or(0) as u32,
            size: data.get("size").and_then(Value::as_u64).unwrap_or(0) as u32,
            total_results: data.get("totalResults").and_then(Value::as_u64).unwrap_or(0),
            results,
        })
    }

    /// GET one entity; `None` when the upstream reports it missing.
    pub async fn get(&self, path: &str) -> Result<Option<T>> {
        match self.rest.get(path).await {
            Ok(data) => Ok(Some(self.factory.create(data)?)),
            Err(TransportError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// POST, follow the `Location` header, and map the created resource.
    pub async fn create(&self, path: &str, entity: &Value) -> Result<T> {
        let data = self.rest.post(path, entity).await?;
        Ok(self.factory.create(data)?)
    }

    /// PUT a whole-resource replacement and map the confirmed state.
    pub async fn update(&self, path: &str, entity: &Value) -> Result<T> {
        let data = self.rest.put(path, entity).await?;
        Ok(self.factory.create(data)?)
    }

    /// PATCH a partial update and map the confirmed state.
    pub async fn patch(&self, path: &str, partial: &Value) -> Result<T> {
        let data = self.rest.patch(path, partial).await?;
        Ok(self.factory.create(data)?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.rest.delete(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::CourseFactory;
    use crate::model::Course;
    use cm_common::Credentials;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path as url_path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> EntityService<Course> {
        EntityService::new(
            Arc::new(RestClient::new(
                server.uri(),
                Duration::from_secs(5),
                Credentials::None,
            )),
            Arc::new(CourseFactory::default()),
        )
    }

    #[tokio::test]
    async fn list_all_preserves_page_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses"))
            .and(query_param("page", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 0,
                "size": 10,
                "totalResults": 23,
                "results": [
                    {"id": "c1", "title": "Course one"},
                    {"id": "c2", "title": "Course two"}
                ]
            })))
            .mount(&server)
            .await;

        let page = service(&server).list_all("/courses?page=0&size=10").await.unwrap();

        assert_eq!(page.page, 0);
        assert_eq!(page.size, 10);
        assert_eq!(page.total_results, 23);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].title, "Course one");
    }

    #[tokio::test]
    async fn get_maps_upstream_404_to_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(url_path("/courses/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let course = service(&server).get("/courses/missing").await.unwrap();
        assert!(course.is_none());
    }

    #[tokio::test]
    async fn create_follows_location_and_maps_the_resource() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(url_path("/courses"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", format!("{}/courses/c9", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/courses/c9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c9",
                "title": "Intro to X"
            })))
            .mount(&server)
            .await;

        let course = service(&server)
            .create("/courses", &json!({"title": "Intro to X"}))
            .await
            .unwrap();

        assert_eq!(course.id.as_deref(), Some("c9"));
        assert_eq!(course.title, "Intro to X");
    }
}
