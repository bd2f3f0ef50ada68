//! Landing page - the paged course listing.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use cm_catalogue::Pagination;

use crate::auth::Authenticated;
use crate::error::WebResult;
use crate::state::AppState;
use crate::view::View;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

impl PageQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page.as_deref(), self.size.as_deref())
    }
}

async fn index(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<PageQuery>,
) -> WebResult<View> {
    let page_results = state.catalogue.list_courses(query.pagination()).await?;

    Ok(View::new("index", json!({ "pageResults": page_results })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}
