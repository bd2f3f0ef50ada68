//! Shared application state.

use std::sync::Arc;

use cm_catalogue::LearningCatalogue;
use cm_config::SessionConfig;
use cm_csrs::CsrsClient;
use cm_learner_record::LearnerRecord;

use crate::auth::OauthClient;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub catalogue: Arc<LearningCatalogue>,
    pub csrs: Arc<CsrsClient>,
    pub learner_record: Arc<LearnerRecord>,
    pub oauth: Arc<OauthClient>,
    pub sessions: Arc<SessionStore>,
    pub session_config: SessionConfig,
}
