//! Catalogue Manager Server
//!
//! Internal content-management application for the learning catalogue.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CM_CONFIG` | - | Path to a TOML config file |
//! | `CM_HTTP_PORT` | `3005` | HTTP port |
//! | `CM_CATALOGUE_URL` | `http://localhost:9001` | learning-catalogue base URL |
//! | `CM_CSRS_URL` | `http://localhost:9002` | CSRS base URL |
//! | `CM_LEARNER_RECORD_URL` | `http://localhost:9002` | learner-record base URL |
//! | `CM_IDENTITY_URL` | `http://localhost:8080` | identity service base URL |
//! | `CM_OAUTH_CLIENT_ID` | `catalogue-manager` | OAuth2 client id |
//! | `CM_OAUTH_CLIENT_SECRET` | - | OAuth2 client secret |
//! | `CM_CALLBACK_URL` | `http://localhost:3005` | external URL of this app |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cm_catalogue::LearningCatalogue;
use cm_config::ConfigLoader;
use cm_csrs::{CsrsClient, ReferenceCache};
use cm_learner_record::LearnerRecord;
use cm_web::{build_router, AppState, OauthClient, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    cm_common::logging::init_logging("cm-server");

    info!("Starting Catalogue Manager");

    let config = ConfigLoader::new().load()?;

    let catalogue = Arc::new(LearningCatalogue::new(&config.catalogue));
    let csrs = Arc::new(CsrsClient::new(
        &config.csrs,
        Arc::new(ReferenceCache::default()),
    ));
    let learner_record = Arc::new(LearnerRecord::new(&config.learner_record));
    let oauth = Arc::new(OauthClient::new(config.identity.clone()));

    let state = AppState {
        catalogue,
        csrs,
        learner_record,
        oauth,
        sessions: Arc::new(SessionStore::default()),
        session_config: config.session.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!(%addr, "Catalogue Manager listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(%err, "failed to install shutdown handler");
    }
    info!("Shutting down");
}
