//! Application state and HTTP router construction

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::db::Database;
use crate::graphql::{CampaignCache, OrganizationRoles, SpokeSchema, build_schema};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub schema: SpokeSchema,
}

impl AppState {
    /// Bootstrap the database schema and build the GraphQL schema on top of it
    pub async fn init(config: Arc<Config>, db: Database) -> Result<Self> {
        db.bootstrap().await?;

        let policy = Arc::new(OrganizationRoles::new(db.clone()));
        let ttl = Duration::from_secs(config.cache_ttl_seconds);
        let cache = Arc::new(CampaignCache::new(ttl));
        cache.spawn_cleanup(ttl);
        let schema = build_schema(db.clone(), config.clone(), policy, cache);
        info!("GraphQL schema built");

        Ok(Self { config, db, schema })
    }
}

/// Build the full Axum router with its layers applied
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(api::health::router())
        .merge(api::graphql::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
