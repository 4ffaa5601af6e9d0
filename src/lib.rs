//! Inventory back-office library
//!
//! Products, categories, units of measure and vehicle brands/variants behind
//! an admin-guarded HTTP surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod pagination;
pub mod presenter;
pub mod repositories;
pub mod storage;
pub mod tracing;
pub mod validation;

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::auth::{AdminGuard, AuthRouterExt};
use crate::config::AppConfig;
use crate::health::HealthState;
use crate::storage::LocalImageStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub images: Arc<LocalImageStore>,
    pub repositories: handlers::Repositories,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: AppConfig) -> Self {
        let images = Arc::new(LocalImageStore::new(
            &config.storage_root,
            config.storage_public_prefix.clone(),
        ));
        let repositories = handlers::Repositories::new(db.clone(), images.clone());
        Self {
            db,
            config,
            images,
            repositories,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    } else if config.is_development() {
        ::tracing::info!("Using permissive CORS in the development environment");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router: guarded back-office routes, public health
/// checks and the read-only image mount.
pub fn build_router(state: &AppState) -> Router {
    let config = &state.config;
    let admin = handlers::admin_routes(&state.repositories)
        .with_auth(AdminGuard::new(&config.admin_token));
    let health = health::health_routes(HealthState::new(
        state.db.clone(),
        state.images.root().to_path_buf(),
    ));

    Router::new()
        .merge(admin)
        .nest("/health", health)
        .nest_service(
            &config.storage_public_prefix,
            ServeDir::new(state.images.root()),
        )
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(config))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}
