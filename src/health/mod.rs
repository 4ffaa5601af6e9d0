/*!
 * # Health Check Module
 *
 * Public checks for the back-office service:
 *
 * - Liveness (`/health`) - the process is up and serving
 * - Readiness (`/health/ready`) - the database answers and the image store is writable
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthDetail {
    fn up() -> Self {
        Self {
            status: HealthStatus::Up,
            message: None,
        }
    }

    fn down(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Down,
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Readiness {
    pub ready: bool,
    pub timestamp: DateTime<Utc>,
    pub checks: BTreeMap<&'static str, HealthDetail>,
}

#[derive(Clone)]
pub struct HealthState {
    pub db: Arc<DatabaseConnection>,
    pub storage_root: PathBuf,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db: Arc<DatabaseConnection>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            db,
            storage_root: storage_root.into(),
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    async fn check_database(&self) -> HealthDetail {
        match self.db.ping().await {
            Ok(()) => HealthDetail::up(),
            Err(e) => {
                error!("Database health check failed: {}", e);
                HealthDetail::down("database unreachable")
            }
        }
    }

    async fn check_storage(&self) -> HealthDetail {
        match tokio::fs::metadata(&self.storage_root).await {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => HealthDetail::up(),
            Ok(_) => HealthDetail::down("storage root is not a writable directory"),
            Err(e) => {
                error!(root = %self.storage_root.display(), "Storage health check failed: {}", e);
                HealthDetail::down("storage root missing")
            }
        }
    }

    pub async fn readiness(&self) -> Readiness {
        let mut checks = BTreeMap::new();
        checks.insert("database", self.check_database().await);
        checks.insert("storage", self.check_storage().await);
        Readiness {
            ready: checks.values().all(|d| d.status == HealthStatus::Up),
            timestamp: Utc::now(),
            checks,
        }
    }
}

pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    Json(json!({
        "status": HealthStatus::Up,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.uptime(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let readiness = state.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Router to be nested at `/health`.
pub fn health_routes(state: HealthState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
        .with_state(Arc::new(state))
}
