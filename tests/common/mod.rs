#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use inventory_admin::{
    config::AppConfig,
    db::{self, DbConfig},
    repositories::Repository,
    validation::FormInput,
    AppState,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789abcdef";

/// One part of a multipart submission.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Helper harness for spinning up the full router over an in-memory SQLite
/// database and a throwaway storage directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    storage: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let storage = TempDir::new().expect("create storage dir");

        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let mut cfg = AppConfig::new("sqlite::memory:", ADMIN_TOKEN);
        cfg.environment = "test".to_string();
        cfg.storage_root = storage.path().to_string_lossy().into_owned();

        let state = AppState::new(Arc::new(pool), cfg);
        let router = inventory_admin::build_router(&state);

        Self {
            router,
            state,
            storage,
        }
    }

    pub fn storage_path(&self) -> &std::path::Path {
        self.storage.path()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request with an optional JSON body, authenticated as the admin.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN));
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize json request body"))
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("build request")).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None).await
    }

    pub async fn multipart(&self, method: Method, uri: &str, parts: &[Part<'_>]) -> Response {
        let (content_type, body) = multipart_body(parts);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("build multipart request");
        self.send(request).await
    }

    pub async fn category(&self, name: &str, slug: &str) -> i32 {
        let input = FormInput::new().with_text("name", name).with_text("slug", slug);
        self.state
            .repositories
            .categories
            .create(input)
            .await
            .expect("seed category")
            .record
            .id
    }

    pub async fn unit(&self, name: &str, code: &str) -> i32 {
        let input = FormInput::new().with_text("name", name).with_text("code", code);
        self.state
            .repositories
            .units
            .create(input)
            .await
            .expect("seed unit")
            .record
            .id
    }

    pub async fn vehicle_brand(&self, name: &str) -> i32 {
        self.state
            .repositories
            .vehicle_brands
            .create(FormInput::new().with_text("name", name))
            .await
            .expect("seed vehicle brand")
            .record
            .id
    }
}

pub async fn body_json(response: Response) -> Value {
    let body = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&body).expect("json body")
}

pub fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// A small but well-formed PNG header followed by `len - 8` padding bytes.
pub fn png(len: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(len.max(8), 0);
    bytes
}

pub fn multipart_body(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "----inventory-admin-test-boundary";
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
