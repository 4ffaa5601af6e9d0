//! Admin guard for the back-office routes.
//!
//! Every management screen sits behind a single shared bearer token. The
//! guard only answers pass or fail; there are no users, roles or sessions.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::errors::ServiceError;

/// Marker inserted into request extensions once the guard has passed.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

/// Holds the SHA-256 digest of the configured admin token.
#[derive(Clone)]
pub struct AdminGuard {
    digest: [u8; 32],
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard").finish_non_exhaustive()
    }
}

impl AdminGuard {
    pub fn new(token: &str) -> Self {
        Self {
            digest: Sha256::digest(token.as_bytes()).into(),
        }
    }

    /// Constant-time comparison of the two digests.
    pub fn verify(&self, presented: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ServiceError> {
        let token = bearer_token(headers)
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".to_string()))?;
        if self.verify(token) {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized("Invalid token".to_string()))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects requests without a valid admin bearer token.
pub async fn auth_middleware(
    State(guard): State<AdminGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if let Err(e) = guard.authorize(request.headers()) {
        debug!(path = %request.uri().path(), "admin guard rejected request");
        return Err(e);
    }
    request.extensions_mut().insert(Admin);
    Ok(next.run(request).await)
}

/// Extension trait for putting routers behind the admin guard.
pub trait AuthRouterExt {
    fn with_auth(self, guard: AdminGuard) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, guard: AdminGuard) -> Self {
        self.layer(axum::middleware::from_fn_with_state(guard, auth_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn app() -> Router {
        Router::new()
            .route("/units", get(|| async { "ok" }))
            .with_auth(AdminGuard::new(TOKEN))
    }

    async fn status_for(authorization: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri("/units");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn verify_matches_only_the_configured_token() {
        let guard = AdminGuard::new(TOKEN);
        assert!(guard.verify(TOKEN));
        assert!(!guard.verify("0123456789abcdef0123456789abcdeF"));
        assert!(!guard.verify(""));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "bearer  abc ".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn guard_passes_valid_token() {
        let header = format!("Bearer {}", TOKEN);
        assert_eq!(status_for(Some(&header)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn guard_rejects_missing_or_wrong_token() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("Bearer nope")).await, StatusCode::UNAUTHORIZED);
    }
}
