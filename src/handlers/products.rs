use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};

use super::common::redirect_with_notice;
use super::resource::resource_router;
use crate::errors::ServiceError;
use crate::presenter::{FormPage, Lookups, ProductView};
use crate::repositories::{ProductRepository, Repository};
use crate::validation::FormInput;

/// Product routes: the shared resource routes plus the image-only flow.
pub fn product_routes(repo: Arc<ProductRepository>) -> Router {
    resource_router::<ProductRepository>()
        .route("/:id/edit-image", get(edit_image))
        .route("/:id/image", post(update_image).put(update_image))
        .with_state(repo)
}

/// The image form only needs the product and its current image URL.
async fn edit_image(
    State(repo): State<Arc<ProductRepository>>,
    Path(id): Path<i32>,
) -> Result<Json<FormPage<ProductView>>, ServiceError> {
    Ok(Json(FormPage {
        record: Some(repo.get(id).await?),
        lookups: Lookups::default(),
    }))
}

async fn update_image(
    State(repo): State<Arc<ProductRepository>>,
    Path(id): Path<i32>,
    input: FormInput,
) -> Result<Response, ServiceError> {
    let written = repo.update_image(id, input).await?;
    redirect_with_notice(repo.path(), &written.notice)
}
