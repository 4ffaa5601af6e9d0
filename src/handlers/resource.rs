//! Routes shared by every back-office resource.
//!
//! | Method | Path          | Action                            |
//! |--------|---------------|-----------------------------------|
//! | GET    | `/`           | list page                         |
//! | POST   | `/`           | store, then redirect to the list  |
//! | GET    | `/add`        | create form                       |
//! | GET    | `/schema`     | rule tables                       |
//! | POST   | `/validate`   | advisory check                    |
//! | GET    | `/:id/edit`   | edit form                         |
//! | PUT    | `/:id`        | update, then redirect to the list |
//! | DELETE | `/:id`        | delete, then redirect to the list |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

use super::common::{
    list_response, redirect_with_notice, AdvisoryResult, FormKind, ListQuery, ValidateQuery,
};
use crate::errors::ServiceError;
use crate::presenter::{FormPage, ListPage, Notice};
use crate::repositories::Repository;
use crate::validation::{FormInput, Mode, Schema};

pub fn resource_router<R>() -> Router<Arc<R>>
where
    R: Repository + 'static,
{
    Router::new()
        .route("/", get(index::<R>).post(store::<R>))
        .route("/add", get(create_form::<R>))
        .route("/schema", get(schema::<R>))
        .route("/validate", post(validate::<R>))
        .route("/:id", put(update::<R>).delete(destroy::<R>))
        .route("/:id/edit", get(edit_form::<R>))
}

async fn index<R: Repository>(
    State(repo): State<Arc<R>>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    let relations = query.relations(repo.default_relations());
    let records = repo.list(query.page_request(), &relations).await?;
    Ok(list_response(ListPage::render(
        records,
        Notice::from_headers(&headers),
    )))
}

async fn create_form<R: Repository>(
    State(repo): State<Arc<R>>,
) -> Result<Json<FormPage<R::Record>>, ServiceError> {
    Ok(Json(FormPage {
        record: None,
        lookups: repo.lookups().await?,
    }))
}

async fn edit_form<R: Repository>(
    State(repo): State<Arc<R>>,
    Path(id): Path<i32>,
) -> Result<Json<FormPage<R::Record>>, ServiceError> {
    let record = repo.get(id).await?;
    Ok(Json(FormPage {
        record: Some(record),
        lookups: repo.lookups().await?,
    }))
}

async fn store<R: Repository>(
    State(repo): State<Arc<R>>,
    input: FormInput,
) -> Result<Response, ServiceError> {
    let written = repo.create(input).await?;
    redirect_with_notice(repo.path(), &written.notice)
}

async fn update<R: Repository>(
    State(repo): State<Arc<R>>,
    Path(id): Path<i32>,
    input: FormInput,
) -> Result<Response, ServiceError> {
    let written = repo.update(id, input).await?;
    redirect_with_notice(repo.path(), &written.notice)
}

async fn destroy<R: Repository>(
    State(repo): State<Arc<R>>,
    Path(id): Path<i32>,
) -> Result<Response, ServiceError> {
    let notice = repo.delete(id).await?;
    redirect_with_notice(repo.path(), &notice)
}

async fn schema<R: Repository>(
    State(repo): State<Arc<R>>,
) -> Json<BTreeMap<&'static str, &'static Schema>> {
    Json(repo.schemas().into_iter().collect())
}

/// Runs the rules that need no database. Never writes, never blocks a
/// submit.
async fn validate<R: Repository>(
    State(repo): State<Arc<R>>,
    Query(query): Query<ValidateQuery>,
    input: FormInput,
) -> Result<Response, ServiceError> {
    let form = query.form();
    let schema = repo
        .schemas()
        .into_iter()
        .find(|(name, _)| *name == form.to_string())
        .map(|(_, schema)| schema)
        .ok_or_else(|| ServiceError::BadRequest(format!("No {} form for this resource", form)))?;

    // Edit forms validate as full replacements even before an id is known.
    let mode = match (form, query.id) {
        (FormKind::Create, _) => Mode::Create,
        (_, id) => Mode::Update {
            id: id.unwrap_or_default(),
        },
    };
    Ok(Json(AdvisoryResult::from(schema.check_advisory(&input, mode))).into_response())
}
