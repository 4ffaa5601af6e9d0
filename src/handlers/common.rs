use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::pagination::PageRequest;
use crate::presenter::{ListPage, Notice};
use crate::validation::FieldErrors;

/// Query string of a list screen: `?page=2&with=category,unit`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Kept raw; anything that is not a positive integer means the first page.
    pub page: Option<String>,
    /// Comma-separated relations; an empty value loads none.
    pub with: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        let page = self
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(1);
        PageRequest::page(page)
    }

    pub fn relations<'a>(&'a self, default: &'static [&'static str]) -> Vec<&'a str> {
        match self.with.as_deref() {
            None => default.to_vec(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }
}

/// Which rule table an advisory check runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FormKind {
    Create,
    Update,
    Image,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    /// Record being edited; excluded from uniqueness once the form is submitted.
    pub id: Option<i32>,
    pub form: Option<FormKind>,
}

impl ValidateQuery {
    pub fn form(&self) -> FormKind {
        self.form.unwrap_or(if self.id.is_some() {
            FormKind::Update
        } else {
            FormKind::Create
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AdvisoryResult {
    pub valid: bool,
    pub errors: FieldErrors,
}

impl From<FieldErrors> for AdvisoryResult {
    fn from(errors: FieldErrors) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// `303 See Other` back to a collection, handing the notice over in the
/// flash cookie.
pub fn redirect_with_notice(location: &str, notice: &Notice) -> Result<Response, ServiceError> {
    let location = HeaderValue::from_str(location)
        .map_err(|e| ServiceError::InternalError(format!("bad redirect target: {}", e)))?;
    let cookie = HeaderValue::from_str(&notice.to_cookie())
        .map_err(|e| ServiceError::InternalError(format!("bad flash cookie: {}", e)))?;

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location), (header::SET_COOKIE, cookie)],
    )
        .into_response())
}

/// Renders a list page and consumes the notice it displayed.
pub fn list_response<T: Serialize>(page: ListPage<T>) -> Response {
    let consumed = page.success.is_some();
    let mut response = Json(page).into_response();
    if consumed {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, Notice::clear_cookie());
    }
    response
}
