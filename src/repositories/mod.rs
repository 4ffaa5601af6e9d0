//! Persistence for the five back-office entities.
//!
//! Every repository validates writes authoritatively before touching the
//! database and reports each successful write with a one-shot [`Notice`].

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QuerySelect, Select,
};
use serde::Serialize;

use crate::errors::ServiceError;
use crate::pagination::{Page, PageRequest, Pagination};
use crate::presenter::{Identified, Lookups, Notice};
use crate::validation::{FormInput, Schema};

pub mod categories;
pub mod lookup;
pub mod products;
pub mod units;
pub mod vehicle_brands;
pub mod vehicle_variants;

pub use categories::CategoryRepository;
pub use lookup::DbLookup;
pub use products::ProductRepository;
pub use units::UnitRepository;
pub use vehicle_brands::VehicleBrandRepository;
pub use vehicle_variants::VehicleVariantRepository;

/// A persisted record together with the notice describing the write.
#[derive(Debug, Clone)]
pub struct Written<T> {
    pub record: T,
    pub notice: Notice,
}

impl<T> Written<T> {
    pub fn new(record: T, notice: Notice) -> Self {
        Self { record, notice }
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    type Record: Serialize + Identified + Send + Sync;

    /// Collection path, also the base of pagination links.
    fn path(&self) -> &'static str;

    /// Human label used in notices, e.g. "Vehicle brand".
    fn label(&self) -> &'static str;

    fn create_schema(&self) -> &'static Schema;

    fn update_schema(&self) -> &'static Schema {
        self.create_schema()
    }

    /// Named rule tables offered to clients for advisory checks.
    fn schemas(&self) -> Vec<(&'static str, &'static Schema)> {
        vec![
            ("create", self.create_schema()),
            ("update", self.update_schema()),
        ]
    }

    /// Relations a list screen loads when none are named.
    fn default_relations(&self) -> &'static [&'static str] {
        &[]
    }

    /// Related rows the create and edit forms select from.
    async fn lookups(&self) -> Result<Lookups, ServiceError> {
        Ok(Lookups::default())
    }

    /// Newest first, ties broken by id so equal timestamps keep insertion order.
    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<Self::Record>, ServiceError>;

    async fn get(&self, id: i32) -> Result<Self::Record, ServiceError>;

    async fn create(&self, input: FormInput) -> Result<Written<Self::Record>, ServiceError>;

    /// Replaces every declared field; partial submissions are rejected.
    async fn update(&self, id: i32, input: FormInput)
        -> Result<Written<Self::Record>, ServiceError>;

    async fn delete(&self, id: i32) -> Result<Notice, ServiceError>;
}

/// Rejects relation names a repository does not know how to load.
pub(crate) fn ensure_relations(
    requested: &[&str],
    supported: &[&'static str],
) -> Result<(), ServiceError> {
    match requested.iter().find(|name| !supported.contains(name)) {
        Some(unknown) => Err(ServiceError::BadRequest(format!(
            "Unknown relation '{}'",
            unknown
        ))),
        None => Ok(()),
    }
}

/// Counts the full selection, then fetches the requested slice of it. Pages
/// past the end are answered from the count alone.
pub(crate) async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    request: PageRequest,
    path: &str,
) -> Result<(Vec<E::Model>, Pagination), ServiceError>
where
    E: EntityTrait,
    E::Model: FromQueryResult + Send + Sync,
{
    let total = select.clone().count(db).await?;
    let meta = Pagination::new(total, request, path);
    if request.page > meta.last_page {
        return Ok((Vec::new(), meta));
    }
    let rows = select
        .limit(request.per_page)
        .offset(request.offset())
        .all(db)
        .await?;
    Ok((rows, meta))
}

pub(crate) fn not_found(label: &str, id: i32) -> ServiceError {
    ServiceError::NotFound(format!("{} {} not found", label, id))
}
