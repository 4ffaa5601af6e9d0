use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};

use super::{ensure_relations, fetch_page, not_found, DbLookup, Repository, Written};
use crate::entities::{vehicle_brand, vehicle_variant};
use crate::errors::{downgrade_write_error, ServiceError, UniqueField};
use crate::pagination::{Page, PageRequest};
use crate::presenter::Notice;
use crate::validation::{rules, FormInput, Mode, Schema};

const UNIQUE: &[UniqueField] = &[("name", "name")];

pub struct VehicleBrandRepository {
    db: Arc<DatabaseConnection>,
}

impl VehicleBrandRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, id: i32) -> Result<vehicle_brand::Model, ServiceError> {
        vehicle_brand::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(self.label(), id))
    }
}

#[async_trait]
impl Repository for VehicleBrandRepository {
    type Record = vehicle_brand::Model;

    fn path(&self) -> &'static str {
        "/vehicle-brands"
    }

    fn label(&self) -> &'static str {
        "Vehicle brand"
    }

    fn create_schema(&self) -> &'static Schema {
        &rules::VEHICLE_BRAND
    }

    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<vehicle_brand::Model>, ServiceError> {
        ensure_relations(relations, &[])?;
        let select = vehicle_brand::Entity::find()
            .order_by_desc(vehicle_brand::Column::CreatedAt)
            .order_by_desc(vehicle_brand::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, request, self.path()).await?;
        Ok(Page::new(rows, meta))
    }

    async fn get(&self, id: i32) -> Result<vehicle_brand::Model, ServiceError> {
        self.find(id).await
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: FormInput) -> Result<Written<vehicle_brand::Model>, ServiceError> {
        self.create_schema()
            .check(&input, Mode::Create, &DbLookup::new(&*self.db))
            .await?;

        let now = Utc::now();
        let record = vehicle_brand::ActiveModel {
            name: Set(input.required_text("name")?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(vehicle_brand_id = record.id, "Vehicle brand created");
        Ok(Written::new(record, Notice::created(self.label())))
    }

    #[instrument(skip(self, input))]
    async fn update(
        &self,
        id: i32,
        input: FormInput,
    ) -> Result<Written<vehicle_brand::Model>, ServiceError> {
        let existing = self.find(id).await?;
        self.update_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;

        let mut active = existing.into_active_model();
        active.name = Set(input.required_text("name")?);
        active.updated_at = Set(Utc::now());

        let record = active
            .update(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(vehicle_brand_id = id, "Vehicle brand updated");
        Ok(Written::new(record, Notice::updated(self.label())))
    }

    /// Variants of the brand survive with their brand cleared.
    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<Notice, ServiceError> {
        let txn = self.db.begin().await?;

        vehicle_brand::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(self.label(), id))?;

        let orphaned = vehicle_variant::Entity::update_many()
            .col_expr(
                vehicle_variant::Column::VehicleBrandId,
                Expr::value(Option::<i32>::None),
            )
            .filter(vehicle_variant::Column::VehicleBrandId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        vehicle_brand::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(vehicle_brand_id = id, orphaned_variants = orphaned, "Vehicle brand deleted");
        Ok(Notice::deleted(self.label()))
    }
}
