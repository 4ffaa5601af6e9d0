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
use crate::entities::{product, unit};
use crate::errors::{downgrade_write_error, ServiceError, UniqueField};
use crate::pagination::{Page, PageRequest};
use crate::presenter::Notice;
use crate::validation::{rules, FormInput, Mode, Schema};

const UNIQUE: &[UniqueField] = &[("name", "name"), ("code", "code")];

/// Units of measure (pcs, set, liter) products are stocked in.
pub struct UnitRepository {
    db: Arc<DatabaseConnection>,
}

impl UnitRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, id: i32) -> Result<unit::Model, ServiceError> {
        unit::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(self.label(), id))
    }
}

#[async_trait]
impl Repository for UnitRepository {
    type Record = unit::Model;

    fn path(&self) -> &'static str {
        "/units"
    }

    fn label(&self) -> &'static str {
        "Unit"
    }

    fn create_schema(&self) -> &'static Schema {
        &rules::UNIT
    }

    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<unit::Model>, ServiceError> {
        ensure_relations(relations, &[])?;
        let select = unit::Entity::find()
            .order_by_desc(unit::Column::CreatedAt)
            .order_by_desc(unit::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, request, self.path()).await?;
        Ok(Page::new(rows, meta))
    }

    async fn get(&self, id: i32) -> Result<unit::Model, ServiceError> {
        self.find(id).await
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: FormInput) -> Result<Written<unit::Model>, ServiceError> {
        self.create_schema()
            .check(&input, Mode::Create, &DbLookup::new(&*self.db))
            .await?;

        let now = Utc::now();
        let record = unit::ActiveModel {
            name: Set(input.required_text("name")?),
            code: Set(input.required_text("code")?),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(unit_id = record.id, code = %record.code, "Unit created");
        Ok(Written::new(record, Notice::created(self.label())))
    }

    #[instrument(skip(self, input))]
    async fn update(&self, id: i32, input: FormInput) -> Result<Written<unit::Model>, ServiceError> {
        let existing = self.find(id).await?;
        self.update_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;

        let mut active = existing.into_active_model();
        active.name = Set(input.required_text("name")?);
        active.code = Set(input.required_text("code")?);
        active.updated_at = Set(Utc::now());

        let record = active
            .update(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(unit_id = id, "Unit updated");
        Ok(Written::new(record, Notice::updated(self.label())))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<Notice, ServiceError> {
        let txn = self.db.begin().await?;

        unit::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(self.label(), id))?;

        let orphaned = product::Entity::update_many()
            .col_expr(product::Column::UnitId, Expr::value(Option::<i32>::None))
            .filter(product::Column::UnitId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        unit::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(unit_id = id, orphaned_products = orphaned, "Unit deleted");
        Ok(Notice::deleted(self.label()))
    }
}
