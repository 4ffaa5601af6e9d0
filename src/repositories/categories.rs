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
use crate::entities::{category, product};
use crate::errors::{downgrade_write_error, ServiceError, UniqueField};
use crate::pagination::{Page, PageRequest};
use crate::presenter::Notice;
use crate::validation::{rules, FormInput, Mode, Schema};

const UNIQUE: &[UniqueField] = &[("slug", "slug")];

pub struct CategoryRepository {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, id: i32) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(self.label(), id))
    }

    fn apply(input: &FormInput, active: &mut category::ActiveModel) -> Result<(), ServiceError> {
        active.name = Set(input.required_text("name")?);
        active.slug = Set(input.required_text("slug")?);
        active.description = Set(input.text("description").map(str::to_string));
        Ok(())
    }
}

#[async_trait]
impl Repository for CategoryRepository {
    type Record = category::Model;

    fn path(&self) -> &'static str {
        "/categories"
    }

    fn label(&self) -> &'static str {
        "Category"
    }

    fn create_schema(&self) -> &'static Schema {
        &rules::CATEGORY
    }

    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<category::Model>, ServiceError> {
        ensure_relations(relations, &[])?;
        let select = category::Entity::find()
            .order_by_desc(category::Column::CreatedAt)
            .order_by_desc(category::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, request, self.path()).await?;
        Ok(Page::new(rows, meta))
    }

    async fn get(&self, id: i32) -> Result<category::Model, ServiceError> {
        self.find(id).await
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: FormInput) -> Result<Written<category::Model>, ServiceError> {
        self.create_schema()
            .check(&input, Mode::Create, &DbLookup::new(&*self.db))
            .await?;

        let now = Utc::now();
        let mut active = category::ActiveModel {
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Self::apply(&input, &mut active)?;

        let record = active
            .insert(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(category_id = record.id, "Category created");
        Ok(Written::new(record, Notice::created(self.label())))
    }

    #[instrument(skip(self, input))]
    async fn update(
        &self,
        id: i32,
        input: FormInput,
    ) -> Result<Written<category::Model>, ServiceError> {
        let existing = self.find(id).await?;
        self.update_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;

        let mut active = existing.into_active_model();
        Self::apply(&input, &mut active)?;
        active.updated_at = Set(Utc::now());

        let record = active
            .update(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(category_id = id, "Category updated");
        Ok(Written::new(record, Notice::updated(self.label())))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<Notice, ServiceError> {
        let txn = self.db.begin().await?;

        category::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(self.label(), id))?;

        let orphaned = product::Entity::update_many()
            .col_expr(product::Column::CategoryId, Expr::value(Option::<i32>::None))
            .filter(product::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        category::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(category_id = id, orphaned_products = orphaned, "Category deleted");
        Ok(Notice::deleted(self.label()))
    }
}
