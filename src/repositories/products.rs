use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{error, info, instrument};

use super::{ensure_relations, fetch_page, not_found, DbLookup, Repository, Written};
use crate::entities::{category, product, unit};
use crate::errors::{downgrade_write_error, ServiceError, UniqueField};
use crate::pagination::{Page, PageRequest};
use crate::presenter::{Lookups, Notice, ProductView};
use crate::storage::{self, ImageStore};
use crate::validation::{rules, FormInput, Mode, Schema};

const UNIQUE: &[UniqueField] = &[("slug", "slug")];

pub const RELATION_CATEGORY: &str = "category";
pub const RELATION_UNIT: &str = "unit";
const RELATIONS: &[&str] = &[RELATION_CATEGORY, RELATION_UNIT];

/// Validated product fields, decoded once the authoritative pass has run.
#[derive(Debug)]
struct ProductDraft {
    name: String,
    slug: String,
    description: Option<String>,
    stock: i32,
    cost: Decimal,
    price: Decimal,
    status: bool,
    category_id: i32,
    unit_id: i32,
}

impl ProductDraft {
    fn from_input(input: &FormInput) -> Result<Self, ServiceError> {
        Ok(Self {
            name: input.required_text("name")?,
            slug: input.required_text("slug")?,
            description: input.text("description").map(str::to_string),
            stock: input.integer("stock")?,
            cost: input.decimal("cost")?,
            price: input.decimal("price")?,
            status: input.boolean("status")?,
            category_id: input.integer("categoryId")?,
            unit_id: input.integer("unitId")?,
        })
    }

    /// Writes every editable column. Discount columns are never touched.
    fn apply(self, active: &mut product::ActiveModel) {
        active.name = Set(self.name);
        active.slug = Set(self.slug);
        active.description = Set(self.description);
        active.stock = Set(self.stock);
        active.cost = Set(self.cost);
        active.price = Set(self.price);
        active.status = Set(self.status);
        active.category_id = Set(Some(self.category_id));
        active.unit_id = Set(Some(self.unit_id));
    }
}

/// Reports a failed image write against the form field instead of as a
/// server fault, so the user can retry the upload.
fn upload_failure(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::Storage(reason) => {
            error!(%reason, "product image upload failed");
            ServiceError::field("image", "The image failed to upload.")
        }
        other => other,
    }
}

/// Amounts are stored with two decimal places; some backends hand them back
/// with float noise.
fn normalize_amounts(mut product: product::Model) -> product::Model {
    product.cost = product.cost.round_dp(2);
    product.price = product.price.round_dp(2);
    product.discount_amount = product.discount_amount.map(|d| d.round_dp(2));
    product.price_after_discount = product.price_after_discount.map(|d| d.round_dp(2));
    product
}

pub struct ProductRepository {
    db: Arc<DatabaseConnection>,
    images: Arc<dyn ImageStore>,
}

impl ProductRepository {
    pub fn new(db: Arc<DatabaseConnection>, images: Arc<dyn ImageStore>) -> Self {
        Self { db, images }
    }

    async fn find(&self, id: i32) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(self.label(), id))
    }

    pub async fn categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn units(&self) -> Result<Vec<unit::Model>, ServiceError> {
        Ok(unit::Entity::find()
            .order_by_asc(unit::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub fn image_schema(&self) -> &'static Schema {
        &rules::PRODUCT_IMAGE
    }

    async fn insert(
        &self,
        draft: ProductDraft,
        image: Option<String>,
    ) -> Result<product::Model, ServiceError> {
        let now = Utc::now();
        let mut active = product::ActiveModel {
            image: Set(image),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        draft.apply(&mut active);
        active
            .insert(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))
    }

    /// Batch-loads the requested relations for a page of products.
    async fn present(
        &self,
        products: Vec<product::Model>,
        relations: &[&str],
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut categories: HashMap<i32, category::Model> = HashMap::new();
        if relations.contains(&RELATION_CATEGORY) {
            let ids: Vec<i32> = products.iter().filter_map(|p| p.category_id).collect();
            if !ids.is_empty() {
                categories = category::Entity::find()
                    .filter(category::Column::Id.is_in(ids))
                    .all(&*self.db)
                    .await?
                    .into_iter()
                    .map(|c| (c.id, c))
                    .collect();
            }
        }

        let mut units: HashMap<i32, unit::Model> = HashMap::new();
        if relations.contains(&RELATION_UNIT) {
            let ids: Vec<i32> = products.iter().filter_map(|p| p.unit_id).collect();
            if !ids.is_empty() {
                units = unit::Entity::find()
                    .filter(unit::Column::Id.is_in(ids))
                    .all(&*self.db)
                    .await?
                    .into_iter()
                    .map(|u| (u.id, u))
                    .collect();
            }
        }

        Ok(products
            .into_iter()
            .map(normalize_amounts)
            .map(|product| {
                let category = product.category_id.and_then(|id| categories.get(&id).cloned());
                let unit = product.unit_id.and_then(|id| units.get(&id).cloned());
                let image_url = self.images.resolve(product.image.as_deref());
                ProductView::new(product, category, unit, image_url)
            })
            .collect())
    }

    async fn present_one(&self, product: product::Model) -> Result<ProductView, ServiceError> {
        self.present(vec![product], RELATIONS)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("product vanished while presenting".into()))
    }

    /// Replaces only the product's image. The previous file is removed once
    /// the new reference is saved.
    #[instrument(skip(self, input))]
    pub async fn update_image(
        &self,
        id: i32,
        input: FormInput,
    ) -> Result<Written<ProductView>, ServiceError> {
        let existing = self.find(id).await?;
        self.image_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;
        let file = input
            .file("image")
            .ok_or_else(|| ServiceError::InternalError("image used before validation".into()))?;

        let previous = existing.image.clone();
        let db = Arc::clone(&self.db);
        let record = storage::replace(
            self.images.as_ref(),
            previous.as_deref(),
            file,
            |reference| async move {
                let mut active = existing.into_active_model();
                active.image = Set(Some(reference));
                active.updated_at = Set(Utc::now());
                active.update(&*db).await.map_err(ServiceError::from)
            },
        )
        .await
        .map_err(upload_failure)?;

        info!(product_id = id, image = ?record.image, "Product image replaced");
        Ok(Written::new(
            self.present_one(record).await?,
            Notice::image_updated(),
        ))
    }
}

#[async_trait]
impl Repository for ProductRepository {
    type Record = ProductView;

    fn path(&self) -> &'static str {
        "/products"
    }

    fn label(&self) -> &'static str {
        "Product"
    }

    fn create_schema(&self) -> &'static Schema {
        &rules::PRODUCT_CREATE
    }

    fn update_schema(&self) -> &'static Schema {
        &rules::PRODUCT_UPDATE
    }

    fn schemas(&self) -> Vec<(&'static str, &'static Schema)> {
        vec![
            ("create", self.create_schema()),
            ("update", self.update_schema()),
            ("image", self.image_schema()),
        ]
    }

    fn default_relations(&self) -> &'static [&'static str] {
        RELATIONS
    }

    async fn lookups(&self) -> Result<Lookups, ServiceError> {
        Ok(Lookups {
            categories: Some(self.categories().await?),
            units: Some(self.units().await?),
            ..Default::default()
        })
    }

    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<ProductView>, ServiceError> {
        ensure_relations(relations, RELATIONS)?;
        let select = product::Entity::find()
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, request, self.path()).await?;
        Ok(Page::new(self.present(rows, relations).await?, meta))
    }

    async fn get(&self, id: i32) -> Result<ProductView, ServiceError> {
        let product = self.find(id).await?;
        self.present_one(product).await
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: FormInput) -> Result<Written<ProductView>, ServiceError> {
        self.create_schema()
            .check(&input, Mode::Create, &DbLookup::new(&*self.db))
            .await?;
        let draft = ProductDraft::from_input(&input)?;

        let record = match input.file("image") {
            Some(file) => storage::replace(self.images.as_ref(), None, file, |reference| {
                self.insert(draft, Some(reference))
            })
            .await
            .map_err(upload_failure)?,
            None => self.insert(draft, None).await?,
        };

        info!(product_id = record.id, slug = %record.slug, "Product created");
        Ok(Written::new(
            self.present_one(record).await?,
            Notice::created(self.label()),
        ))
    }

    /// Leaves the stored image alone; see [`ProductRepository::update_image`].
    #[instrument(skip(self, input))]
    async fn update(&self, id: i32, input: FormInput) -> Result<Written<ProductView>, ServiceError> {
        let existing = self.find(id).await?;
        self.update_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;

        let mut active = existing.into_active_model();
        ProductDraft::from_input(&input)?.apply(&mut active);
        active.updated_at = Set(Utc::now());

        let record = active
            .update(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(product_id = id, "Product updated");
        Ok(Written::new(
            self.present_one(record).await?,
            Notice::updated(self.label()),
        ))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<Notice, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = product::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(self.label(), id))?;
        product::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if let Some(reference) = existing.image.as_deref().filter(|r| !r.is_empty()) {
            self.images.remove_best_effort(reference).await;
        }

        info!(product_id = id, "Product deleted");
        Ok(Notice::deleted(self.label()))
    }
}
