use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, instrument};

use super::{ensure_relations, fetch_page, not_found, DbLookup, Repository, Written};
use crate::entities::{vehicle_brand, vehicle_variant};
use crate::errors::{downgrade_write_error, ServiceError, UniqueField};
use crate::pagination::{Page, PageRequest};
use crate::presenter::{Lookups, Notice, VehicleVariantView};
use crate::validation::{rules, FormInput, Mode, Schema};

const UNIQUE: &[UniqueField] = &[("name", "name")];

pub const RELATION_VEHICLE_BRAND: &str = "vehicleBrand";
const RELATIONS: &[&str] = &[RELATION_VEHICLE_BRAND];

pub struct VehicleVariantRepository {
    db: Arc<DatabaseConnection>,
}

impl VehicleVariantRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find(&self, id: i32) -> Result<vehicle_variant::Model, ServiceError> {
        vehicle_variant::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| not_found(self.label(), id))
    }

    /// Every brand, by name, for the variant form's select input.
    pub async fn vehicle_brands(&self) -> Result<Vec<vehicle_brand::Model>, ServiceError> {
        Ok(vehicle_brand::Entity::find()
            .order_by_asc(vehicle_brand::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Attaches brands to a batch of variants with a single `IN` query.
    async fn present(
        &self,
        variants: Vec<vehicle_variant::Model>,
        with_brand: bool,
    ) -> Result<Vec<VehicleVariantView>, ServiceError> {
        let mut brands = HashMap::new();
        if with_brand {
            let ids: Vec<i32> = variants.iter().filter_map(|v| v.vehicle_brand_id).collect();
            if !ids.is_empty() {
                brands = vehicle_brand::Entity::find()
                    .filter(vehicle_brand::Column::Id.is_in(ids))
                    .all(&*self.db)
                    .await?
                    .into_iter()
                    .map(|brand| (brand.id, brand))
                    .collect();
            }
        }

        Ok(variants
            .into_iter()
            .map(|variant| {
                let vehicle_brand = variant
                    .vehicle_brand_id
                    .and_then(|id| brands.get(&id).cloned());
                VehicleVariantView {
                    variant,
                    vehicle_brand,
                }
            })
            .collect())
    }

    async fn present_one(
        &self,
        variant: vehicle_variant::Model,
    ) -> Result<VehicleVariantView, ServiceError> {
        let mut views = self.present(vec![variant], true).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::InternalError("variant vanished while presenting".into()))
    }
}

#[async_trait]
impl Repository for VehicleVariantRepository {
    type Record = VehicleVariantView;

    fn path(&self) -> &'static str {
        "/vehicle-variants"
    }

    fn label(&self) -> &'static str {
        "Vehicle variant"
    }

    fn create_schema(&self) -> &'static Schema {
        &rules::VEHICLE_VARIANT
    }

    fn default_relations(&self) -> &'static [&'static str] {
        RELATIONS
    }

    async fn lookups(&self) -> Result<Lookups, ServiceError> {
        Ok(Lookups {
            vehicle_brands: Some(self.vehicle_brands().await?),
            ..Default::default()
        })
    }

    async fn list(
        &self,
        request: PageRequest,
        relations: &[&str],
    ) -> Result<Page<VehicleVariantView>, ServiceError> {
        ensure_relations(relations, RELATIONS)?;
        let select = vehicle_variant::Entity::find()
            .order_by_desc(vehicle_variant::Column::CreatedAt)
            .order_by_desc(vehicle_variant::Column::Id);
        let (rows, meta) = fetch_page(&self.db, select, request, self.path()).await?;

        let with_brand = relations.contains(&RELATION_VEHICLE_BRAND);
        Ok(Page::new(self.present(rows, with_brand).await?, meta))
    }

    async fn get(&self, id: i32) -> Result<VehicleVariantView, ServiceError> {
        let variant = self.find(id).await?;
        self.present_one(variant).await
    }

    #[instrument(skip(self, input))]
    async fn create(&self, input: FormInput) -> Result<Written<VehicleVariantView>, ServiceError> {
        self.create_schema()
            .check(&input, Mode::Create, &DbLookup::new(&*self.db))
            .await?;

        let now = Utc::now();
        let record = vehicle_variant::ActiveModel {
            name: Set(input.required_text("name")?),
            vehicle_brand_id: Set(Some(input.integer("vehicleBrandId")?)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(
            vehicle_variant_id = record.id,
            vehicle_brand_id = ?record.vehicle_brand_id,
            "Vehicle variant created"
        );
        Ok(Written::new(
            self.present_one(record).await?,
            Notice::created(self.label()),
        ))
    }

    #[instrument(skip(self, input))]
    async fn update(
        &self,
        id: i32,
        input: FormInput,
    ) -> Result<Written<VehicleVariantView>, ServiceError> {
        let existing = self.find(id).await?;
        self.update_schema()
            .check(&input, Mode::Update { id }, &DbLookup::new(&*self.db))
            .await?;

        let mut active = existing.into_active_model();
        active.name = Set(input.required_text("name")?);
        active.vehicle_brand_id = Set(Some(input.integer("vehicleBrandId")?));
        active.updated_at = Set(Utc::now());

        let record = active
            .update(&*self.db)
            .await
            .map_err(|e| downgrade_write_error(e, UNIQUE))?;

        info!(vehicle_variant_id = id, "Vehicle variant updated");
        Ok(Written::new(
            self.present_one(record).await?,
            Notice::updated(self.label()),
        ))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> Result<Notice, ServiceError> {
        let txn = self.db.begin().await?;
        vehicle_variant::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| not_found(self.label(), id))?;
        vehicle_variant::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(vehicle_variant_id = id, "Vehicle variant deleted");
        Ok(Notice::deleted(self.label()))
    }
}
