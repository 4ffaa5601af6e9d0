use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicle_variants")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    /// Empty once the brand has been deleted.
    pub vehicle_brand_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle_brand::Entity",
        from = "Column::VehicleBrandId",
        to = "super::vehicle_brand::Column::Id",
        on_delete = "SetNull"
    )]
    VehicleBrand,
}

impl Related<super::vehicle_brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VehicleBrand.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
