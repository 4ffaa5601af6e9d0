use sea_orm_migration::prelude::*;

use super::m20250716_000001_create_vehicle_brands_table::VehicleBrands;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VehicleVariants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VehicleVariants::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VehicleVariants::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(VehicleVariants::VehicleBrandId).integer().null())
                    .col(
                        ColumnDef::new(VehicleVariants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VehicleVariants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vehicle_variants_vehicle_brand_id")
                            .from(VehicleVariants::Table, VehicleVariants::VehicleBrandId)
                            .to(VehicleBrands::Table, VehicleBrands::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VehicleVariants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum VehicleVariants {
    Table,
    Id,
    Name,
    VehicleBrandId,
    CreatedAt,
    UpdatedAt,
}
