use sea_orm_migration::prelude::*;

use super::m20250713_000001_create_units_table::Units;
use super::m20250713_000002_create_categories_table::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Products::Slug)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Products::Description).text().null())
                    .col(ColumnDef::new(Products::Stock).integer().not_null())
                    .col(ColumnDef::new(Products::Cost).decimal_len(15, 2).not_null())
                    .col(ColumnDef::new(Products::Price).decimal_len(15, 2).not_null())
                    .col(ColumnDef::new(Products::Image).string_len(1024).null())
                    .col(ColumnDef::new(Products::Status).boolean().not_null())
                    // Reserved for discount pricing; no write path sets these yet.
                    .col(ColumnDef::new(Products::DiscountPercentage).integer().null())
                    .col(
                        ColumnDef::new(Products::DiscountAmount)
                            .decimal_len(15, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Products::PriceAfterDiscount)
                            .decimal_len(15, 2)
                            .null(),
                    )
                    .col(ColumnDef::new(Products::CategoryId).integer().null())
                    .col(ColumnDef::new(Products::UnitId).integer().null())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category_id")
                            .from(Products::Table, Products::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_unit_id")
                            .from(Products::Table, Products::UnitId)
                            .to(Units::Table, Units::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_created_at")
                    .table(Products::Table)
                    .col(Products::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Products {
    Table,
    Id,
    Name,
    Slug,
    Description,
    Stock,
    Cost,
    Price,
    Image,
    Status,
    DiscountPercentage,
    DiscountAmount,
    PriceAfterDiscount,
    CategoryId,
    UnitId,
    CreatedAt,
    UpdatedAt,
}
