pub use sea_orm_migration::prelude::*;

mod m20250713_000001_create_units_table;
mod m20250713_000002_create_categories_table;
mod m20250713_063437_create_products_table;
mod m20250716_000001_create_vehicle_brands_table;
mod m20250716_224533_create_vehicle_variants_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250713_000001_create_units_table::Migration),
            Box::new(m20250713_000002_create_categories_table::Migration),
            Box::new(m20250713_063437_create_products_table::Migration),
            Box::new(m20250716_000001_create_vehicle_brands_table::Migration),
            Box::new(m20250716_224533_create_vehicle_variants_table::Migration),
        ]
    }
}
