//! Seed data script - populates the database with demo back-office data
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - 4 categories and 3 units of measure
//! - 3 vehicle brands with 6 variants
//! - 8 products spread over the categories
//!
//! Everything goes through the repositories, so seeds pass the same
//! validation as submitted forms. Re-running skips rows that already exist.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use inventory_admin::errors::ServiceError;
use inventory_admin::repositories::{
    CategoryRepository, ProductRepository, Repository, UnitRepository, VehicleBrandRepository,
    VehicleVariantRepository,
};
use inventory_admin::storage::LocalImageStore;
use inventory_admin::validation::{slugify, FormInput};
use inventory_admin::{config, db};

const CATEGORIES: &[(&str, &str)] = &[
    ("Engine Parts", "Pistons, gaskets, filters and other engine internals"),
    ("Brake System", "Pads, discs, shoes and brake fluid"),
    ("Electrical", "Batteries, bulbs, spark plugs and wiring"),
    ("Body Parts", "Panels, mirrors and trim"),
];

const UNITS: &[(&str, &str)] = &[("Pieces", "pcs"), ("Set", "set"), ("Liter", "ltr")];

const VEHICLES: &[(&str, &[&str])] = &[
    ("Honda", &["Beat", "Vario 125", "PCX 160"]),
    ("Yamaha", &["NMAX", "Aerox 155"]),
    ("Suzuki", &["Satria F150"]),
];

struct DemoProduct {
    name: &'static str,
    category: &'static str,
    unit: &'static str,
    stock: i32,
    cost: Decimal,
    price: Decimal,
}

fn demo_products() -> Vec<DemoProduct> {
    let p = |name, category, unit, stock, cost, price| DemoProduct {
        name,
        category,
        unit,
        stock,
        cost,
        price,
    };
    vec![
        p("Oil Filter", "Engine Parts", "pcs", 40, dec!(18000), dec!(27500)),
        p("Piston Kit 52mm", "Engine Parts", "set", 6, dec!(185000), dec!(245000)),
        p("Engine Oil 10W-30", "Engine Parts", "ltr", 120, dec!(42000), dec!(55000)),
        p("Heavy Duty Brake Pad!!", "Brake System", "set", 25, dec!(35000), dec!(52500)),
        p("Brake Fluid DOT 4", "Brake System", "ltr", 30, dec!(24000), dec!(32000)),
        p("Spark Plug Iridium", "Electrical", "pcs", 60, dec!(65000), dec!(89000)),
        p("LED Headlight Bulb", "Electrical", "pcs", 15, dec!(48000), dec!(75000)),
        p("Side Mirror Pair", "Body Parts", "set", 10, dec!(55000), dec!(85000)),
    ]
}

/// Treats a uniqueness failure as "already seeded".
fn skip_existing<T>(label: &str, result: Result<T, ServiceError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ServiceError::ValidationError(errors)) => {
            warn!(label, fields = ?errors.fields(), "skipping existing record");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing("info", false);

    info!("=== Inventory Admin Seed Data ===");

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://inventory.db?mode=rwc".to_string());
    let storage_root =
        std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "storage/public".to_string());

    info!("Connecting to database: {}", database_url);
    let pool = Arc::new(db::establish_connection(&database_url).await?);
    db::run_migrations(&pool).await?;

    let images = Arc::new(LocalImageStore::new(storage_root, "/storage"));
    let categories = CategoryRepository::new(pool.clone());
    let units = UnitRepository::new(pool.clone());
    let brands = VehicleBrandRepository::new(pool.clone());
    let variants = VehicleVariantRepository::new(pool.clone());
    let products = ProductRepository::new(pool.clone(), images);

    info!("Creating categories...");
    for (name, description) in CATEGORIES {
        let input = FormInput::new()
            .with_text("name", name)
            .with_text("slug", slugify(name))
            .with_text("description", description);
        skip_existing(name, categories.create(input).await)?;
    }

    info!("Creating units...");
    for (name, code) in UNITS {
        let input = FormInput::new().with_text("name", name).with_text("code", code);
        skip_existing(name, units.create(input).await)?;
    }

    info!("Creating vehicle brands and variants...");
    for (brand, models) in VEHICLES {
        let created = skip_existing(
            brand,
            brands.create(FormInput::new().with_text("name", brand)).await,
        )?;
        let Some(created) = created else { continue };
        for model in *models {
            let input = FormInput::new()
                .with_text("name", model)
                .with_text("vehicleBrandId", created.record.id.to_string());
            skip_existing(model, variants.create(input).await)?;
        }
    }

    let category_ids: HashMap<String, i32> = products
        .categories()
        .await?
        .into_iter()
        .map(|c| (c.name, c.id))
        .collect();
    let unit_ids: HashMap<String, i32> = products
        .units()
        .await?
        .into_iter()
        .map(|u| (u.code, u.id))
        .collect();

    info!("Creating products...");
    let mut created = 0;
    for demo in demo_products() {
        let (Some(category_id), Some(unit_id)) =
            (category_ids.get(demo.category), unit_ids.get(demo.unit))
        else {
            warn!(product = demo.name, "missing category or unit; skipped");
            continue;
        };
        let input = FormInput::new()
            .with_text("name", demo.name)
            .with_text("slug", slugify(demo.name))
            .with_text("description", "")
            .with_text("stock", demo.stock.to_string())
            .with_text("cost", demo.cost.to_string())
            .with_text("price", demo.price.to_string())
            .with_text("status", "true")
            .with_text("categoryId", category_id.to_string())
            .with_text("unitId", unit_id.to_string());
        if skip_existing(demo.name, products.create(input).await)?.is_some() {
            created += 1;
        }
    }
    info!("  Created {} products", created);

    info!("=== Seed complete ===");
    Ok(())
}
