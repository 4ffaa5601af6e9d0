//! One rule table per entity. Both validation passes and the `/schema`
//! endpoints read these.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use super::{Rule, Schema};

/// Upload ceiling for product images.
pub const IMAGE_MAX_KIB: u64 = 2048;

fn unique(table: &'static str, column: &'static str) -> Rule {
    Rule::Unique { table, column }
}

fn exists(table: &'static str) -> Rule {
    Rule::Exists { table }
}

fn at_least_zero() -> Rule {
    Rule::Min { min: Decimal::ZERO }
}

/// Amounts are stored as `decimal(15, 2)`.
fn money() -> Vec<Rule> {
    vec![
        Rule::Required,
        Rule::Numeric,
        at_least_zero(),
        Rule::DecimalPlaces { max: 2 },
        Rule::Max {
            max: Decimal::new(999_999_999_999_999, 2),
        },
    ]
}

pub static CATEGORY: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Category")
        .field("name", vec![Rule::Required, Rule::Text])
        .field(
            "slug",
            vec![Rule::Required, Rule::Text, unique("categories", "slug")],
        )
        .field("description", vec![Rule::Text])
});

pub static UNIT: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Unit")
        .field(
            "name",
            vec![Rule::Required, Rule::Text, unique("units", "name")],
        )
        .field(
            "code",
            vec![Rule::Required, Rule::Text, unique("units", "code")],
        )
});

pub static VEHICLE_BRAND: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Vehicle brand").field(
        "name",
        vec![Rule::Required, Rule::Text, unique("vehicle_brands", "name")],
    )
});

pub static VEHICLE_VARIANT: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Vehicle variant")
        .field(
            "name",
            vec![Rule::Required, Rule::Text, unique("vehicle_variants", "name")],
        )
        .field(
            "vehicleBrandId",
            vec![Rule::Required, Rule::Integer, exists("vehicle_brands")],
        )
});

fn product_fields(schema: Schema) -> Schema {
    schema
        .field(
            "name",
            vec![Rule::Required, Rule::Text, Rule::MaxLength { max: 255 }],
        )
        .field(
            "slug",
            vec![
                Rule::Required,
                Rule::Text,
                Rule::MaxLength { max: 255 },
                unique("products", "slug"),
            ],
        )
        .field("description", vec![Rule::Text])
        .field("stock", vec![Rule::Required, Rule::Integer, at_least_zero()])
        .field("cost", money())
        .field("price", money())
}

fn product_links(schema: Schema) -> Schema {
    schema
        .field("status", vec![Rule::Required, Rule::Boolean])
        .field(
            "categoryId",
            vec![Rule::Required, Rule::Integer, exists("categories")],
        )
        .field("unitId", vec![Rule::Required, Rule::Integer, exists("units")])
}

pub static PRODUCT_CREATE: Lazy<Schema> = Lazy::new(|| {
    let schema = product_fields(Schema::new("Product")).field(
        "image",
        vec![Rule::Image {
            max_kib: IMAGE_MAX_KIB,
        }],
    );
    product_links(schema)
});

pub static PRODUCT_UPDATE: Lazy<Schema> =
    Lazy::new(|| product_links(product_fields(Schema::new("Product"))));

pub static PRODUCT_IMAGE: Lazy<Schema> = Lazy::new(|| {
    Schema::new("Product").field(
        "image",
        vec![
            Rule::Required,
            Rule::Image {
                max_kib: IMAGE_MAX_KIB,
            },
        ],
    )
});
