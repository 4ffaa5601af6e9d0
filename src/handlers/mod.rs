pub mod common;
pub mod products;
pub mod resource;

use std::sync::Arc;

use axum::Router;

use crate::db::DbPool;
use crate::repositories::{
    CategoryRepository, ProductRepository, UnitRepository, VehicleBrandRepository,
    VehicleVariantRepository,
};
use crate::storage::ImageStore;

pub use products::product_routes;
pub use resource::resource_router;

/// Repositories backing the back-office screens.
#[derive(Clone)]
pub struct Repositories {
    pub categories: Arc<CategoryRepository>,
    pub units: Arc<UnitRepository>,
    pub products: Arc<ProductRepository>,
    pub vehicle_brands: Arc<VehicleBrandRepository>,
    pub vehicle_variants: Arc<VehicleVariantRepository>,
}

impl Repositories {
    pub fn new(db: Arc<DbPool>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            categories: Arc::new(CategoryRepository::new(db.clone())),
            units: Arc::new(UnitRepository::new(db.clone())),
            products: Arc::new(ProductRepository::new(db.clone(), images)),
            vehicle_brands: Arc::new(VehicleBrandRepository::new(db.clone())),
            vehicle_variants: Arc::new(VehicleVariantRepository::new(db)),
        }
    }
}

/// The five resource groups, unguarded; the caller applies the admin guard.
pub fn admin_routes(repos: &Repositories) -> Router {
    Router::new()
        .nest(
            "/categories",
            resource_router::<CategoryRepository>().with_state(repos.categories.clone()),
        )
        .nest(
            "/units",
            resource_router::<UnitRepository>().with_state(repos.units.clone()),
        )
        .nest("/products", product_routes(repos.products.clone()))
        .nest(
            "/vehicle-brands",
            resource_router::<VehicleBrandRepository>().with_state(repos.vehicle_brands.clone()),
        )
        .nest(
            "/vehicle-variants",
            resource_router::<VehicleVariantRepository>()
                .with_state(repos.vehicle_variants.clone()),
        )
}
