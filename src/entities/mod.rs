pub mod category;
pub mod product;
pub mod unit;
pub mod vehicle_brand;
pub mod vehicle_variant;
