//! Page models handed to the rendering layer.
//!
//! Nothing here touches the database; repositories produce records and the
//! HTTP layer threads the one-shot [`Notice`] from a write into the next list
//! render.

use axum::http::{header, HeaderMap, HeaderValue};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::entities::{category, product, unit, vehicle_brand, vehicle_variant};
use crate::pagination::Page;

/// Cookie carrying a notice across the redirect after a write.
pub const FLASH_COOKIE: &str = "flash";

/// A one-shot success message produced by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice(String);

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn created(label: &str) -> Self {
        Self(format!("{} created successfully.", label))
    }

    pub fn updated(label: &str) -> Self {
        Self(format!("{} updated successfully.", label))
    }

    pub fn deleted(label: &str) -> Self {
        Self(format!("{} deleted successfully.", label))
    }

    pub fn image_updated() -> Self {
        Self("Image product updated successfully.".to_string())
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    pub fn into_message(self) -> String {
        self.0
    }

    /// `Set-Cookie` value that hands this notice to the next request.
    pub fn to_cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            urlencoding::encode(&self.0)
        )
    }

    /// Reads a notice set by the previous response, if any.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .and_then(|(_, value)| urlencoding::decode(value).ok())
            .filter(|message| !message.is_empty())
            .map(|message| Notice(message.into_owned()))
    }

    /// `Set-Cookie` value that consumes the notice.
    pub fn clear_cookie() -> HeaderValue {
        HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
    }
}

/// Records that can be addressed by id on a rendered page.
pub trait Identified {
    fn id(&self) -> i32;
}

/// A list screen: one page of records plus the notice from the previous write.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage<T> {
    pub records: Page<T>,
    pub success: Option<String>,
}

impl<T: Identified> ListPage<T> {
    pub fn render(records: Page<T>, notice: Option<Notice>) -> Self {
        Self {
            records,
            success: notice.map(Notice::into_message),
        }
    }

    /// Drops a record from an already rendered page, ahead of the server
    /// confirming the delete.
    pub fn remove(&mut self, id: i32) -> bool {
        let before = self.records.data.len();
        self.records.data.retain(|record| record.id() != id);
        before != self.records.data.len()
    }
}

/// Related rows a form needs for its select inputs.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookups {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<category::Model>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Vec<unit::Model>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_brands: Option<Vec<vehicle_brand::Model>>,
}

/// A create or edit screen. `record` is absent on create.
#[derive(Debug, Clone, Serialize)]
pub struct FormPage<T> {
    pub record: Option<T>,
    #[serde(flatten)]
    pub lookups: Lookups,
}

/// Confirmation text shown before a delete.
pub fn delete_prompt(kind: &str, id: i32, name: &str) -> String {
    format!("Do you want to delete a {} - {}. {}", kind, id, name)
}

/// Formats an amount as Indonesian Rupiah, e.g. `Rp 1.250.000,00` with a
/// non-breaking space after the symbol.
pub fn format_idr(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}Rp\u{a0}{},{}", sign, grouped, cents)
}

/// A product as shown on list and form screens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<category::Model>,
    pub unit: Option<unit::Model>,
    pub image_url: Option<String>,
    pub price_label: String,
    pub cost_label: String,
}

impl ProductView {
    pub fn new(
        product: product::Model,
        category: Option<category::Model>,
        unit: Option<unit::Model>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            price_label: format_idr(product.price),
            cost_label: format_idr(product.cost),
            product,
            category,
            unit,
            image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleVariantView {
    #[serde(flatten)]
    pub variant: vehicle_variant::Model,
    pub vehicle_brand: Option<vehicle_brand::Model>,
}

impl Identified for ProductView {
    fn id(&self) -> i32 {
        self.product.id
    }
}

impl Identified for VehicleVariantView {
    fn id(&self) -> i32 {
        self.variant.id
    }
}

impl Identified for category::Model {
    fn id(&self) -> i32 {
        self.id
    }
}

impl Identified for unit::Model {
    fn id(&self) -> i32 {
        self.id
    }
}

impl Identified for vehicle_brand::Model {
    fn id(&self) -> i32 {
        self.id
    }
}
