// apps/storefront/src/models/product.rs

use super::{Brand, Category, ProductImage};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub description: String,
  pub is_active: bool,
  pub sku: String,
  /// Units in stock; never negative.
  pub quantity: i32,
  pub category_id: Uuid,
  pub brand_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Insert/update payload for a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub price: Decimal,
  #[serde(default)]
  pub description: String,
  #[serde(default = "default_active")]
  pub is_active: bool,
  pub sku: String,
  #[serde(default)]
  pub quantity: i32,
  pub category_id: Uuid,
  pub brand_id: Uuid,
}

fn default_active() -> bool {
  true
}

/// Largest price a product may carry (`NUMERIC(10, 2)`).
pub fn max_price() -> Decimal {
  Decimal::new(9_999_999_999, 2)
}

/// Listing filters. `sku` matches case-insensitively; price bounds are inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
  pub category: Option<Uuid>,
  pub brand: Option<Uuid>,
  pub sku: Option<String>,
  pub price_min: Option<Decimal>,
  pub price_max: Option<Decimal>,
  #[serde(skip)]
  pub include_inactive: bool,
}

impl ProductFilter {
  pub fn matches(&self, product: &Product) -> bool {
    (self.include_inactive || product.is_active)
      && self.category.map_or(true, |id| product.category_id == id)
      && self.brand.map_or(true, |id| product.brand_id == id)
      && self.sku.as_deref().map_or(true, |sku| product.sku.eq_ignore_ascii_case(sku))
      && self.price_min.map_or(true, |min| product.price >= min)
      && self.price_max.map_or(true, |max| product.price <= max)
  }
}

/// A product as returned by the API, with its category, brand and images nested.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
  pub id: Uuid,
  pub name: String,
  pub price: Decimal,
  pub description: String,
  pub is_active: bool,
  pub sku: String,
  pub quantity: i32,
  pub category: Option<Category>,
  pub brand: Option<Brand>,
  pub images: Vec<ProductImage>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProductView {
  pub fn new(product: Product, category: Option<Category>, brand: Option<Brand>, images: Vec<ProductImage>) -> Self {
    Self {
      id: product.id,
      name: product.name,
      price: product.price,
      description: product.description,
      is_active: product.is_active,
      sku: product.sku,
      quantity: product.quantity,
      category,
      brand,
      images,
      created_at: product.created_at,
      updated_at: product.updated_at,
    }
  }
}
