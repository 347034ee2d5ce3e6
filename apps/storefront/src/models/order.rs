// apps/storefront/src/models/order.rs

use super::ProductView;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  New,
  Paid,
  Shipped,
  Delivered,
  Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_method_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
  Pickup,
  Courier,
  Post,
}

impl DeliveryMethod {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw.trim().to_ascii_lowercase().as_str() {
      "pickup" => Some(Self::Pickup),
      "courier" => Some(Self::Courier),
      "post" => Some(Self::Post),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  pub total_amount: Decimal,
  pub shipping_address: String,
  pub delivery_method: DeliveryMethod,
  pub created_at: DateTime<Utc>,
}

/// Immutable order line; `subtotal = unit_price * quantity` at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
  pub id: Uuid,
  pub order: Uuid,
  pub product: Option<ProductView>,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub subtotal: Decimal,
}

impl OrderItemView {
  pub fn new(item: OrderItem, product: Option<ProductView>) -> Self {
    Self {
      id: item.id,
      order: item.order_id,
      product,
      product_id: item.product_id,
      quantity: item.quantity,
      unit_price: item.unit_price,
      subtotal: item.subtotal,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
  pub id: Uuid,
  pub user: Uuid,
  pub status: OrderStatus,
  pub total_amount: Decimal,
  pub created_at: DateTime<Utc>,
  pub shipping_address: String,
  pub delivery_method: DeliveryMethod,
  pub items: Vec<OrderItemView>,
}

impl OrderView {
  pub fn new(order: Order, items: Vec<OrderItemView>) -> Self {
    Self {
      id: order.id,
      user: order.user_id,
      status: order.status,
      total_amount: order.total_amount,
      created_at: order.created_at,
      shipping_address: order.shipping_address,
      delivery_method: order.delivery_method,
      items,
    }
  }
}
