// apps/storefront/src/models/cart.rs

use super::ProductView;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Largest quantity a single cart or order line may carry.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Largest stored monetary amount (`NUMERIC(12, 2)`).
pub fn max_amount() -> Decimal {
  Decimal::new(999_999_999_999, 2)
}

/// `unit_price * quantity`, or `None` when it overflows or exceeds [`max_amount`].
pub fn line_total(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
  unit_price
    .checked_mul(Decimal::from(quantity))
    .filter(|total| *total <= max_amount())
}

/// Field error for a quantity outside `1..=MAX_LINE_QUANTITY`, if any.
pub fn quantity_error(quantity: i32) -> Option<String> {
  if quantity < 1 {
    Some("Quantity must be at least 1.".to_string())
  } else if quantity > MAX_LINE_QUANTITY {
    Some(format!("Ensure this value is less than or equal to {}.", MAX_LINE_QUANTITY))
  } else {
    None
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Uuid,
  pub created_at: DateTime<Utc>,
}

/// One product line of a cart. `unit_price` and `total_item_price` are
/// recomputed from the product's current price on every write.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub total_item_price: Decimal,
  pub added_at: DateTime<Utc>,
}

impl CartItem {
  /// Builds a line priced at `unit_price`; rejects quantities or totals that do not fit.
  pub fn priced(id: Uuid, cart_id: Uuid, product_id: Uuid, quantity: i32, unit_price: Decimal) -> Result<Self> {
    if let Some(message) = quantity_error(quantity) {
      return Err(AppError::field("quantity", message));
    }
    let total_item_price =
      line_total(unit_price, quantity).ok_or_else(|| AppError::field("quantity", "Line total is too large."))?;
    Ok(Self {
      id,
      cart_id,
      product_id,
      quantity,
      unit_price,
      total_item_price,
      added_at: Utc::now(),
    })
  }

  /// Adds `quantity` to this line and reprices it at `unit_price`.
  pub fn merge(&mut self, quantity: i32, unit_price: Decimal) -> Result<()> {
    let merged = self
      .quantity
      .checked_add(quantity)
      .ok_or_else(|| AppError::field("quantity", "Quantity is too large."))?;
    let repriced = Self::priced(self.id, self.cart_id, self.product_id, merged, unit_price)?;
    self.quantity = repriced.quantity;
    self.unit_price = repriced.unit_price;
    self.total_item_price = repriced.total_item_price;
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
  pub id: Uuid,
  pub cart: Uuid,
  pub product: ProductView,
  pub quantity: i32,
  pub unit_price: Decimal,
  pub total_item_price: Decimal,
}

impl CartItemView {
  pub fn new(item: CartItem, product: ProductView) -> Self {
    Self {
      id: item.id,
      cart: item.cart_id,
      product,
      quantity: item.quantity,
      unit_price: item.unit_price,
      total_item_price: item.total_item_price,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
  pub id: Uuid,
  pub user: Uuid,
  pub items: Vec<CartItemView>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(quantity: i32, price: Decimal) -> CartItem {
    CartItem::priced(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), quantity, price).unwrap()
  }

  #[test]
  fn quantities_outside_the_allowed_range_are_rejected() {
    assert!(quantity_error(0).is_some());
    assert!(quantity_error(MAX_LINE_QUANTITY + 1).is_some());
    assert!(quantity_error(i32::MAX).is_some());
    assert!(quantity_error(1).is_none());
    assert!(quantity_error(MAX_LINE_QUANTITY).is_none());
  }

  #[test]
  fn line_total_refuses_amounts_that_do_not_fit() {
    assert_eq!(line_total(Decimal::new(1999, 2), 3), Some(Decimal::new(5997, 2)));
    assert_eq!(line_total(Decimal::MAX, 2), None);
    assert_eq!(line_total(crate::models::max_price(), MAX_LINE_QUANTITY), None);
  }

  #[test]
  fn merge_caps_the_summed_quantity() {
    let mut item = line(MAX_LINE_QUANTITY - 1, Decimal::ONE);
    item.merge(1, Decimal::new(150, 2)).unwrap();
    assert_eq!(item.quantity, MAX_LINE_QUANTITY);
    assert_eq!(item.total_item_price, Decimal::new(1_500_000, 2));

    let err = item.merge(i32::MAX, Decimal::ONE).unwrap_err();
    assert!(matches!(err, AppError::Invalid(f) if f.get("quantity").is_some()));
    assert_eq!(item.quantity, MAX_LINE_QUANTITY);
  }
}
