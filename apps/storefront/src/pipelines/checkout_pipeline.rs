// apps/storefront/src/pipelines/checkout_pipeline.rs

//! Turns a cart (or an explicit list of lines) into an order.
//!
//! Everything between `open_checkout_transaction` and `commit_checkout` runs
//! inside one store transaction that holds row locks on the cart being
//! checked out and on the ordered products. A failing step leaves the
//! transaction in the context's
//! [`TxSlot`](crate::pipelines::contexts::TxSlot); dropping the context then
//! rolls it back, so stock, orders and cart stay as they were.

use crate::errors::{AppError, FieldErrors, ShortageReason, StockShortage};
use crate::models::{line_total, max_amount, quantity_error, CartItem, DeliveryMethod, Order, OrderItem, OrderStatus};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutSource, RequestedLine, SendOrderConfirmationEmailCtxData};
use crate::state::AppState;
use chrono::Utc;
use rust_decimal::Decimal;
use shopflow::{ContextData, Pipeline, PipelineControl, Shopflow, SkipCondition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

fn missing_tx() -> AppError {
  AppError::Internal("Checkout transaction is not open.".to_string())
}

/// Sums quantities per product, keeping first-seen order. A merged quantity
/// past the per-line limit is an `items` field error.
pub fn aggregate_lines(lines: &[RequestedLine]) -> Result<Vec<RequestedLine>, AppError> {
  let mut merged: Vec<RequestedLine> = Vec::with_capacity(lines.len());
  for line in lines {
    match merged.iter_mut().find(|m| m.product_id == line.product_id) {
      Some(existing) => {
        existing.quantity = existing
          .quantity
          .checked_add(line.quantity)
          .filter(|q| quantity_error(*q).is_none())
          .ok_or_else(|| {
            AppError::field(
              "items",
              format!("Combined quantity for product {} is too large.", line.product_id),
            )
          })?;
      }
      None => merged.push(*line),
    }
  }
  Ok(merged)
}

fn cart_lines(items: &[CartItem]) -> Result<Vec<RequestedLine>, AppError> {
  let lines: Vec<RequestedLine> = items
    .iter()
    .map(|i| RequestedLine {
      product_id: i.product_id,
      quantity: i.quantity,
    })
    .collect();
  aggregate_lines(&lines)
}

pub fn register_checkout_pipeline(flows: &Arc<Shopflow<AppError>>, _app_state: &AppState) {
  let direct_order: SkipCondition<CheckoutCtxData> =
    Arc::new(|ctx_data: ContextData<CheckoutCtxData>| ctx_data.read().is_direct());
  let direct_order_cart: SkipCondition<CheckoutCtxData> = Arc::clone(&direct_order);

  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("validate_checkout_input", false, None),
    ("gather_requested_lines", false, None),
    ("open_checkout_transaction", false, None),
    ("lock_cart_lines", false, Some(direct_order_cart)),
    ("lock_and_verify_stock", false, None),
    ("create_order_record", false, None),
    ("write_order_lines", false, None),
    ("finalize_order_total", false, None),
    ("clear_cart", false, Some(direct_order)),
    ("commit_checkout", false, None),
    ("send_order_confirmation", true, None),
  ]);

  p.on("validate_checkout_input", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut errors = FieldErrors::new();
      let delivery_method = {
        let guard = ctx_data.read();
        if guard.shipping_address.trim().is_empty() {
          errors.add("shipping_address", "This field is required.");
        }
        let method = DeliveryMethod::parse(&guard.delivery_method_raw);
        if method.is_none() {
          errors.add(
            "delivery_method",
            format!("\"{}\" is not a valid choice.", guard.delivery_method_raw),
          );
        }
        if let CheckoutSource::Direct(lines) = &guard.source {
          if lines.is_empty() {
            errors.add("items", "At least one item is required.");
          }
          if let Some(message) = lines.iter().find_map(|l| quantity_error(l.quantity)) {
            errors.add("items", message);
          }
        }
        method
      };
      errors.into_result()?;
      ctx_data.write().delivery_method = delivery_method;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("gather_requested_lines", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (source, user_id, store) = {
        let guard = ctx_data.read();
        (guard.source.clone(), guard.user.id, guard.app_state.store.clone())
      };

      match source {
        CheckoutSource::Direct(lines) => {
          let lines = aggregate_lines(&lines)?;
          ctx_data.write().lines = lines;
        }
        CheckoutSource::Cart => {
          let Some(cart) = store.find_cart(user_id).await? else {
            warn!(%user_id, "Checkout without a cart.");
            return Err(AppError::EmptyCart);
          };
          let items = store.list_cart_items(cart.id).await?;
          if items.is_empty() {
            warn!(%user_id, cart_id = %cart.id, "Checkout on an empty cart.");
            return Err(AppError::EmptyCart);
          }
          ctx_data.write().cart_id = Some(cart.id);
        }
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("open_checkout_transaction", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, store) = {
        let guard = ctx_data.read();
        (guard.tx.handle(), guard.app_state.store.clone())
      };
      let tx = store.begin_checkout().await?;
      *slot.lock().await = Some(tx);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("lock_cart_lines", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, cart_id) = {
        let guard = ctx_data.read();
        (guard.tx.handle(), guard.cart_id)
      };
      let cart_id = cart_id.ok_or_else(|| AppError::Internal("Cart missing from checkout context.".to_string()))?;

      let items = {
        let mut tx_guard = slot.lock().await;
        let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
        tx.lock_cart_items(cart_id).await?
      };
      if items.is_empty() {
        warn!(%cart_id, "Cart was emptied before checkout acquired it.");
        return Err(AppError::EmptyCart);
      }
      let lines = cart_lines(&items)?;
      let mut guard = ctx_data.write();
      guard.cart_item_ids = items.iter().map(|i| i.id).collect();
      guard.lines = lines;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("lock_and_verify_stock", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, lines) = {
        let guard = ctx_data.read();
        (guard.tx.handle(), guard.lines.clone())
      };
      let mut product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
      product_ids.sort();

      let locked = {
        let mut tx_guard = slot.lock().await;
        let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
        tx.lock_products(&product_ids).await?
      };
      let locked: HashMap<Uuid, _> = locked.into_iter().map(|p| (p.id, p)).collect();

      let mut shortages = Vec::new();
      for line in &lines {
        let shortage = match locked.get(&line.product_id) {
          None => Some((None, 0, ShortageReason::Missing)),
          Some(p) if !p.is_active => Some((Some(p.sku.clone()), p.quantity, ShortageReason::Inactive)),
          Some(p) if p.quantity < line.quantity => {
            Some((Some(p.sku.clone()), p.quantity, ShortageReason::InsufficientStock))
          }
          Some(_) => None,
        };
        if let Some((sku, available, reason)) = shortage {
          shortages.push(StockShortage {
            product_id: line.product_id,
            sku,
            available,
            requested: line.quantity,
            reason,
          });
        }
      }
      if !shortages.is_empty() {
        warn!(count = shortages.len(), "Checkout rejected for unavailable stock.");
        return Err(AppError::StockConflict(shortages));
      }

      ctx_data.write().locked_products = locked;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("create_order_record", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, order) = {
        let guard = ctx_data.read();
        let delivery_method = guard.delivery_method.ok_or_else(|| {
          AppError::Internal("Delivery method missing from checkout context.".to_string())
        })?;
        let order = Order {
          id: Uuid::new_v4(),
          user_id: guard.user.id,
          status: OrderStatus::New,
          total_amount: Decimal::ZERO,
          shipping_address: guard.shipping_address.trim().to_string(),
          delivery_method,
          created_at: Utc::now(),
        };
        (guard.tx.handle(), order)
      };

      {
        let mut tx_guard = slot.lock().await;
        let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
        tx.insert_order(&order).await?;
      }
      info!(order_id = %order.id, user_id = %order.user_id, "Order record created.");
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("write_order_lines", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, order_id, lines, products) = {
        let guard = ctx_data.read();
        (
          guard.tx.handle(),
          guard.order.as_ref().map(|o| o.id),
          guard.lines.clone(),
          guard.locked_products.clone(),
        )
      };
      let order_id = order_id.ok_or_else(|| AppError::Internal("Order missing from checkout context.".to_string()))?;

      let mut written = Vec::with_capacity(lines.len());
      let mut tx_guard = slot.lock().await;
      let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
      for line in &lines {
        let product = products
          .get(&line.product_id)
          .ok_or_else(|| AppError::Internal(format!("Product {} was not locked.", line.product_id)))?;
        let subtotal = line_total(product.price, line.quantity).ok_or_else(|| {
          AppError::field("items", format!("Order line total for {} is too large.", product.sku))
        })?;
        let item = OrderItem {
          id: Uuid::new_v4(),
          order_id,
          product_id: product.id,
          quantity: line.quantity,
          unit_price: product.price,
          subtotal,
        };
        tx.insert_order_item(&item).await?;
        if !tx.decrement_stock(product.id, line.quantity).await? {
          error!(product_id = %product.id, "Stock guard failed while rows were locked.");
          return Err(AppError::StockConflict(vec![StockShortage {
            product_id: product.id,
            sku: Some(product.sku.clone()),
            available: product.quantity,
            requested: line.quantity,
            reason: ShortageReason::InsufficientStock,
          }]));
        }
        written.push(item);
      }
      drop(tx_guard);

      ctx_data.write().order_items = written;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("finalize_order_total", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, order_id, total) = {
        let guard = ctx_data.read();
        let total = guard
          .order_items
          .iter()
          .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.subtotal))
          .filter(|t| *t <= max_amount());
        (guard.tx.handle(), guard.order.as_ref().map(|o| o.id), total)
      };
      let order_id = order_id.ok_or_else(|| AppError::Internal("Order missing from checkout context.".to_string()))?;
      let total = total
        .ok_or_else(|| AppError::field("items", "Order total is too large."))?
        .round_dp(2);

      {
        let mut tx_guard = slot.lock().await;
        let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
        tx.set_order_total(order_id, total).await?;
      }
      if let Some(order) = ctx_data.write().order.as_mut() {
        order.total_amount = total;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("clear_cart", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (slot, cart_id, item_ids) = {
        let guard = ctx_data.read();
        (guard.tx.handle(), guard.cart_id, guard.cart_item_ids.clone())
      };
      let Some(cart_id) = cart_id else {
        return Ok(PipelineControl::Continue);
      };

      let removed = {
        let mut tx_guard = slot.lock().await;
        let tx = tx_guard.as_mut().ok_or_else(missing_tx)?;
        tx.delete_cart_items(cart_id, &item_ids).await?
      };
      if removed != item_ids.len() as u64 {
        error!(%cart_id, removed, expected = item_ids.len(), "Cart lines vanished under a held lock.");
        return Err(AppError::CartChanged);
      }
      info!(%cart_id, removed, "Checked-out cart lines removed.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("commit_checkout", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let slot = ctx_data.read().tx.handle();
      let tx = slot.lock().await.take().ok_or_else(missing_tx)?;
      tx.commit().await?;
      let order_id = {
        let mut guard = ctx_data.write();
        guard.committed = true;
        guard.order.as_ref().map(|o| o.id)
      };
      info!(order_id = ?order_id, "Checkout committed.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("send_order_confirmation", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (app_state, user, order) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user.clone(), guard.order.clone())
      };
      let Some(order) = order else {
        return Err(AppError::Internal("Order missing for confirmation email.".to_string()));
      };

      let email_ctx = ContextData::new(SendOrderConfirmationEmailCtxData {
        app_state,
        recipient_email: user.email,
        recipient_name: user.first_name,
        order_id: order.id,
        order_total_display: order.total_amount.to_string(),
      });
      common_steps::send_order_confirmation_email_step(email_ctx).await?;
      ctx_data.write().confirmation_email_sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Checkout pipeline registered.");
}
