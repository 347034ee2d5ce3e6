// apps/storefront/src/pipelines/cart_pipeline.rs

use crate::errors::AppError;
use crate::models::quantity_error;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;
use shopflow::{ContextData, Pipeline, PipelineControl, Shopflow};
use std::sync::Arc;
use tracing::{info, warn};

pub fn register_add_to_cart_pipeline(flows: &Arc<Shopflow<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("fetch_product_for_cart", false, None),
    ("resolve_user_cart", false, None),
    ("add_or_update_cart_item", false, None),
  ]);

  p.on("validate_cart_input", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let quantity = ctx_data.read().quantity;
      if let Some(message) = quantity_error(quantity) {
        warn!(quantity, "Add to cart with an out-of-range quantity.");
        return Err(AppError::field("quantity", message));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("fetch_product_for_cart", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (product_id, store) = {
        let guard = ctx_data.read();
        (guard.product_id, guard.app_state.store.clone())
      };

      let product = match store.get_product(product_id).await? {
        Some(product) if product.is_active => product,
        Some(_) => {
          warn!(%product_id, "Add to cart for an inactive product.");
          return Err(AppError::field("product_id", "Product is not available."));
        }
        None => {
          warn!(%product_id, "Add to cart for an unknown product.");
          return Err(AppError::field("product_id", "Product does not exist."));
        }
      };
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("resolve_user_cart", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (user_id, store) = {
        let guard = ctx_data.read();
        (guard.authenticated_user_id, guard.app_state.store.clone())
      };
      let cart = store.get_or_create_cart(user_id).await?;
      ctx_data.write().cart = Some(cart);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on("add_or_update_cart_item", |ctx_data: ContextData<AddToCartCtxData>| {
    Box::pin(async move {
      let (cart, product, quantity, store) = {
        let guard = ctx_data.read();
        (guard.cart.clone(), guard.product.clone(), guard.quantity, guard.app_state.store.clone())
      };
      let (Some(cart), Some(product)) = (cart, product) else {
        return Err(AppError::Internal("Cart or product missing from add-to-cart context.".to_string()));
      };

      let item = store.upsert_cart_item(cart.id, &product, quantity).await?;
      info!(
        cart_id = %cart.id,
        product_id = %product.id,
        quantity = item.quantity,
        total = %item.total_item_price,
        "Cart line added or merged."
      );
      ctx_data.write().updated_cart_item = Some(item);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  tracing::info!("Add-to-cart pipeline registered.");
}
