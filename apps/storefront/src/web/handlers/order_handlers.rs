// apps/storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutSource, RequestedLine};
use crate::services::views;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CheckoutPayload {
  #[serde(default)]
  pub shipping_address: String,
  #[serde(default)]
  pub delivery_method: String,
}

#[derive(Deserialize, Debug)]
pub struct DirectOrderLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct DirectOrderPayload {
  #[serde(default)]
  pub shipping_address: String,
  #[serde(default)]
  pub delivery_method: String,
  #[serde(default)]
  pub items: Vec<DirectOrderLine>,
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_orders(auth_user.0.id).await?;
  Ok(HttpResponse::Ok().json(views::order_views(app_state.store.as_ref(), orders).await?))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.0.id))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .store
    .get_order(auth_user.0.id, path.into_inner())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found.".to_string()))?;
  let mut views = views::order_views(app_state.store.as_ref(), vec![order]).await?;
  let view = views
    .pop()
    .ok_or_else(|| AppError::Internal("Order view could not be built.".to_string()))?;
  Ok(HttpResponse::Ok().json(view))
}

/// Runs the checkout pipeline and answers 201 with the created order.
async fn run_checkout(app_state: &web::Data<AppState>, ctx_data: CheckoutCtxData) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(ctx_data);
  let outcome = app_state.flows.run(ctx.clone()).await;

  match outcome {
    Ok(PipelineResult::Completed) => {
      let (order, committed) = {
        let guard = ctx.read();
        (guard.order.clone(), guard.committed)
      };
      let order = match order {
        Some(order) if committed => order,
        _ => return Err(AppError::Internal("Checkout completed without committing an order.".to_string())),
      };
      info!(order_id = %order.id, total = %order.total_amount, "Order placed.");
      let mut views = views::order_views(app_state.store.as_ref(), vec![order]).await?;
      let view = views
        .pop()
        .ok_or_else(|| AppError::Internal("Order view could not be built.".to_string()))?;
      Ok(HttpResponse::Created().json(view))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Checkout pipeline stopped before commit.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => {
      let slot = ctx.read().tx.handle();
      if slot.lock().await.take().is_some() {
        warn!(error = %app_err, "Checkout failed; transaction rolled back.");
      }
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::order_from_cart", skip(app_state, auth_user, payload), fields(user_id = %auth_user.0.id))]
pub async fn order_from_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let ctx_data = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.0,
    CheckoutSource::Cart,
    payload.shipping_address,
    payload.delivery_method,
  );
  run_checkout(&app_state, ctx_data).await
}

#[instrument(name = "handler::create_order", skip(app_state, auth_user, payload), fields(user_id = %auth_user.0.id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<DirectOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = payload.into_inner();
  let lines = payload
    .items
    .iter()
    .map(|line| RequestedLine {
      product_id: line.product_id,
      quantity: line.quantity,
    })
    .collect();
  let ctx_data = CheckoutCtxData::new(
    app_state.get_ref().clone(),
    auth_user.0,
    CheckoutSource::Direct(lines),
    payload.shipping_address,
    payload.delivery_method,
  );
  run_checkout(&app_state, ctx_data).await
}
