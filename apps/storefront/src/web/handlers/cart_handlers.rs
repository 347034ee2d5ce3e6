// apps/storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use shopflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::quantity_error;
use crate::pipelines::contexts::AddToCartCtxData;
use crate::services::views;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct CartItemPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

fn item_not_found() -> AppError {
  AppError::NotFound("Cart item not found.".to_string())
}

#[instrument(name = "handler::get_cart", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.store.get_or_create_cart(auth_user.0.id).await?;
  Ok(HttpResponse::Ok().json(views::cart_view(app_state.store.as_ref(), cart).await?))
}

#[instrument(name = "handler::list_cart_items", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn list_cart_items_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let items = match app_state.store.find_cart(auth_user.0.id).await? {
    Some(cart) => app_state.store.list_cart_items(cart.id).await?,
    None => Vec::new(),
  };
  Ok(HttpResponse::Ok().json(views::cart_item_views(app_state.store.as_ref(), items).await?))
}

#[instrument(name = "handler::get_cart_item", skip(app_state, auth_user), fields(user_id = %auth_user.0.id))]
pub async fn get_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.store.find_cart(auth_user.0.id).await?.ok_or_else(item_not_found)?;
  let item = app_state
    .store
    .get_cart_item(cart.id, path.into_inner())
    .await?
    .ok_or_else(item_not_found)?;
  let mut views = views::cart_item_views(app_state.store.as_ref(), vec![item]).await?;
  let view = views.pop().ok_or_else(item_not_found)?;
  Ok(HttpResponse::Ok().json(view))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.0.id, product_id = %payload.product_id, quantity = %payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    authenticated_user_id: auth_user.0.id,
    product_id: payload.product_id,
    quantity: payload.quantity,
    product: None,
    cart: None,
    updated_cart_item: None,
  });

  match app_state.flows.run(ctx.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (item, product) = {
        let guard = ctx.read();
        (guard.updated_cart_item.clone(), guard.product.clone())
      };
      let (Some(item), Some(product)) = (item, product) else {
        warn!("Add-to-cart pipeline completed without a cart line.");
        return Err(AppError::Internal("Cart item was not created.".to_string()));
      };
      info!(cart_item_id = %item.id, "Cart line saved.");
      let product_view = views::product_view(app_state.store.as_ref(), product).await?;
      Ok(HttpResponse::Created().json(crate::models::CartItemView::new(item, product_view)))
    }
    Ok(PipelineResult::Stopped) => Err(AppError::PipelineHaltedByHandler),
    Err(app_err) => Err(app_err),
  }
}

#[instrument(name = "handler::update_cart_item", skip(app_state, auth_user, payload), fields(user_id = %auth_user.0.id))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  if let Some(message) = quantity_error(payload.quantity) {
    return Err(AppError::field("quantity", message));
  }
  let product = match app_state.store.get_product(payload.product_id).await? {
    Some(p) if p.is_active => p,
    Some(_) => return Err(AppError::field("product_id", "Product is not available.")),
    None => return Err(AppError::field("product_id", "Product does not exist.")),
  };
  let cart = app_state.store.find_cart(auth_user.0.id).await?.ok_or_else(item_not_found)?;
  let item = app_state
    .store
    .update_cart_item(cart.id, path.into_inner(), &product, payload.quantity)
    .await?
    .ok_or_else(item_not_found)?;
  let product_view = views::product_view(app_state.store.as_ref(), product).await?;
  Ok(HttpResponse::Ok().json(crate::models::CartItemView::new(item, product_view)))
}

#[instrument(name = "handler::delete_cart_item", skip(app_state, auth_user), fields(user_id = %auth_user.0.id))]
pub async fn delete_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.store.find_cart(auth_user.0.id).await?.ok_or_else(item_not_found)?;
  if !app_state.store.delete_cart_item(cart.id, path.into_inner()).await? {
    return Err(item_not_found());
  }
  Ok(HttpResponse::NoContent().finish())
}
