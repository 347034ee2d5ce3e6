// apps/storefront/src/web/handlers/wishlist_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::views;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct WishlistPayload {
  pub product_id: Uuid,
}

#[instrument(name = "handler::get_wishlist", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn get_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let mut products = Vec::new();
  for product_id in app_state.store.wishlist(auth_user.0.id).await? {
    if let Some(product) = app_state.store.get_product(product_id).await? {
      products.push(product);
    }
  }
  Ok(HttpResponse::Ok().json(views::product_views(app_state.store.as_ref(), products).await?))
}

#[instrument(name = "handler::add_to_wishlist", skip(app_state, auth_user), fields(user_id = %auth_user.0.id))]
pub async fn add_to_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<WishlistPayload>,
) -> Result<HttpResponse, AppError> {
  if app_state.store.get_product(payload.product_id).await?.is_none() {
    return Err(AppError::field("product_id", "Product does not exist."));
  }
  let added = app_state.store.add_to_wishlist(auth_user.0.id, payload.product_id).await?;
  let body = json!({"product_id": payload.product_id, "added": added});
  if added {
    Ok(HttpResponse::Created().json(body))
  } else {
    Ok(HttpResponse::Ok().json(body))
  }
}

#[instrument(name = "handler::remove_from_wishlist", skip(app_state, auth_user), fields(user_id = %auth_user.0.id))]
pub async fn remove_from_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.remove_from_wishlist(auth_user.0.id, path.into_inner()).await? {
    return Err(AppError::NotFound("Product is not in the wishlist.".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}
