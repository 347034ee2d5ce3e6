// apps/storefront/src/web/handlers/catalog_handlers.rs

//! Brands, categories, products and product images. Reads are public; writes need a staff user.

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors};
use crate::models::{max_price, NewCategory, NewProduct, NewProductImage, ProductFilter};
use crate::services::views;
use crate::state::AppState;
use crate::web::extractors::{MaybeUser, StaffUser};

#[derive(Deserialize, Debug)]
pub struct BrandPayload {
  #[serde(default)]
  pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  #[serde(default)]
  pub name: String,
  pub slug: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ProductImagePayload {
  pub product: Uuid,
  #[serde(default)]
  pub image: String,
}

#[derive(Deserialize, Debug)]
pub struct ImageQuery {
  pub product: Option<Uuid>,
}

fn not_found(what: &str) -> AppError {
  AppError::NotFound(format!("{} not found.", what))
}

fn validated_brand_name(payload: &BrandPayload) -> Result<String, AppError> {
  let name = payload.name.trim();
  if name.is_empty() {
    return Err(AppError::field("name", "This field may not be blank."));
  }
  if name.chars().count() > 128 {
    return Err(AppError::field("name", "Ensure this field has no more than 128 characters."));
  }
  Ok(name.to_string())
}

fn validated_category(payload: &CategoryPayload) -> Result<NewCategory, AppError> {
  let name = payload.name.trim();
  if name.is_empty() {
    return Err(AppError::field("name", "This field may not be blank."));
  }
  Ok(NewCategory::new(name, payload.slug.clone()))
}

async fn validated_product(app_state: &AppState, payload: &NewProduct) -> Result<NewProduct, AppError> {
  let mut errors = FieldErrors::new();
  if payload.name.trim().is_empty() {
    errors.add("name", "This field may not be blank.");
  }
  if payload.sku.trim().is_empty() {
    errors.add("sku", "This field may not be blank.");
  }
  if payload.price < Decimal::ZERO {
    errors.add("price", "Ensure this value is greater than or equal to 0.");
  } else if payload.price.round_dp(2) > max_price() {
    errors.add("price", format!("Ensure this value is less than or equal to {}.", max_price()));
  }
  if payload.quantity < 0 {
    errors.add("quantity", "Ensure this value is greater than or equal to 0.");
  }
  if app_state.store.get_category(payload.category_id).await?.is_none() {
    errors.add("category_id", "Category does not exist.");
  }
  if app_state.store.get_brand(payload.brand_id).await?.is_none() {
    errors.add("brand_id", "Brand does not exist.");
  }
  errors.into_result()?;
  Ok(NewProduct {
    name: payload.name.trim().to_string(),
    sku: payload.sku.trim().to_string(),
    price: payload.price.round_dp(2),
    ..payload.clone()
  })
}

async fn validated_image(app_state: &AppState, payload: &ProductImagePayload) -> Result<NewProductImage, AppError> {
  let mut errors = FieldErrors::new();
  if payload.image.trim().is_empty() {
    errors.add("image", "No file was submitted.");
  }
  if app_state.store.get_product(payload.product).await?.is_none() {
    errors.add("product", "Product does not exist.");
  }
  errors.into_result()?;
  Ok(NewProductImage::new(payload.product, payload.image.trim()))
}

// --- Brands ---

pub async fn list_brands_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_brands().await?))
}

pub async fn get_brand_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let brand = app_state.store.get_brand(path.into_inner()).await?.ok_or_else(|| not_found("Brand"))?;
  Ok(HttpResponse::Ok().json(brand))
}

#[instrument(name = "handler::create_brand", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn create_brand_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  payload: web::Json<BrandPayload>,
) -> Result<HttpResponse, AppError> {
  let name = validated_brand_name(&payload)?;
  let brand = app_state.store.create_brand(&name).await?;
  info!(brand_id = %brand.id, "Brand created.");
  Ok(HttpResponse::Created().json(brand))
}

#[instrument(name = "handler::update_brand", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn update_brand_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<BrandPayload>,
) -> Result<HttpResponse, AppError> {
  let name = validated_brand_name(&payload)?;
  let brand = app_state
    .store
    .update_brand(path.into_inner(), &name)
    .await?
    .ok_or_else(|| not_found("Brand"))?;
  Ok(HttpResponse::Ok().json(brand))
}

#[instrument(name = "handler::delete_brand", skip(app_state, staff), fields(user_id = %staff.0.id))]
pub async fn delete_brand_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.delete_brand(path.into_inner()).await? {
    return Err(not_found("Brand"));
  }
  Ok(HttpResponse::NoContent().finish())
}

// --- Categories ---

pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_categories().await?))
}

pub async fn get_category_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let category = app_state
    .store
    .get_category(path.into_inner())
    .await?
    .ok_or_else(|| not_found("Category"))?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::create_category", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let input = validated_category(&payload)?;
  let category = app_state.store.create_category(&input).await?;
  info!(category_id = %category.id, slug = %category.slug, "Category created.");
  Ok(HttpResponse::Created().json(category))
}

#[instrument(name = "handler::update_category", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let input = validated_category(&payload)?;
  let category = app_state
    .store
    .update_category(path.into_inner(), &input)
    .await?
    .ok_or_else(|| not_found("Category"))?;
  Ok(HttpResponse::Ok().json(category))
}

#[instrument(name = "handler::delete_category", skip(app_state, staff), fields(user_id = %staff.0.id))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.delete_category(path.into_inner()).await? {
    return Err(not_found("Category"));
  }
  Ok(HttpResponse::NoContent().finish())
}

// --- Products ---

/// Staff callers also see inactive products.
#[instrument(name = "handler::list_products", skip(app_state, caller, query))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  caller: MaybeUser,
  query: web::Query<ProductFilter>,
) -> Result<HttpResponse, AppError> {
  let mut filter = query.into_inner();
  filter.include_inactive = caller.0.as_ref().map_or(false, |u| u.is_staff);
  let products = app_state.store.list_products(&filter).await?;
  let views = views::product_views(app_state.store.as_ref(), products).await?;
  Ok(HttpResponse::Ok().json(views))
}

#[instrument(name = "handler::get_product", skip(app_state, caller))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  caller: MaybeUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let include_inactive = caller.0.as_ref().map_or(false, |u| u.is_staff);
  let product = app_state
    .store
    .get_product(product_id)
    .await?
    .filter(|p| p.is_active || include_inactive)
    .ok_or_else(|| not_found("Product"))?;
  Ok(HttpResponse::Ok().json(views::product_view(app_state.store.as_ref(), product).await?))
}

#[instrument(name = "handler::create_product", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let input = validated_product(&app_state, &payload).await?;
  let product = app_state.store.create_product(&input).await?;
  info!(product_id = %product.id, sku = %product.sku, "Product created.");
  Ok(HttpResponse::Created().json(views::product_view(app_state.store.as_ref(), product).await?))
}

#[instrument(name = "handler::update_product", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let input = validated_product(&app_state, &payload).await?;
  let product = app_state
    .store
    .update_product(path.into_inner(), &input)
    .await?
    .ok_or_else(|| not_found("Product"))?;
  Ok(HttpResponse::Ok().json(views::product_view(app_state.store.as_ref(), product).await?))
}

#[instrument(name = "handler::delete_product", skip(app_state, staff), fields(user_id = %staff.0.id))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.delete_product(path.into_inner()).await? {
    return Err(not_found("Product"));
  }
  Ok(HttpResponse::NoContent().finish())
}

// --- Product images ---

pub async fn list_images_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ImageQuery>,
) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(app_state.store.list_images(query.product).await?))
}

pub async fn get_image_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let image = app_state
    .store
    .get_image(path.into_inner())
    .await?
    .ok_or_else(|| not_found("Product image"))?;
  Ok(HttpResponse::Ok().json(image))
}

#[instrument(name = "handler::create_image", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn create_image_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  payload: web::Json<ProductImagePayload>,
) -> Result<HttpResponse, AppError> {
  let input = validated_image(&app_state, &payload).await?;
  let image = app_state.store.create_image(&input).await?;
  Ok(HttpResponse::Created().json(image))
}

#[instrument(name = "handler::update_image", skip(app_state, staff, payload), fields(user_id = %staff.0.id))]
pub async fn update_image_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
  payload: web::Json<ProductImagePayload>,
) -> Result<HttpResponse, AppError> {
  let input = validated_image(&app_state, &payload).await?;
  let image = app_state
    .store
    .update_image(path.into_inner(), &input)
    .await?
    .ok_or_else(|| not_found("Product image"))?;
  Ok(HttpResponse::Ok().json(image))
}

#[instrument(name = "handler::delete_image", skip(app_state, staff), fields(user_id = %staff.0.id))]
pub async fn delete_image_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  if !app_state.store.delete_image(path.into_inner()).await? {
    return Err(not_found("Product image"));
  }
  Ok(HttpResponse::NoContent().finish())
}
