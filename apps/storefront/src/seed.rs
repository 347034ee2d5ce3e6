// apps/storefront/src/seed.rs

//! Startup data: the demo catalog and the configured staff account.

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::models::{NewCategory, NewProduct, NewProductImage, NewUser};
use crate::services::auth_service;
use crate::store::Store;
use rust_decimal::Decimal;
use tracing::{info, instrument};

/// Inserts a small catalog unless one already exists.
#[instrument(name = "seed::demo_catalog", skip(store))]
pub async fn seed_demo_catalog(store: &dyn Store) -> AppResult<()> {
  if !store.list_brands().await?.is_empty() {
    info!("Catalog already present; skipping demo seed.");
    return Ok(());
  }

  let acme = store.create_brand("Acme").await?;
  let globex = store.create_brand("Globex").await?;
  let lighting = store.create_category(&NewCategory::new("Desk Lighting", None)).await?;
  let office = store.create_category(&NewCategory::new("Office Chairs", None)).await?;

  let products = [
    ("Arc Desk Lamp", "LMP-ARC-01", Decimal::new(4990, 2), 25, &lighting, &acme),
    ("Clamp Lamp", "LMP-CLP-02", Decimal::new(2450, 2), 40, &lighting, &globex),
    ("Mesh Task Chair", "CHR-MSH-01", Decimal::new(18900, 2), 8, &office, &acme),
    ("Executive Chair", "CHR-EXE-02", Decimal::new(34900, 2), 3, &office, &globex),
  ];
  for (name, sku, price, quantity, category, brand) in products {
    let product = store
      .create_product(&NewProduct {
        name: name.to_string(),
        price,
        description: format!("{} from the demo catalog.", name),
        is_active: true,
        sku: sku.to_string(),
        quantity,
        category_id: category.id,
        brand_id: brand.id,
      })
      .await?;
    let image_path = format!("product_images/{}.jpg", sku.to_lowercase());
    store.create_image(&NewProductImage::new(product.id, image_path)).await?;
  }
  info!("Demo catalog seeded.");
  Ok(())
}

/// Creates the staff account from `ADMIN_EMAIL` / `ADMIN_PASSWORD` if it does not exist yet.
#[instrument(name = "seed::staff_account", skip(store, config))]
pub async fn ensure_staff_account(store: &dyn Store, config: &AppConfig) -> AppResult<()> {
  let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
    return Ok(());
  };
  if store.find_user_by_email(email).await?.is_some() {
    return Ok(());
  }
  let user = store
    .create_user(&NewUser {
      email: email.clone(),
      first_name: "Admin".to_string(),
      last_name: String::new(),
      password_hash: auth_service::hash_password(password)?,
      is_active: true,
      is_staff: true,
    })
    .await?;
  info!(user_id = %user.id, "Staff account created.");
  Ok(())
}
