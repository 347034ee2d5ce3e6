// apps/storefront/tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::sync::Arc;
use storefront::config::AppConfig;
use storefront::models::{Brand, Category, NewCategory, NewProduct, NewUser, Product, User};
use storefront::services::auth_service;
use storefront::services::mailer::RecordingMailer;
use storefront::services::tokens::TokenKind;
use storefront::state::AppState;
use storefront::store::{CatalogStore, MemoryStore, UserStore};
use tracing::Level;

pub const TEST_PASSWORD: &str = "Qwerty123!";

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Level::WARN.to_string()));
  let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

pub fn test_config() -> AppConfig {
  AppConfig::from_lookup(|name| match name {
    "DATABASE_URL" => Some("memory://".to_string()),
    "JWT_SECRET" => Some("integration-test-secret".to_string()),
    "APP_BASE_URL" => Some("http://shop.test".to_string()),
    _ => None,
  })
  .expect("test config must load")
}

pub struct TestApp {
  pub state: AppState,
  pub store: MemoryStore,
  pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
  pub fn new() -> Self {
    setup_tracing();
    let store = MemoryStore::new();
    let mailer = Arc::new(RecordingMailer::new());
    let state = storefront::build_state(Arc::new(test_config()), Arc::new(store.clone()), mailer.clone());
    Self { state, store, mailer }
  }

  pub async fn active_user(&self, email: &str) -> User {
    let user = self
      .store
      .create_user(&NewUser {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: auth_service::hash_password(TEST_PASSWORD).expect("hash"),
        is_active: true,
        is_staff: false,
      })
      .await
      .expect("create user");
    user
  }

  pub async fn staff_user(&self, email: &str) -> User {
    let mut user = self.active_user(email).await;
    assert!(self.store.set_staff(user.id, true).await);
    user.is_staff = true;
    user
  }

  pub fn bearer(&self, user: &User) -> (String, String) {
    let token = self.state.tokens.issue(user, TokenKind::Access).expect("issue token");
    ("Authorization".to_string(), format!("Bearer {}", token))
  }

  pub async fn catalog(&self) -> (Brand, Category) {
    let brand = self.store.create_brand("Acme").await.expect("brand");
    let category = self
      .store
      .create_category(&NewCategory::new("Desk Lighting", None))
      .await
      .expect("category");
    (brand, category)
  }

  pub async fn product(&self, sku: &str, price: Decimal, quantity: i32) -> Product {
    let (brand, category) = match (
      self.store.list_brands().await.expect("brands").into_iter().next(),
      self.store.list_categories().await.expect("categories").into_iter().next(),
    ) {
      (Some(b), Some(c)) => (b, c),
      _ => self.catalog().await,
    };
    self
      .store
      .create_product(&NewProduct {
        name: format!("Product {}", sku),
        price,
        description: String::new(),
        is_active: true,
        sku: sku.to_string(),
        quantity,
        category_id: category.id,
        brand_id: brand.id,
      })
      .await
      .expect("product")
  }
}

/// Builds the actix test service over `$state` with the real routes.
#[allow(unused_macros)]
macro_rules! test_service {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(storefront::web::configure_app_routes),
    )
    .await
  };
}
