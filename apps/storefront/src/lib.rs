// apps/storefront/src/lib.rs

//! Storefront HTTP service: catalog, carts, checkout and email/JWT accounts.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod seed;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::activation::ActivationTokens;
use crate::services::mailer::Mailer;
use crate::services::tokens::TokenService;
use crate::state::AppState;
use crate::store::Store;
use chrono::Duration;
use shopflow::Shopflow;
use std::sync::Arc;

/// Wires services around `store` and registers every pipeline.
pub fn build_state(config: Arc<AppConfig>, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> AppState {
  let secret = config.jwt_secret.as_bytes();
  let tokens = TokenService::new(
    secret,
    Duration::minutes(config.access_token_ttl_minutes),
    Duration::minutes(config.refresh_token_ttl_minutes),
  );
  let activation = ActivationTokens::new(secret, Duration::minutes(config.activation_ttl_minutes));
  let flows = Arc::new(Shopflow::<AppError>::new());

  let app_state = AppState {
    store,
    flows: flows.clone(),
    config,
    tokens: Arc::new(tokens),
    activation: Arc::new(activation),
    mailer,
  };
  pipelines::register_all_pipelines(&flows, &app_state);
  app_state
}
