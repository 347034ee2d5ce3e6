// apps/storefront/src/pipelines/mod.rs

//! Defines and registers every pipeline the storefront runs.

use crate::errors::AppError;
use crate::state::AppState;
use shopflow::Shopflow;
use std::sync::Arc;

pub mod common_steps;
pub mod contexts;

pub mod activation_pipeline;
pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod registration_pipeline;
pub mod signin_pipeline;

/// Registers all pipelines with `flows`. Called once at startup.
pub fn register_all_pipelines(flows: &Arc<Shopflow<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  registration_pipeline::register_registration_pipeline(flows, app_state);
  activation_pipeline::register_activation_pipeline(flows, app_state);
  signin_pipeline::register_signin_pipeline(flows, app_state);
  cart_pipeline::register_add_to_cart_pipeline(flows, app_state);
  checkout_pipeline::register_checkout_pipeline(flows, app_state);

  tracing::info!("All application pipelines registered.");
}
