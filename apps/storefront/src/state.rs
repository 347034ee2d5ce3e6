// apps/storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::activation::ActivationTokens;
use crate::services::mailer::Mailer;
use crate::services::tokens::TokenService;
use crate::store::Store;
use shopflow::Shopflow;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Shopflow<AppError>>,
  pub config: Arc<AppConfig>,
  pub tokens: Arc<TokenService>,
  pub activation: Arc<ActivationTokens>,
  pub mailer: Arc<dyn Mailer>,
}
