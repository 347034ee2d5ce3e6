// apps/storefront/src/pipelines/contexts.rs

//! Context data of every storefront pipeline.
//! Handlers build one of these per request and hand it over wrapped in `shopflow::ContextData`.

use crate::models::{Cart, CartItem, DeliveryMethod, Order, OrderItem, Product, User};
use crate::services::tokens::TokenPair;
use crate::state::AppState;
use crate::store::CheckoutTx;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct RegistrationCtxData {
  pub app_state: AppState,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub password: String,
  pub password2: String,
  pub replaced_inactive_account: bool,
  pub created_user: Option<User>,
  pub activation_link: Option<String>,
  pub activation_email_sent: bool,
}

impl RegistrationCtxData {
  pub fn new(
    app_state: AppState,
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    password2: String,
  ) -> Self {
    Self {
      app_state,
      email: email.trim().to_lowercase(),
      first_name: first_name.trim().to_string(),
      last_name: last_name.trim().to_string(),
      password,
      password2,
      replaced_inactive_account: false,
      created_user: None,
      activation_link: None,
      activation_email_sent: false,
    }
  }
}

#[derive(Clone)]
pub struct ActivationCtxData {
  pub app_state: AppState,
  pub uidb64: String,
  pub token: String,
  pub user_id: Option<Uuid>,
  pub user: Option<User>,
  pub activated: bool,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub tokens: Option<TokenPair>,
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub authenticated_user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub cart: Option<Cart>,
  pub updated_cart_item: Option<CartItem>,
}

/// One product and the units requested of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

/// Where the lines of a checkout come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSource {
  Cart,
  /// Lines given in the request; the cart is left alone.
  Direct(Vec<RequestedLine>),
}

/// The open checkout transaction, shared across steps.
///
/// A tokio mutex because steps hold it across `.await`. Dropping the last
/// clone while it still holds a transaction rolls that transaction back.
#[derive(Clone, Default)]
pub struct TxSlot(Arc<tokio::sync::Mutex<Option<Box<dyn CheckoutTx>>>>);

impl TxSlot {
  pub fn handle(&self) -> Arc<tokio::sync::Mutex<Option<Box<dyn CheckoutTx>>>> {
    self.0.clone()
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user: User,
  pub source: CheckoutSource,
  pub shipping_address: String,
  pub delivery_method_raw: String,

  pub delivery_method: Option<DeliveryMethod>,
  pub lines: Vec<RequestedLine>,
  pub cart_id: Option<Uuid>,
  /// Cart lines read under the transaction's lock; only these are removed.
  pub cart_item_ids: Vec<Uuid>,
  pub tx: TxSlot,
  pub locked_products: HashMap<Uuid, Product>,
  pub order: Option<Order>,
  pub order_items: Vec<OrderItem>,
  pub committed: bool,
  pub confirmation_email_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(
    app_state: AppState,
    user: User,
    source: CheckoutSource,
    shipping_address: String,
    delivery_method_raw: String,
  ) -> Self {
    Self {
      app_state,
      user,
      source,
      shipping_address,
      delivery_method_raw,
      delivery_method: None,
      lines: Vec::new(),
      cart_id: None,
      cart_item_ids: Vec::new(),
      tx: TxSlot::default(),
      locked_products: HashMap::new(),
      order: None,
      order_items: Vec::new(),
      committed: false,
      confirmation_email_sent: false,
    }
  }

  pub fn is_direct(&self) -> bool {
    matches!(self.source, CheckoutSource::Direct(_))
  }
}

#[derive(Clone)]
pub struct SendActivationEmailCtxData {
  pub app_state: AppState,
  pub recipient_email: String,
  pub recipient_name: String,
  pub activation_link: String,
}

#[derive(Clone)]
pub struct SendOrderConfirmationEmailCtxData {
  pub app_state: AppState,
  pub recipient_email: String,
  pub recipient_name: String,
  pub order_id: Uuid,
  pub order_total_display: String,
}
