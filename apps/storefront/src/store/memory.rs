// apps/storefront/src/store/memory.rs

//! In-process store: dev mode (`DATABASE_URL=memory://`) and the test-suite backend.
//!
//! All tables sit behind one `tokio::sync::Mutex`. A checkout takes the lock
//! for its whole lifetime and works on a copy of the tables, so concurrent
//! checkouts serialize and an uncommitted one leaves no trace.

use super::{CartStore, CatalogStore, CheckoutTx, OrderStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::user::first_free_username;
use crate::models::{
  max_price, Brand, Cart, CartItem, Category, NewCategory, NewProduct, NewProductImage, NewUser, Order, OrderItem,
  Product, ProductFilter, ProductImage, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct WishlistEntry {
  user_id: Uuid,
  product_id: Uuid,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
  users: Vec<User>,
  brands: Vec<Brand>,
  categories: Vec<Category>,
  products: Vec<Product>,
  images: Vec<ProductImage>,
  carts: Vec<Cart>,
  cart_items: Vec<CartItem>,
  orders: Vec<Order>,
  order_items: Vec<OrderItem>,
  wishlist: Vec<WishlistEntry>,
}

fn duplicate(what: &str) -> AppError {
  AppError::Validation(format!("{} with these values already exists.", what))
}

fn dangling(what: &str) -> AppError {
  AppError::Validation(format!("{} references a record that does not exist or is protected.", what))
}

impl MemoryState {
  fn check_product_refs(&self, input: &NewProduct, own_id: Option<Uuid>) -> Result<()> {
    if input.quantity < 0 || input.price < Decimal::ZERO || input.price > max_price() {
      return Err(AppError::Validation("Product has invalid values.".to_string()));
    }
    if self.products.iter().any(|p| p.sku == input.sku && Some(p.id) != own_id) {
      return Err(duplicate("Product"));
    }
    if !self.categories.iter().any(|c| c.id == input.category_id) || !self.brands.iter().any(|b| b.id == input.brand_id)
    {
      return Err(dangling("Product"));
    }
    Ok(())
  }

  /// Deletes the products matching `doomed` and everything hanging off them.
  /// Refused when any of them is referenced by an order line.
  fn remove_products(&mut self, doomed: impl Fn(&Product) -> bool) -> Result<usize> {
    let ids: Vec<Uuid> = self.products.iter().filter(|&p| doomed(p)).map(|p| p.id).collect();
    if self.order_items.iter().any(|oi| ids.contains(&oi.product_id)) {
      return Err(AppError::Validation(
        "Product is referenced by existing orders and cannot be deleted.".to_string(),
      ));
    }
    self.products.retain(|p| !ids.contains(&p.id));
    self.images.retain(|i| !ids.contains(&i.product_id));
    self.cart_items.retain(|ci| !ids.contains(&ci.product_id));
    self.wishlist.retain(|w| !ids.contains(&w.product_id));
    Ok(ids.len())
  }

  fn remove_users(&mut self, doomed: impl Fn(&User) -> bool) -> u64 {
    let ids: Vec<Uuid> = self.users.iter().filter(|&u| doomed(u)).map(|u| u.id).collect();
    let cart_ids: Vec<Uuid> = self.carts.iter().filter(|c| ids.contains(&c.user_id)).map(|c| c.id).collect();
    let order_ids: Vec<Uuid> = self.orders.iter().filter(|o| ids.contains(&o.user_id)).map(|o| o.id).collect();
    self.users.retain(|u| !ids.contains(&u.id));
    self.carts.retain(|c| !cart_ids.contains(&c.id));
    self.cart_items.retain(|ci| !cart_ids.contains(&ci.cart_id));
    self.orders.retain(|o| !order_ids.contains(&o.id));
    self.order_items.retain(|oi| !order_ids.contains(&oi.order_id));
    self.wishlist.retain(|w| !ids.contains(&w.user_id));
    ids.len() as u64
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Flips the staff flag of a user; there is no HTTP surface for this.
  pub async fn set_staff(&self, user_id: Uuid, is_staff: bool) -> bool {
    let mut state = self.state.lock().await;
    match state.users.iter_mut().find(|u| u.id == user_id) {
      Some(user) => {
        user.is_staff = is_staff;
        true
      }
      None => false,
    }
  }

  /// Moves the join date of a user, e.g. to age an unactivated account.
  pub async fn set_date_joined(&self, user_id: Uuid, date_joined: DateTime<Utc>) -> bool {
    let mut state = self.state.lock().await;
    match state.users.iter_mut().find(|u| u.id == user_id) {
      Some(user) => {
        user.date_joined = date_joined;
        true
      }
      None => false,
    }
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn list_brands(&self) -> Result<Vec<Brand>> {
    let mut brands = self.state.lock().await.brands.clone();
    brands.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(brands)
  }

  async fn get_brand(&self, id: Uuid) -> Result<Option<Brand>> {
    Ok(self.state.lock().await.brands.iter().find(|b| b.id == id).cloned())
  }

  async fn create_brand(&self, name: &str) -> Result<Brand> {
    let mut state = self.state.lock().await;
    if state.brands.iter().any(|b| b.name == name) {
      return Err(duplicate("Brand"));
    }
    let brand = Brand {
      id: Uuid::new_v4(),
      name: name.to_string(),
    };
    state.brands.push(brand.clone());
    Ok(brand)
  }

  async fn update_brand(&self, id: Uuid, name: &str) -> Result<Option<Brand>> {
    let mut state = self.state.lock().await;
    if state.brands.iter().any(|b| b.name == name && b.id != id) {
      return Err(duplicate("Brand"));
    }
    Ok(state.brands.iter_mut().find(|b| b.id == id).map(|brand| {
      brand.name = name.to_string();
      brand.clone()
    }))
  }

  async fn delete_brand(&self, id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    if !state.brands.iter().any(|b| b.id == id) {
      return Ok(false);
    }
    state.remove_products(|p| p.brand_id == id)?;
    state.brands.retain(|b| b.id != id);
    Ok(true)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let mut categories = self.state.lock().await.categories.clone();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(self.state.lock().await.categories.iter().find(|c| c.id == id).cloned())
  }

  async fn create_category(&self, input: &NewCategory) -> Result<Category> {
    let mut state = self.state.lock().await;
    if state.categories.iter().any(|c| c.name == input.name || c.slug == input.slug) {
      return Err(duplicate("Category"));
    }
    let category = Category {
      id: Uuid::new_v4(),
      name: input.name.clone(),
      slug: input.slug.clone(),
    };
    state.categories.push(category.clone());
    Ok(category)
  }

  async fn update_category(&self, id: Uuid, input: &NewCategory) -> Result<Option<Category>> {
    let mut state = self.state.lock().await;
    if state.categories.iter().any(|c| c.id != id && (c.name == input.name || c.slug == input.slug)) {
      return Err(duplicate("Category"));
    }
    Ok(state.categories.iter_mut().find(|c| c.id == id).map(|category| {
      category.name = input.name.clone();
      category.slug = input.slug.clone();
      category.clone()
    }))
  }

  async fn delete_category(&self, id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    if !state.categories.iter().any(|c| c.id == id) {
      return Ok(false);
    }
    state.remove_products(|p| p.category_id == id)?;
    state.categories.retain(|c| c.id != id);
    Ok(true)
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let state = self.state.lock().await;
    Ok(state.products.iter().filter(|p| filter.matches(p)).cloned().collect())
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.state.lock().await.products.iter().find(|p| p.id == id).cloned())
  }

  async fn create_product(&self, input: &NewProduct) -> Result<Product> {
    let mut state = self.state.lock().await;
    state.check_product_refs(input, None)?;
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: input.name.clone(),
      price: input.price,
      description: input.description.clone(),
      is_active: input.is_active,
      sku: input.sku.clone(),
      quantity: input.quantity,
      category_id: input.category_id,
      brand_id: input.brand_id,
      created_at: now,
      updated_at: now,
    };
    state.products.push(product.clone());
    Ok(product)
  }

  async fn update_product(&self, id: Uuid, input: &NewProduct) -> Result<Option<Product>> {
    let mut state = self.state.lock().await;
    if !state.products.iter().any(|p| p.id == id) {
      return Ok(None);
    }
    state.check_product_refs(input, Some(id))?;
    Ok(state.products.iter_mut().find(|p| p.id == id).map(|product| {
      product.name = input.name.clone();
      product.price = input.price;
      product.description = input.description.clone();
      product.is_active = input.is_active;
      product.sku = input.sku.clone();
      product.quantity = input.quantity;
      product.category_id = input.category_id;
      product.brand_id = input.brand_id;
      product.updated_at = Utc::now();
      product.clone()
    }))
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    Ok(state.remove_products(|p| p.id == id)? > 0)
  }

  async fn list_images(&self, product_id: Option<Uuid>) -> Result<Vec<ProductImage>> {
    let state = self.state.lock().await;
    Ok(
      state
        .images
        .iter()
        .filter(|i| product_id.map_or(true, |pid| i.product_id == pid))
        .cloned()
        .collect(),
    )
  }

  async fn images_for_products(&self, product_ids: &[Uuid]) -> Result<Vec<ProductImage>> {
    let state = self.state.lock().await;
    Ok(state.images.iter().filter(|i| product_ids.contains(&i.product_id)).cloned().collect())
  }

  async fn get_image(&self, id: Uuid) -> Result<Option<ProductImage>> {
    Ok(self.state.lock().await.images.iter().find(|i| i.id == id).cloned())
  }

  async fn create_image(&self, input: &NewProductImage) -> Result<ProductImage> {
    let mut state = self.state.lock().await;
    if !state.products.iter().any(|p| p.id == input.product_id) {
      return Err(dangling("Product image"));
    }
    let image = ProductImage {
      id: Uuid::new_v4(),
      product_id: input.product_id,
      image: input.image.clone(),
      name: Some(input.name.clone()),
    };
    state.images.push(image.clone());
    Ok(image)
  }

  async fn update_image(&self, id: Uuid, input: &NewProductImage) -> Result<Option<ProductImage>> {
    let mut state = self.state.lock().await;
    if !state.products.iter().any(|p| p.id == input.product_id) {
      return Err(dangling("Product image"));
    }
    Ok(state.images.iter_mut().find(|i| i.id == id).map(|image| {
      image.product_id = input.product_id;
      image.image = input.image.clone();
      image.name = Some(input.name.clone());
      image.clone()
    }))
  }

  async fn delete_image(&self, id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    let before = state.images.len();
    state.images.retain(|i| i.id != id);
    Ok(state.images.len() < before)
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>> {
    Ok(self.state.lock().await.carts.iter().find(|c| c.user_id == user_id).cloned())
  }

  async fn get_or_create_cart(&self, user_id: Uuid) -> Result<Cart> {
    let mut state = self.state.lock().await;
    if let Some(cart) = state.carts.iter().find(|c| c.user_id == user_id) {
      return Ok(cart.clone());
    }
    if !state.users.iter().any(|u| u.id == user_id) {
      return Err(dangling("Cart"));
    }
    let cart = Cart {
      id: Uuid::new_v4(),
      user_id,
      created_at: Utc::now(),
    };
    state.carts.push(cart.clone());
    Ok(cart)
  }

  async fn list_cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
    let state = self.state.lock().await;
    Ok(state.cart_items.iter().filter(|ci| ci.cart_id == cart_id).cloned().collect())
  }

  async fn get_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
    let state = self.state.lock().await;
    Ok(state.cart_items.iter().find(|ci| ci.id == item_id && ci.cart_id == cart_id).cloned())
  }

  async fn upsert_cart_item(&self, cart_id: Uuid, product: &Product, quantity: i32) -> Result<CartItem> {
    let mut state = self.state.lock().await;
    if !state.products.iter().any(|p| p.id == product.id) {
      return Err(dangling("Cart item"));
    }
    if let Some(line) = state
      .cart_items
      .iter_mut()
      .find(|ci| ci.cart_id == cart_id && ci.product_id == product.id)
    {
      line.merge(quantity, product.price)?;
      return Ok(line.clone());
    }
    let line = CartItem::priced(Uuid::new_v4(), cart_id, product.id, quantity, product.price)?;
    state.cart_items.push(line.clone());
    Ok(line)
  }

  async fn update_cart_item(
    &self,
    cart_id: Uuid,
    item_id: Uuid,
    product: &Product,
    quantity: i32,
  ) -> Result<Option<CartItem>> {
    let mut state = self.state.lock().await;
    if state
      .cart_items
      .iter()
      .any(|ci| ci.cart_id == cart_id && ci.product_id == product.id && ci.id != item_id)
    {
      return Err(duplicate("Cart item"));
    }
    let Some(line) = state
      .cart_items
      .iter_mut()
      .find(|ci| ci.id == item_id && ci.cart_id == cart_id)
    else {
      return Ok(None);
    };
    let repriced = CartItem::priced(item_id, cart_id, product.id, quantity, product.price)?;
    *line = CartItem {
      added_at: line.added_at,
      ..repriced
    };
    Ok(Some(line.clone()))
  }

  async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    let before = state.cart_items.len();
    state.cart_items.retain(|ci| !(ci.id == item_id && ci.cart_id == cart_id));
    Ok(state.cart_items.len() < before)
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let state = self.state.lock().await;
    let mut orders: Vec<Order> = state.orders.iter().filter(|o| o.user_id == user_id).cloned().collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>> {
    let state = self.state.lock().await;
    Ok(state.orders.iter().find(|o| o.id == order_id && o.user_id == user_id).cloned())
  }

  async fn order_items(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>> {
    let state = self.state.lock().await;
    Ok(state.order_items.iter().filter(|oi| order_ids.contains(&oi.order_id)).cloned().collect())
  }

  async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>> {
    let guard = Arc::clone(&self.state).lock_owned().await;
    let working = guard.clone();
    Ok(Box::new(MemoryCheckoutTx { guard, working }))
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let state = self.state.lock().await;
    Ok(state.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
  }

  async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.state.lock().await.users.iter().find(|u| u.id == id).cloned())
  }

  async fn create_user(&self, input: &NewUser) -> Result<User> {
    let mut state = self.state.lock().await;
    let email = input.email.to_lowercase();
    if state.users.iter().any(|u| u.email == email) {
      return Err(duplicate("User"));
    }
    let username = first_free_username(&input.base_username(), |candidate| {
      state.users.iter().any(|u| u.username == candidate)
    });
    let user = User {
      id: Uuid::new_v4(),
      email,
      username,
      first_name: input.first_name.clone(),
      last_name: input.last_name.clone(),
      password_hash: input.password_hash.clone(),
      is_active: input.is_active,
      is_staff: input.is_staff,
      date_joined: Utc::now(),
    };
    state.users.push(user.clone());
    Ok(user)
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    Ok(self.state.lock().await.remove_users(|u| u.id == id) > 0)
  }

  async fn activate_user(&self, id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    match state.users.iter_mut().find(|u| u.id == id && !u.is_active) {
      Some(user) => {
        user.is_active = true;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn purge_inactive_users(&self, joined_before: DateTime<Utc>) -> Result<u64> {
    let mut state = self.state.lock().await;
    Ok(state.remove_users(|u| !u.is_active && u.date_joined < joined_before))
  }

  async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
    let state = self.state.lock().await;
    Ok(state.wishlist.iter().filter(|w| w.user_id == user_id).map(|w| w.product_id).collect())
  }

  async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    if !state.products.iter().any(|p| p.id == product_id) || !state.users.iter().any(|u| u.id == user_id) {
      return Err(dangling("Wishlist entry"));
    }
    if state.wishlist.iter().any(|w| w.user_id == user_id && w.product_id == product_id) {
      return Ok(false);
    }
    state.wishlist.push(WishlistEntry { user_id, product_id });
    Ok(true)
  }

  async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let mut state = self.state.lock().await;
    let before = state.wishlist.len();
    state.wishlist.retain(|w| !(w.user_id == user_id && w.product_id == product_id));
    Ok(state.wishlist.len() < before)
  }
}

/// Holds the store lock for the whole checkout; `working` replaces the tables on commit.
pub struct MemoryCheckoutTx {
  guard: OwnedMutexGuard<MemoryState>,
  working: MemoryState,
}

#[async_trait]
impl CheckoutTx for MemoryCheckoutTx {
  async fn lock_cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>> {
    Ok(self.working.cart_items.iter().filter(|ci| ci.cart_id == cart_id).cloned().collect())
  }

  async fn lock_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>> {
    let mut locked: Vec<Product> = self
      .working
      .products
      .iter()
      .filter(|p| product_ids.contains(&p.id))
      .cloned()
      .collect();
    locked.sort_by_key(|p| p.id);
    Ok(locked)
  }

  async fn insert_order(&mut self, order: &Order) -> Result<()> {
    if !self.working.users.iter().any(|u| u.id == order.user_id) {
      return Err(dangling("Order"));
    }
    self.working.orders.push(order.clone());
    Ok(())
  }

  async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
    if !self.working.orders.iter().any(|o| o.id == item.order_id)
      || !self.working.products.iter().any(|p| p.id == item.product_id)
    {
      return Err(dangling("Order item"));
    }
    self.working.order_items.push(item.clone());
    Ok(())
  }

  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool> {
    match self
      .working
      .products
      .iter_mut()
      .find(|p| p.id == product_id && p.quantity >= quantity)
    {
      Some(product) => {
        product.quantity -= quantity;
        product.updated_at = Utc::now();
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn set_order_total(&mut self, order_id: Uuid, total: Decimal) -> Result<()> {
    if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == order_id) {
      order.total_amount = total;
    }
    Ok(())
  }

  async fn delete_cart_items(&mut self, cart_id: Uuid, item_ids: &[Uuid]) -> Result<u64> {
    let before = self.working.cart_items.len();
    self
      .working
      .cart_items
      .retain(|ci| !(ci.cart_id == cart_id && item_ids.contains(&ci.id)));
    Ok((before - self.working.cart_items.len()) as u64)
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    let MemoryCheckoutTx { mut guard, working } = *self;
    *guard = working;
    Ok(())
  }
}
