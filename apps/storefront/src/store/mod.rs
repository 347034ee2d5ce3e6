// apps/storefront/src/store/mod.rs

//! Persistence behind async traits, with a Postgres and an in-memory backend.
//!
//! Handlers and pipelines only see `Arc<dyn Store>`. The checkout runs
//! through a [`CheckoutTx`]: every write it makes is visible to others only
//! after [`CheckoutTx::commit`]; dropping the handle rolls everything back.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{
  Brand, Cart, CartItem, Category, NewCategory, NewProduct, NewProductImage, NewUser, Order, OrderItem, Product,
  ProductFilter, ProductImage, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn list_brands(&self) -> Result<Vec<Brand>>;
  async fn get_brand(&self, id: Uuid) -> Result<Option<Brand>>;
  async fn create_brand(&self, name: &str) -> Result<Brand>;
  async fn update_brand(&self, id: Uuid, name: &str) -> Result<Option<Brand>>;
  /// Cascades to the brand's products.
  async fn delete_brand(&self, id: Uuid) -> Result<bool>;

  async fn list_categories(&self) -> Result<Vec<Category>>;
  async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
  async fn create_category(&self, input: &NewCategory) -> Result<Category>;
  async fn update_category(&self, id: Uuid, input: &NewCategory) -> Result<Option<Category>>;
  /// Cascades to the category's products.
  async fn delete_category(&self, id: Uuid) -> Result<bool>;

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
  async fn create_product(&self, input: &NewProduct) -> Result<Product>;
  async fn update_product(&self, id: Uuid, input: &NewProduct) -> Result<Option<Product>>;
  /// Cascades to images, cart lines and wishlist entries; refused while order lines reference the product.
  async fn delete_product(&self, id: Uuid) -> Result<bool>;

  /// All images, or only those of `product_id`.
  async fn list_images(&self, product_id: Option<Uuid>) -> Result<Vec<ProductImage>>;
  async fn images_for_products(&self, product_ids: &[Uuid]) -> Result<Vec<ProductImage>>;
  async fn get_image(&self, id: Uuid) -> Result<Option<ProductImage>>;
  async fn create_image(&self, input: &NewProductImage) -> Result<ProductImage>;
  async fn update_image(&self, id: Uuid, input: &NewProductImage) -> Result<Option<ProductImage>>;
  async fn delete_image(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>>;
  async fn get_or_create_cart(&self, user_id: Uuid) -> Result<Cart>;
  async fn list_cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>>;
  async fn get_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>>;
  /// Adds `quantity` of `product`, merging into an existing line for the same product.
  async fn upsert_cart_item(&self, cart_id: Uuid, product: &Product, quantity: i32) -> Result<CartItem>;
  /// Replaces product and quantity of a line, repricing it.
  async fn update_cart_item(
    &self,
    cart_id: Uuid,
    item_id: Uuid,
    product: &Product,
    quantity: i32,
  ) -> Result<Option<CartItem>>;
  async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>>;
  async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>>;
  async fn order_items(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>>;
  async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
  /// Inserts the user with a generated unique username.
  async fn create_user(&self, input: &NewUser) -> Result<User>;
  async fn delete_user(&self, id: Uuid) -> Result<bool>;
  async fn activate_user(&self, id: Uuid) -> Result<bool>;
  /// Deletes inactive accounts that joined before `joined_before`.
  async fn purge_inactive_users(&self, joined_before: DateTime<Utc>) -> Result<u64>;

  async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
  /// Returns `false` when the product was already listed.
  async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
  async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool>;
}

pub trait Store: CatalogStore + CartStore + OrderStore + UserStore {}

impl<T: CatalogStore + CartStore + OrderStore + UserStore> Store for T {}

/// The write side of one checkout.
#[async_trait]
pub trait CheckoutTx: Send {
  /// Locks the cart row, then its lines, and returns the lines as they are now.
  async fn lock_cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>>;
  /// Locks the rows of `product_ids` for update, in id order, and returns the ones that exist.
  async fn lock_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>>;
  async fn insert_order(&mut self, order: &Order) -> Result<()>;
  async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()>;
  /// `quantity = quantity - n` guarded by `quantity >= n`; `false` when the guard failed.
  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool>;
  async fn set_order_total(&mut self, order_id: Uuid, total: Decimal) -> Result<()>;
  async fn delete_cart_items(&mut self, cart_id: Uuid, item_ids: &[Uuid]) -> Result<u64>;
  async fn commit(self: Box<Self>) -> Result<()>;
}
