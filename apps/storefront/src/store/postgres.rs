// apps/storefront/src/store/postgres.rs

use super::{CartStore, CatalogStore, CheckoutTx, OrderStore, UserStore};
use crate::errors::{AppError, Result};
use crate::models::user::first_free_username;
use crate::models::{
  Brand, Cart, CartItem, Category, NewCategory, NewProduct, NewProductImage, NewUser, Order, OrderItem, Product,
  ProductFilter, ProductImage, User, MAX_LINE_QUANTITY,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use tracing::{debug, instrument};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
  "id, name, price, description, is_active, sku, quantity, category_id, brand_id, created_at, updated_at";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, unit_price, total_item_price, added_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total_amount, shipping_address, delivery_method, created_at";
const USER_COLUMNS: &str =
  "id, email, username, first_name, last_name, password_hash, is_active, is_staff, date_joined";

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Maps constraint violations to client errors; everything else stays a database error.
fn constraint_err(what: &'static str) -> impl Fn(sqlx::Error) -> AppError {
  move |e| {
    if e.as_database_error().and_then(|db| db.code()).as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
      return AppError::Validation(format!("{} has a value out of range.", what));
    }
    kind_err(what, e)
  }
}

fn kind_err(what: &str, e: sqlx::Error) -> AppError {
  match e.as_database_error().map(|db| db.kind()) {
    Some(ErrorKind::UniqueViolation) => AppError::Validation(format!("{} with these values already exists.", what)),
    Some(ErrorKind::ForeignKeyViolation) => {
      AppError::Validation(format!("{} references a record that does not exist or is protected.", what))
    }
    Some(ErrorKind::CheckViolation) | Some(ErrorKind::NotNullViolation) => {
      AppError::Validation(format!("{} has invalid values.", what))
    }
    _ => AppError::Sqlx(e),
  }
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE` pattern.
fn like_escape(raw: &str) -> String {
  raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Connects a pool and applies the embedded migrations.
  #[instrument(name = "PgStore::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    debug!("Database migrations applied.");
    Ok(Self { pool })
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  async fn list_brands(&self) -> Result<Vec<Brand>> {
    Ok(sqlx::query_as::<_, Brand>("SELECT id, name FROM brands ORDER BY name").fetch_all(&self.pool).await?)
  }

  async fn get_brand(&self, id: Uuid) -> Result<Option<Brand>> {
    Ok(
      sqlx::query_as::<_, Brand>("SELECT id, name FROM brands WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_brand(&self, name: &str) -> Result<Brand> {
    sqlx::query_as::<_, Brand>("INSERT INTO brands (id, name) VALUES ($1, $2) RETURNING id, name")
      .bind(Uuid::new_v4())
      .bind(name)
      .fetch_one(&self.pool)
      .await
      .map_err(constraint_err("Brand"))
  }

  async fn update_brand(&self, id: Uuid, name: &str) -> Result<Option<Brand>> {
    sqlx::query_as::<_, Brand>("UPDATE brands SET name = $2 WHERE id = $1 RETURNING id, name")
      .bind(id)
      .bind(name)
      .fetch_optional(&self.pool)
      .await
      .map_err(constraint_err("Brand"))
  }

  async fn delete_brand(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM brands WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(constraint_err("Brand"))?;
    Ok(done.rows_affected() > 0)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_category(&self, input: &NewCategory) -> Result<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug")
      .bind(Uuid::new_v4())
      .bind(&input.name)
      .bind(&input.slug)
      .fetch_one(&self.pool)
      .await
      .map_err(constraint_err("Category"))
  }

  async fn update_category(&self, id: Uuid, input: &NewCategory) -> Result<Option<Category>> {
    sqlx::query_as::<_, Category>("UPDATE categories SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug")
      .bind(id)
      .bind(&input.name)
      .bind(&input.slug)
      .fetch_optional(&self.pool)
      .await
      .map_err(constraint_err("Category"))
  }

  async fn delete_category(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM categories WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(constraint_err("Category"))?;
    Ok(done.rows_affected() > 0)
  }

  #[instrument(name = "PgStore::list_products", skip(self), err(Display))]
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products WHERE TRUE", PRODUCT_COLUMNS));
    if !filter.include_inactive {
      qb.push(" AND is_active");
    }
    if let Some(category_id) = filter.category {
      qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(brand_id) = filter.brand {
      qb.push(" AND brand_id = ").push_bind(brand_id);
    }
    if let Some(sku) = &filter.sku {
      qb.push(" AND LOWER(sku) = LOWER(").push_bind(sku.clone()).push(")");
    }
    if let Some(min) = filter.price_min {
      qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = filter.price_max {
      qb.push(" AND price <= ").push_bind(max);
    }
    qb.push(" ORDER BY created_at, id");
    Ok(qb.build_query_as::<Product>().fetch_all(&self.pool).await?)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_product(&self, input: &NewProduct) -> Result<Product> {
    sqlx::query_as::<_, Product>(&format!(
      "INSERT INTO products (id, name, price, description, is_active, sku, quantity, category_id, brand_id) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.price)
    .bind(&input.description)
    .bind(input.is_active)
    .bind(&input.sku)
    .bind(input.quantity)
    .bind(input.category_id)
    .bind(input.brand_id)
    .fetch_one(&self.pool)
    .await
    .map_err(constraint_err("Product"))
  }

  async fn update_product(&self, id: Uuid, input: &NewProduct) -> Result<Option<Product>> {
    sqlx::query_as::<_, Product>(&format!(
      "UPDATE products SET name = $2, price = $3, description = $4, is_active = $5, sku = $6, quantity = $7, \
       category_id = $8, brand_id = $9, updated_at = NOW() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id)
    .bind(&input.name)
    .bind(input.price)
    .bind(&input.description)
    .bind(input.is_active)
    .bind(&input.sku)
    .bind(input.quantity)
    .bind(input.category_id)
    .bind(input.brand_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(constraint_err("Product"))
  }

  #[instrument(name = "PgStore::delete_product", skip(self), err(Display))]
  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let ordered: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM order_items WHERE product_id = $1)")
      .bind(id)
      .fetch_one(&self.pool)
      .await?;
    if ordered {
      return Err(AppError::Validation(
        "Product is referenced by existing orders and cannot be deleted.".to_string(),
      ));
    }
    let done = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(constraint_err("Product"))?;
    Ok(done.rows_affected() > 0)
  }

  async fn list_images(&self, product_id: Option<Uuid>) -> Result<Vec<ProductImage>> {
    Ok(
      sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, image, name FROM product_images WHERE ($1::uuid IS NULL OR product_id = $1) ORDER BY id",
      )
      .bind(product_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn images_for_products(&self, product_ids: &[Uuid]) -> Result<Vec<ProductImage>> {
    Ok(
      sqlx::query_as::<_, ProductImage>(
        "SELECT id, product_id, image, name FROM product_images WHERE product_id = ANY($1) ORDER BY id",
      )
      .bind(product_ids)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn get_image(&self, id: Uuid) -> Result<Option<ProductImage>> {
    Ok(
      sqlx::query_as::<_, ProductImage>("SELECT id, product_id, image, name FROM product_images WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_image(&self, input: &NewProductImage) -> Result<ProductImage> {
    sqlx::query_as::<_, ProductImage>(
      "INSERT INTO product_images (id, product_id, image, name) VALUES ($1, $2, $3, $4) \
       RETURNING id, product_id, image, name",
    )
    .bind(Uuid::new_v4())
    .bind(input.product_id)
    .bind(&input.image)
    .bind(&input.name)
    .fetch_one(&self.pool)
    .await
    .map_err(constraint_err("Product image"))
  }

  async fn update_image(&self, id: Uuid, input: &NewProductImage) -> Result<Option<ProductImage>> {
    sqlx::query_as::<_, ProductImage>(
      "UPDATE product_images SET product_id = $2, image = $3, name = $4 WHERE id = $1 \
       RETURNING id, product_id, image, name",
    )
    .bind(id)
    .bind(input.product_id)
    .bind(&input.image)
    .bind(&input.name)
    .fetch_optional(&self.pool)
    .await
    .map_err(constraint_err("Product image"))
  }

  async fn delete_image(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM product_images WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }
}

#[async_trait]
impl CartStore for PgStore {
  async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>> {
    Ok(
      sqlx::query_as::<_, Cart>("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn get_or_create_cart(&self, user_id: Uuid) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
      .bind(Uuid::new_v4())
      .bind(user_id)
      .execute(&self.pool)
      .await
      .map_err(constraint_err("Cart"))?;
    Ok(
      sqlx::query_as::<_, Cart>("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn list_cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
    Ok(
      sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {} FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id",
        CART_ITEM_COLUMNS
      ))
      .bind(cart_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn get_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
    Ok(
      sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {} FROM cart_items WHERE id = $1 AND cart_id = $2",
        CART_ITEM_COLUMNS
      ))
      .bind(item_id)
      .bind(cart_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgStore::upsert_cart_item", skip(self, product), fields(product_id = %product.id), err(Display))]
  async fn upsert_cart_item(&self, cart_id: Uuid, product: &Product, quantity: i32) -> Result<CartItem> {
    let line = CartItem::priced(Uuid::new_v4(), cart_id, product.id, quantity, product.price)?;
    let merged = sqlx::query_as::<_, CartItem>(&format!(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity, unit_price, total_item_price) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (cart_id, product_id) DO UPDATE SET \
         quantity = cart_items.quantity + EXCLUDED.quantity, \
         unit_price = EXCLUDED.unit_price, \
         total_item_price = EXCLUDED.unit_price * (cart_items.quantity + EXCLUDED.quantity) \
       WHERE cart_items.quantity + EXCLUDED.quantity <= $7 \
       RETURNING {}",
      CART_ITEM_COLUMNS
    ))
    .bind(line.id)
    .bind(line.cart_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.total_item_price)
    .bind(MAX_LINE_QUANTITY)
    .fetch_optional(&self.pool)
    .await
    .map_err(constraint_err("Cart item"))?;
    merged.ok_or_else(|| {
      AppError::field(
        "quantity",
        format!("Ensure this value is less than or equal to {}.", MAX_LINE_QUANTITY),
      )
    })
  }

  async fn update_cart_item(
    &self,
    cart_id: Uuid,
    item_id: Uuid,
    product: &Product,
    quantity: i32,
  ) -> Result<Option<CartItem>> {
    let line = CartItem::priced(item_id, cart_id, product.id, quantity, product.price)?;
    sqlx::query_as::<_, CartItem>(&format!(
      "UPDATE cart_items SET product_id = $3, quantity = $4, unit_price = $5, total_item_price = $6 \
       WHERE id = $1 AND cart_id = $2 RETURNING {}",
      CART_ITEM_COLUMNS
    ))
    .bind(line.id)
    .bind(line.cart_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.total_item_price)
    .fetch_optional(&self.pool)
    .await
    .map_err(constraint_err("Cart item"))
  }

  async fn delete_cart_item(&self, cart_id: Uuid, item_id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
      .bind(item_id)
      .bind(cart_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  async fn list_orders(&self, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id",
        ORDER_COLUMNS
      ))
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<Option<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(&format!(
        "SELECT {} FROM orders WHERE id = $1 AND user_id = $2",
        ORDER_COLUMNS
      ))
      .bind(order_id)
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn order_items(&self, order_ids: &[Uuid]) -> Result<Vec<OrderItem>> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, quantity, unit_price, subtotal FROM order_items \
         WHERE order_id = ANY($1) ORDER BY order_id, product_id",
      )
      .bind(order_ids)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "PgStore::begin_checkout", skip(self), err(Display))]
  async fn begin_checkout(&self) -> Result<Box<dyn CheckoutTx>> {
    let tx = self.pool.begin().await?;
    Ok(Box::new(PgCheckoutTx { tx }))
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = LOWER($1)", USER_COLUMNS))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::create_user", skip(self, input), fields(email = %input.email), err(Display))]
  async fn create_user(&self, input: &NewUser) -> Result<User> {
    let base = input.base_username();
    let taken: HashSet<String> =
      sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE username = $1 OR username LIKE $2")
        .bind(&base)
        .bind(format!("{}\\_%", like_escape(&base)))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();
    let username = first_free_username(&base, |candidate| taken.contains(candidate));

    sqlx::query_as::<_, User>(&format!(
      "INSERT INTO users (id, email, username, first_name, last_name, password_hash, is_active, is_staff) \
       VALUES ($1, LOWER($2), $3, $4, $5, $6, $7, $8) RETURNING {}",
      USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.email)
    .bind(username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.password_hash)
    .bind(input.is_active)
    .bind(input.is_staff)
    .fetch_one(&self.pool)
    .await
    .map_err(constraint_err("User"))
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
    Ok(done.rows_affected() > 0)
  }

  async fn activate_user(&self, id: Uuid) -> Result<bool> {
    let done = sqlx::query("UPDATE users SET is_active = TRUE WHERE id = $1 AND NOT is_active")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }

  #[instrument(name = "PgStore::purge_inactive_users", skip(self), err(Display))]
  async fn purge_inactive_users(&self, joined_before: DateTime<Utc>) -> Result<u64> {
    let done = sqlx::query("DELETE FROM users WHERE NOT is_active AND date_joined < $1")
      .bind(joined_before)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected())
  }

  async fn wishlist(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
    Ok(
      sqlx::query_scalar::<_, Uuid>("SELECT product_id FROM wishlist_items WHERE user_id = $1 ORDER BY added_at")
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let done = sqlx::query("INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
      .bind(user_id)
      .bind(product_id)
      .execute(&self.pool)
      .await
      .map_err(constraint_err("Wishlist entry"))?;
    Ok(done.rows_affected() > 0)
  }

  async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let done = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected() > 0)
  }
}

/// A checkout inside one Postgres transaction; dropping it rolls back.
pub struct PgCheckoutTx {
  tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
  async fn lock_cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>> {
    sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
      .bind(cart_id)
      .fetch_optional(&mut *self.tx)
      .await?;
    Ok(
      sqlx::query_as::<_, CartItem>(&format!(
        "SELECT {} FROM cart_items WHERE cart_id = $1 ORDER BY added_at, id FOR UPDATE",
        CART_ITEM_COLUMNS
      ))
      .bind(cart_id)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn lock_products(&mut self, product_ids: &[Uuid]) -> Result<Vec<Product>> {
    Ok(
      sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        PRODUCT_COLUMNS
      ))
      .bind(product_ids)
      .fetch_all(&mut *self.tx)
      .await?,
    )
  }

  async fn insert_order(&mut self, order: &Order) -> Result<()> {
    sqlx::query(
      "INSERT INTO orders (id, user_id, status, total_amount, shipping_address, delivery_method, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.status)
    .bind(order.total_amount)
    .bind(&order.shipping_address)
    .bind(order.delivery_method)
    .bind(order.created_at)
    .execute(&mut *self.tx)
    .await
    .map_err(constraint_err("Order"))?;
    Ok(())
  }

  async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
    sqlx::query(
      "INSERT INTO order_items (id, order_id, product_id, quantity, unit_price, subtotal) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.subtotal)
    .execute(&mut *self.tx)
    .await
    .map_err(constraint_err("Order item"))?;
    Ok(())
  }

  async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> Result<bool> {
    let done = sqlx::query(
      "UPDATE products SET quantity = quantity - $1, updated_at = NOW() WHERE id = $2 AND quantity >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&mut *self.tx)
    .await?;
    Ok(done.rows_affected() == 1)
  }

  async fn set_order_total(&mut self, order_id: Uuid, total: Decimal) -> Result<()> {
    sqlx::query("UPDATE orders SET total_amount = $2 WHERE id = $1")
      .bind(order_id)
      .bind(total)
      .execute(&mut *self.tx)
      .await?;
    Ok(())
  }

  async fn delete_cart_items(&mut self, cart_id: Uuid, item_ids: &[Uuid]) -> Result<u64> {
    let done = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = ANY($2)")
      .bind(cart_id)
      .bind(item_ids)
      .execute(&mut *self.tx)
      .await?;
    Ok(done.rows_affected())
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    self.tx.commit().await?;
    Ok(())
  }
}
