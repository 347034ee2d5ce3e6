// apps/storefront/src/services/views.rs

//! Assembles the nested JSON views (products with category, brand and
//! images; carts; orders) from flat store rows.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Brand, Cart, CartItem, CartItemView, CartView, Category, Order, OrderItemView, OrderView, Product, ProductImage,
  ProductView,
};
use crate::store::Store;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub async fn product_views(store: &dyn Store, products: Vec<Product>) -> AppResult<Vec<ProductView>> {
  if products.is_empty() {
    return Ok(Vec::new());
  }
  let categories: HashMap<Uuid, Category> =
    store.list_categories().await?.into_iter().map(|c| (c.id, c)).collect();
  let brands: HashMap<Uuid, Brand> = store.list_brands().await?.into_iter().map(|b| (b.id, b)).collect();
  let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
  let mut images: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
  for image in store.images_for_products(&ids).await? {
    images.entry(image.product_id).or_default().push(image);
  }

  Ok(
    products
      .into_iter()
      .map(|p| {
        let category = categories.get(&p.category_id).cloned();
        let brand = brands.get(&p.brand_id).cloned();
        let imgs = images.remove(&p.id).unwrap_or_default();
        ProductView::new(p, category, brand, imgs)
      })
      .collect(),
  )
}

pub async fn product_view(store: &dyn Store, product: Product) -> AppResult<ProductView> {
  product_views(store, vec![product])
    .await?
    .into_iter()
    .next()
    .ok_or_else(|| AppError::Internal("Product view could not be built".to_string()))
}

/// Views of `items`; lines whose product vanished are left out.
pub async fn cart_item_views(store: &dyn Store, items: Vec<CartItem>) -> AppResult<Vec<CartItemView>> {
  let mut products = Vec::with_capacity(items.len());
  for item in &items {
    if let Some(p) = store.get_product(item.product_id).await? {
      products.push(p);
    }
  }
  let by_id: HashMap<Uuid, ProductView> =
    product_views(store, products).await?.into_iter().map(|v| (v.id, v)).collect();
  Ok(
    items
      .into_iter()
      .filter_map(|item| {
        let product = by_id.get(&item.product_id).cloned()?;
        Some(CartItemView::new(item, product))
      })
      .collect(),
  )
}

pub async fn cart_view(store: &dyn Store, cart: Cart) -> AppResult<CartView> {
  let items = store.list_cart_items(cart.id).await?;
  Ok(CartView {
    id: cart.id,
    user: cart.user_id,
    items: cart_item_views(store, items).await?,
  })
}

pub async fn order_views(store: &dyn Store, orders: Vec<Order>) -> AppResult<Vec<OrderView>> {
  let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
  let items = store.order_items(&order_ids).await?;

  let mut products = Vec::new();
  let mut seen = HashSet::new();
  for item in &items {
    if seen.insert(item.product_id) {
      if let Some(p) = store.get_product(item.product_id).await? {
        products.push(p);
      }
    }
  }
  let product_views: HashMap<Uuid, ProductView> =
    product_views(store, products).await?.into_iter().map(|v| (v.id, v)).collect();

  let mut per_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
  for item in items {
    let product = product_views.get(&item.product_id).cloned();
    per_order.entry(item.order_id).or_default().push(OrderItemView::new(item, product));
  }

  Ok(
    orders
      .into_iter()
      .map(|o| {
        let items = per_order.remove(&o.id).unwrap_or_default();
        OrderView::new(o, items)
      })
      .collect(),
  )
}
