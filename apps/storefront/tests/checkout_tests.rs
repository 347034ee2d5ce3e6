// apps/storefront/tests/checkout_tests.rs

#[macro_use]
mod common;

use actix_web::test;
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shopflow::{ContextData, PipelineResult};
use storefront::errors::{AppError, ShortageReason};
use storefront::models::{max_price, User, MAX_LINE_QUANTITY};
use storefront::pipelines::contexts::{CheckoutCtxData, CheckoutSource, RequestedLine};
use storefront::store::{CartStore, CatalogStore, OrderStore};

fn dec(s: &str) -> Decimal {
  s.parse().unwrap()
}

async fn checkout_from_cart(app: &TestApp, user: &User) -> Result<PipelineResult, AppError> {
  let ctx = ContextData::new(CheckoutCtxData::new(
    app.state.clone(),
    user.clone(),
    CheckoutSource::Cart,
    "1 Main St".to_string(),
    "courier".to_string(),
  ));
  app.state.flows.run(ctx).await
}

#[actix_web::test]
async fn checkout_from_cart_creates_order_and_decrements_stock() {
  let app = TestApp::new();
  let user = app.active_user("buyer@example.com").await;
  let lamp = app.product("LMP-1", dec("19.99"), 5).await;
  let chair = app.product("CHR-1", dec("120.50"), 2).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &lamp, 2).await.unwrap();
  app.store.upsert_cart_item(cart.id, &lamp, 1).await.unwrap();
  app.store.upsert_cart_item(cart.id, &chair, 2).await.unwrap();

  let service = test_service!(app.state);
  let (name, value) = app.bearer(&user);
  let req = test::TestRequest::post()
    .uri("/api/v1/orders/from-cart")
    .insert_header((name, value))
    .set_json(json!({"shipping_address": "1 Main St", "delivery_method": "courier"}))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 201);
  let body: Value = test::read_body_json(resp).await;

  assert_eq!(body["status"], "new");
  assert_eq!(body["delivery_method"], "courier");
  assert_eq!(body["items"].as_array().unwrap().len(), 2);
  // 3 * 19.99 + 2 * 120.50
  assert_eq!(dec(body["total_amount"].as_str().unwrap()), dec("300.97"));

  assert_eq!(app.store.get_product(lamp.id).await.unwrap().unwrap().quantity, 2);
  assert_eq!(app.store.get_product(chair.id).await.unwrap().unwrap().quantity, 0);
  assert!(app.store.list_cart_items(cart.id).await.unwrap().is_empty());

  let orders = app.store.list_orders(user.id).await.unwrap();
  assert_eq!(orders.len(), 1);
  let items = app.store.order_items(&[orders[0].id]).await.unwrap();
  let sum: Decimal = items.iter().map(|i| i.subtotal).sum();
  assert_eq!(sum, orders[0].total_amount);

  let confirmations = app.mailer.sent_to("buyer@example.com");
  assert_eq!(confirmations.len(), 1);
  assert!(confirmations[0].subject.contains(&orders[0].id.to_string()));
}

#[actix_web::test]
async fn empty_cart_is_rejected_without_creating_an_order() {
  let app = TestApp::new();
  let user = app.active_user("empty@example.com").await;

  let err = checkout_from_cart(&app, &user).await.unwrap_err();
  assert!(matches!(err, AppError::EmptyCart));

  app.store.get_or_create_cart(user.id).await.unwrap();
  let err = checkout_from_cart(&app, &user).await.unwrap_err();
  assert!(matches!(err, AppError::EmptyCart));
  assert!(app.store.list_orders(user.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn shortages_are_all_reported_and_nothing_changes() {
  let app = TestApp::new();
  let user = app.active_user("short@example.com").await;
  let plenty = app.product("OK-1", dec("5.00"), 10).await;
  let scarce = app.product("LOW-1", dec("5.00"), 1).await;
  let retired = app.product("OLD-1", dec("5.00"), 10).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &plenty, 2).await.unwrap();
  app.store.upsert_cart_item(cart.id, &scarce, 3).await.unwrap();
  app.store.upsert_cart_item(cart.id, &retired, 1).await.unwrap();
  app
    .store
    .update_product(
      retired.id,
      &storefront::models::NewProduct {
        name: retired.name.clone(),
        price: retired.price,
        description: String::new(),
        is_active: false,
        sku: retired.sku.clone(),
        quantity: retired.quantity,
        category_id: retired.category_id,
        brand_id: retired.brand_id,
      },
    )
    .await
    .unwrap();

  let err = checkout_from_cart(&app, &user).await.unwrap_err();
  let AppError::StockConflict(shortages) = err else {
    panic!("expected a stock conflict, got {:?}", err);
  };
  assert_eq!(shortages.len(), 2);
  let low = shortages.iter().find(|s| s.product_id == scarce.id).unwrap();
  assert_eq!((low.available, low.requested, low.reason), (1, 3, ShortageReason::InsufficientStock));
  assert_eq!(low.sku.as_deref(), Some("LOW-1"));
  let old = shortages.iter().find(|s| s.product_id == retired.id).unwrap();
  assert_eq!(old.reason, ShortageReason::Inactive);

  assert_eq!(app.store.get_product(plenty.id).await.unwrap().unwrap().quantity, 10);
  assert_eq!(app.store.get_product(scarce.id).await.unwrap().unwrap().quantity, 1);
  assert_eq!(app.store.list_cart_items(cart.id).await.unwrap().len(), 3);
  assert!(app.store.list_orders(user.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn stock_conflict_response_carries_structured_detail() {
  let app = TestApp::new();
  let user = app.active_user("detail@example.com").await;
  let scarce = app.product("LOW-2", dec("5.00"), 1).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &scarce, 2).await.unwrap();

  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/orders/from-cart")
    .insert_header(app.bearer(&user))
    .set_json(json!({"shipping_address": "1 Main St", "delivery_method": "post"}))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Insufficient stock");
  assert_eq!(body["shortages"][0]["available"], 1);
  assert_eq!(body["shortages"][0]["requested"], 2);
  assert_eq!(body["shortages"][0]["reason"], "insufficient_stock");
}

#[actix_web::test]
async fn invalid_checkout_input_reports_fields() {
  let app = TestApp::new();
  let user = app.active_user("fields@example.com").await;
  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/orders/from-cart")
    .insert_header(app.bearer(&user))
    .set_json(json!({"shipping_address": "  ", "delivery_method": "drone"}))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["shipping_address"].is_array());
  assert!(body["fields"]["delivery_method"].is_array());
}

#[actix_web::test]
async fn direct_order_aggregates_lines_and_leaves_cart_alone() {
  let app = TestApp::new();
  let user = app.active_user("direct@example.com").await;
  let lamp = app.product("LMP-9", dec("10.00"), 4).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &lamp, 1).await.unwrap();

  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .insert_header(app.bearer(&user))
    .set_json(json!({
      "shipping_address": "2 Side St",
      "delivery_method": "pickup",
      "items": [
        {"product_id": lamp.id, "quantity": 1},
        {"product_id": lamp.id, "quantity": 2}
      ]
    }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 201);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["items"].as_array().unwrap().len(), 1);
  assert_eq!(body["items"][0]["quantity"], 3);
  assert_eq!(dec(body["total_amount"].as_str().unwrap()), dec("30.00"));

  assert_eq!(app.store.get_product(lamp.id).await.unwrap().unwrap().quantity, 1);
  assert_eq!(app.store.list_cart_items(cart.id).await.unwrap().len(), 1);

  let over = test::TestRequest::post()
    .uri("/api/v1/orders")
    .insert_header(app.bearer(&user))
    .set_json(json!({
      "shipping_address": "2 Side St",
      "delivery_method": "pickup",
      "items": [{"product_id": lamp.id, "quantity": 1}, {"product_id": lamp.id, "quantity": 1}]
    }))
    .to_request();
  let resp = test::call_service(&service, over).await;
  assert_eq!(resp.status(), 400);
  assert_eq!(app.store.get_product(lamp.id).await.unwrap().unwrap().quantity, 1);
}

#[actix_web::test]
async fn concurrent_checkouts_never_oversell() {
  let app = TestApp::new();
  let product = app.product("HOT-1", dec("9.99"), 5).await;
  let alice = app.active_user("alice@example.com").await;
  let bob = app.active_user("bob@example.com").await;
  for user in [&alice, &bob] {
    let cart = app.store.get_or_create_cart(user.id).await.unwrap();
    app.store.upsert_cart_item(cart.id, &product, 3).await.unwrap();
  }

  let (a, b) = tokio::join!(checkout_from_cart(&app, &alice), checkout_from_cart(&app, &bob));
  let outcomes = [a, b];
  let succeeded = outcomes.iter().filter(|r| matches!(r, Ok(PipelineResult::Completed))).count();
  let rejected = outcomes.iter().filter(|r| matches!(r, Err(AppError::StockConflict(_)))).count();
  assert_eq!((succeeded, rejected), (1, 1));

  assert_eq!(app.store.get_product(product.id).await.unwrap().unwrap().quantity, 2);
  let ordered: i32 = {
    let mut total = 0;
    for user in [&alice, &bob] {
      let orders = app.store.list_orders(user.id).await.unwrap();
      let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
      total += app.store.order_items(&ids).await.unwrap().iter().map(|i| i.quantity).sum::<i32>();
    }
    total
  };
  assert_eq!(ordered, 5 - 2);
}

#[actix_web::test]
async fn direct_lines_for_unknown_products_are_reported_missing() {
  let app = TestApp::new();
  let user = app.active_user("ghost@example.com").await;
  let ghost = uuid::Uuid::new_v4();
  let ctx = ContextData::new(CheckoutCtxData::new(
    app.state.clone(),
    user,
    CheckoutSource::Direct(vec![RequestedLine { product_id: ghost, quantity: 1 }]),
    "1 Main St".to_string(),
    "post".to_string(),
  ));
  let err = app.state.flows.run(ctx).await.unwrap_err();
  let AppError::StockConflict(shortages) = err else {
    panic!("expected a stock conflict");
  };
  assert_eq!(shortages[0].reason, ShortageReason::Missing);
  assert_eq!(shortages[0].sku, None);
}

#[actix_web::test]
async fn overflowing_direct_quantities_are_rejected_and_stock_is_untouched() {
  let app = TestApp::new();
  let user = app.active_user("overflow@example.com").await;
  let lamp = app.product("BIG-1", dec("1.00"), 5).await;
  let service = test_service!(app.state);

  for items in [
    json!([{"product_id": lamp.id, "quantity": i32::MAX}, {"product_id": lamp.id, "quantity": i32::MAX}]),
    json!([{"product_id": lamp.id, "quantity": MAX_LINE_QUANTITY + 1}]),
    json!([{"product_id": lamp.id, "quantity": MAX_LINE_QUANTITY}, {"product_id": lamp.id, "quantity": 1}]),
  ] {
    let req = test::TestRequest::post()
      .uri("/api/v1/orders")
      .insert_header(app.bearer(&user))
      .set_json(json!({"shipping_address": "1 Main St", "delivery_method": "post", "items": items}))
      .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["fields"]["items"].is_array(), "unexpected body {}", body);
  }

  assert_eq!(app.store.get_product(lamp.id).await.unwrap().unwrap().quantity, 5);
  assert!(app.store.list_orders(user.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn cart_quantities_are_capped_when_adding_merging_and_updating() {
  let app = TestApp::new();
  let user = app.active_user("capped@example.com").await;
  let lamp = app.product("CAP-1", dec("2.00"), 5).await;
  let service = test_service!(app.state);

  let add = |quantity: i32| {
    test::TestRequest::post()
      .uri("/api/v1/cart-items")
      .insert_header(app.bearer(&user))
      .set_json(json!({"product_id": lamp.id, "quantity": quantity}))
      .to_request()
  };
  assert_eq!(test::call_service(&service, add(i32::MAX)).await.status(), 400);
  assert_eq!(test::call_service(&service, add(MAX_LINE_QUANTITY)).await.status(), 201);

  let resp = test::call_service(&service, add(1)).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["quantity"].is_array());

  let cart = app.store.find_cart(user.id).await.unwrap().unwrap();
  let items = app.store.list_cart_items(cart.id).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].quantity, MAX_LINE_QUANTITY);

  let update = test::TestRequest::put()
    .uri(&format!("/api/v1/cart-items/{}", items[0].id))
    .insert_header(app.bearer(&user))
    .set_json(json!({"product_id": lamp.id, "quantity": i32::MAX}))
    .to_request();
  assert_eq!(test::call_service(&service, update).await.status(), 400);
  assert_eq!(app.store.list_cart_items(cart.id).await.unwrap()[0].quantity, MAX_LINE_QUANTITY);
}

#[actix_web::test]
async fn same_cart_submitted_twice_yields_one_order() {
  let app = TestApp::new();
  let user = app.active_user("double@example.com").await;
  let product = app.product("DBL-1", dec("4.00"), 100).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &product, 2).await.unwrap();

  let (a, b) = tokio::join!(checkout_from_cart(&app, &user), checkout_from_cart(&app, &user));
  let outcomes = [a, b];
  let succeeded = outcomes.iter().filter(|r| matches!(r, Ok(PipelineResult::Completed))).count();
  let empty = outcomes.iter().filter(|r| matches!(r, Err(AppError::EmptyCart))).count();
  assert_eq!((succeeded, empty), (1, 1));

  assert_eq!(app.store.get_product(product.id).await.unwrap().unwrap().quantity, 98);
  assert_eq!(app.store.list_orders(user.id).await.unwrap().len(), 1);
  assert!(app.store.list_cart_items(cart.id).await.unwrap().is_empty());
}

#[actix_web::test]
async fn prices_beyond_the_stored_precision_are_rejected() {
  let app = TestApp::new();
  let staff = app.staff_user("pricing@example.com").await;
  let (brand, category) = app.catalog().await;
  let service = test_service!(app.state);

  let create = |price: &str, sku: &str| {
    test::TestRequest::post()
      .uri("/api/v1/products")
      .insert_header(app.bearer(&staff))
      .set_json(json!({
        "name": "Gold Lamp",
        "price": price,
        "sku": sku,
        "quantity": 1,
        "category_id": category.id,
        "brand_id": brand.id,
      }))
      .to_request()
  };

  let resp = test::call_service(&service, create("100000000.00", "GOLD-1")).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["price"].is_array());

  let resp = test::call_service(&service, create("99999999.99", "GOLD-2")).await;
  assert_eq!(resp.status(), 201);
}

#[actix_web::test]
async fn order_lines_too_large_to_store_roll_back() {
  let app = TestApp::new();
  let user = app.active_user("whale@example.com").await;
  let jewel = app.product("JWL-1", max_price(), 500).await;
  let cart = app.store.get_or_create_cart(user.id).await.unwrap();
  app.store.upsert_cart_item(cart.id, &jewel, 200).await.unwrap_err();
  app.store.upsert_cart_item(cart.id, &jewel, 100).await.unwrap();

  // 100 * 99_999_999.99 fits a line; two such lines overflow the order total.
  let second = app.product("JWL-2", max_price(), 500).await;
  app.store.upsert_cart_item(cart.id, &second, 100).await.unwrap();

  let err = checkout_from_cart(&app, &user).await.unwrap_err();
  assert!(matches!(err, AppError::Invalid(ref f) if f.get("items").is_some()), "got {:?}", err);

  assert_eq!(app.store.get_product(jewel.id).await.unwrap().unwrap().quantity, 500);
  assert_eq!(app.store.get_product(second.id).await.unwrap().unwrap().quantity, 500);
  assert_eq!(app.store.list_cart_items(cart.id).await.unwrap().len(), 2);
  assert!(app.store.list_orders(user.id).await.unwrap().is_empty());
}
