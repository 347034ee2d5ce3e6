// apps/storefront/tests/catalog_tests.rs

#[macro_use]
mod common;

use actix_web::test;
use common::TestApp;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shopflow::ContextData;
use storefront::pipelines::contexts::{CheckoutCtxData, CheckoutSource, RequestedLine};
use storefront::store::CatalogStore;

fn dec(s: &str) -> Decimal {
  s.parse().unwrap()
}

#[actix_web::test]
async fn only_staff_may_write_to_the_catalog() {
  let app = TestApp::new();
  let shopper = app.active_user("shopper@example.com").await;
  let staff = app.staff_user("staff@example.com").await;
  let service = test_service!(app.state);

  let anon = test::TestRequest::post().uri("/api/v1/brands").set_json(json!({"name": "Nordic"})).to_request();
  assert_eq!(test::call_service(&service, anon).await.status(), 401);

  let shopper_req = test::TestRequest::post()
    .uri("/api/v1/brands")
    .insert_header(app.bearer(&shopper))
    .set_json(json!({"name": "Nordic"}))
    .to_request();
  assert_eq!(test::call_service(&service, shopper_req).await.status(), 403);

  let staff_req = test::TestRequest::post()
    .uri("/api/v1/brands")
    .insert_header(app.bearer(&staff))
    .set_json(json!({"name": "  Nordic "}))
    .to_request();
  let resp = test::call_service(&service, staff_req).await;
  assert_eq!(resp.status(), 201);
  let brand: Value = test::read_body_json(resp).await;
  assert_eq!(brand["name"], "Nordic");

  let listed = test::call_service(&service, test::TestRequest::get().uri("/api/v1/brands").to_request()).await;
  assert_eq!(listed.status(), 200);
  let brands: Value = test::read_body_json(listed).await;
  assert_eq!(brands.as_array().unwrap().len(), 1);

  let delete = test::TestRequest::delete()
    .uri(&format!("/api/v1/brands/{}", brand["id"].as_str().unwrap()))
    .insert_header(app.bearer(&staff))
    .to_request();
  assert_eq!(test::call_service(&service, delete).await.status(), 204);
}

#[actix_web::test]
async fn category_slug_is_derived_and_blank_names_rejected() {
  let app = TestApp::new();
  let staff = app.staff_user("staff@example.com").await;
  let service = test_service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/categories")
    .insert_header(app.bearer(&staff))
    .set_json(json!({"name": "Garden Tools"}))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 201);
  let category: Value = test::read_body_json(resp).await;
  assert_eq!(category["slug"], "garden-tools");

  let blank = test::TestRequest::post()
    .uri("/api/v1/categories")
    .insert_header(app.bearer(&staff))
    .set_json(json!({"name": "   "}))
    .to_request();
  let resp = test::call_service(&service, blank).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["name"].is_array());
}

#[actix_web::test]
async fn inactive_products_are_visible_to_staff_only() {
  let app = TestApp::new();
  let staff = app.staff_user("staff@example.com").await;
  let shopper = app.active_user("shopper@example.com").await;
  let visible = app.product("VIS-1", dec("10.00"), 3).await;
  let hidden = app.product("HID-1", dec("12.00"), 3).await;
  let mut retire = storefront::models::NewProduct {
    name: hidden.name.clone(),
    price: hidden.price,
    description: String::new(),
    is_active: true,
    sku: hidden.sku.clone(),
    quantity: hidden.quantity,
    category_id: hidden.category_id,
    brand_id: hidden.brand_id,
  };
  retire.is_active = false;
  app.store.update_product(hidden.id, &retire).await.unwrap();
  let service = test_service!(app.state);

  let public = test::call_service(&service, test::TestRequest::get().uri("/api/v1/products").to_request()).await;
  let body: Value = test::read_body_json(public).await;
  let ids: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["id"].as_str().unwrap()).collect();
  assert_eq!(ids, vec![visible.id.to_string().as_str()]);

  let as_shopper = test::TestRequest::get()
    .uri(&format!("/api/v1/products/{}", hidden.id))
    .insert_header(app.bearer(&shopper))
    .to_request();
  assert_eq!(test::call_service(&service, as_shopper).await.status(), 404);

  let as_staff = test::TestRequest::get()
    .uri(&format!("/api/v1/products/{}", hidden.id))
    .insert_header(app.bearer(&staff))
    .to_request();
  let resp = test::call_service(&service, as_staff).await;
  assert_eq!(resp.status(), 200);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["is_active"], false);
  assert_eq!(body["brand"]["name"], "Acme");
}

#[actix_web::test]
async fn product_listing_filters_by_sku_and_price_range() {
  let app = TestApp::new();
  app.product("LAMP-A", dec("9.99"), 1).await;
  app.product("LAMP-B", dec("25.00"), 1).await;
  app.product("DESK-A", dec("150.00"), 1).await;
  let service = test_service!(app.state);

  let by_sku = test::TestRequest::get().uri("/api/v1/products?sku=lamp-b").to_request();
  let body: Value = test::read_body_json(test::call_service(&service, by_sku).await).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["sku"], "LAMP-B");

  let by_price = test::TestRequest::get().uri("/api/v1/products?price_min=9.99&price_max=25.00").to_request();
  let body: Value = test::read_body_json(test::call_service(&service, by_price).await).await;
  let mut skus: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["sku"].as_str().unwrap()).collect();
  skus.sort();
  assert_eq!(skus, vec!["LAMP-A", "LAMP-B"]);
}

#[actix_web::test]
async fn product_validation_collects_field_errors() {
  let app = TestApp::new();
  let staff = app.staff_user("staff@example.com").await;
  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/products")
    .insert_header(app.bearer(&staff))
    .set_json(json!({
      "name": "",
      "price": "-1.00",
      "sku": "X-1",
      "quantity": -2,
      "category_id": uuid::Uuid::new_v4(),
      "brand_id": uuid::Uuid::new_v4(),
    }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  for field in ["name", "price", "quantity", "category_id", "brand_id"] {
    assert!(body["fields"][field].is_array(), "missing error for {}", field);
  }
}

#[actix_web::test]
async fn ordered_products_cannot_be_deleted() {
  let app = TestApp::new();
  let staff = app.staff_user("staff@example.com").await;
  let buyer = app.active_user("buyer@example.com").await;
  let sold = app.product("SOLD-1", dec("3.00"), 5).await;
  let unsold = app.product("FREE-1", dec("3.00"), 5).await;
  let ctx = ContextData::new(CheckoutCtxData::new(
    app.state.clone(),
    buyer,
    CheckoutSource::Direct(vec![RequestedLine { product_id: sold.id, quantity: 1 }]),
    "1 Main St".to_string(),
    "pickup".to_string(),
  ));
  app.state.flows.run(ctx).await.unwrap();
  let service = test_service!(app.state);

  let refused = test::TestRequest::delete()
    .uri(&format!("/api/v1/products/{}", sold.id))
    .insert_header(app.bearer(&staff))
    .to_request();
  assert_eq!(test::call_service(&service, refused).await.status(), 400);
  assert!(app.store.get_product(sold.id).await.unwrap().is_some());

  let allowed = test::TestRequest::delete()
    .uri(&format!("/api/v1/products/{}", unsold.id))
    .insert_header(app.bearer(&staff))
    .to_request();
  assert_eq!(test::call_service(&service, allowed).await.status(), 204);
  assert!(app.store.get_product(unsold.id).await.unwrap().is_none());
}

#[actix_web::test]
async fn wishlist_add_is_idempotent_and_remove_reports_absence() {
  let app = TestApp::new();
  let user = app.active_user("wish@example.com").await;
  let product = app.product("WISH-1", dec("1.00"), 1).await;
  let service = test_service!(app.state);

  let add = || {
    test::TestRequest::post()
      .uri("/api/v1/wishlist")
      .insert_header(app.bearer(&user))
      .set_json(json!({"product_id": product.id}))
      .to_request()
  };
  assert_eq!(test::call_service(&service, add()).await.status(), 201);
  assert_eq!(test::call_service(&service, add()).await.status(), 200);

  let list = test::TestRequest::get().uri("/api/v1/wishlist").insert_header(app.bearer(&user)).to_request();
  let body: Value = test::read_body_json(test::call_service(&service, list).await).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["sku"], "WISH-1");

  let unknown = test::TestRequest::post()
    .uri("/api/v1/wishlist")
    .insert_header(app.bearer(&user))
    .set_json(json!({"product_id": uuid::Uuid::new_v4()}))
    .to_request();
  assert_eq!(test::call_service(&service, unknown).await.status(), 400);

  let remove = || {
    test::TestRequest::delete()
      .uri(&format!("/api/v1/wishlist/{}", product.id))
      .insert_header(app.bearer(&user))
      .to_request()
  };
  assert_eq!(test::call_service(&service, remove()).await.status(), 204);
  assert_eq!(test::call_service(&service, remove()).await.status(), 404);
}

#[actix_web::test]
async fn health_check_answers_without_auth() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let resp = test::call_service(&service, test::TestRequest::get().uri("/health").to_request()).await;
  assert_eq!(resp.status(), 200);
}
