// apps/storefront/tests/auth_flow_tests.rs

#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::test;
use chrono::{Duration, Utc};
use common::{TestApp, TEST_PASSWORD};
use serde_json::{json, Value};
use storefront::store::UserStore;

fn register_body(email: &str) -> Value {
  json!({
    "email": email,
    "first_name": "Ada",
    "last_name": "Lovelace",
    "password": TEST_PASSWORD,
    "password2": TEST_PASSWORD,
  })
}

/// Path part of the activation link mailed to `email`.
fn mailed_activation_path(app: &TestApp, email: &str) -> String {
  let mails = app.mailer.sent_to(email);
  let mail = mails.last().expect("activation email was sent");
  let link = mail
    .body
    .lines()
    .find(|l| l.starts_with("http://shop.test/"))
    .expect("body carries the activation link");
  link.trim_start_matches("http://shop.test").to_string()
}

fn cookie_value(resp: &actix_web::dev::ServiceResponse, name: &str) -> Option<String> {
  resp.response().cookies().find(|c| c.name() == name).map(|c| c.value().to_string())
}

#[actix_web::test]
async fn register_activate_login_and_fetch_profile() {
  let app = TestApp::new();
  let service = test_service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(register_body("  Ada@Example.com "))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 201);

  let pending = app.store.find_user_by_email("ada@example.com").await.unwrap().unwrap();
  assert!(!pending.is_active);
  assert_ne!(pending.password_hash, TEST_PASSWORD);

  let login_early = test::TestRequest::post()
    .uri("/api/v1/auth/login")
    .set_json(json!({"email": "ada@example.com", "password": TEST_PASSWORD}))
    .to_request();
  assert_eq!(test::call_service(&service, login_early).await.status(), 400);

  let path = mailed_activation_path(&app, "ada@example.com");
  let resp = test::call_service(&service, test::TestRequest::get().uri(&path).to_request()).await;
  assert_eq!(resp.status(), 200);
  assert!(app.store.find_user_by_email("ada@example.com").await.unwrap().unwrap().is_active);

  // The token is bound to the inactive state, so it cannot be replayed.
  let replay = test::call_service(&service, test::TestRequest::get().uri(&path).to_request()).await;
  assert_eq!(replay.status(), 400);

  let login = test::TestRequest::post()
    .uri("/api/v1/auth/login")
    .set_json(json!({"email": "ADA@example.com", "password": TEST_PASSWORD}))
    .to_request();
  let resp = test::call_service(&service, login).await;
  assert_eq!(resp.status(), 200);
  let access = cookie_value(&resp, "access_token").expect("access cookie");
  assert!(cookie_value(&resp, "refresh_token").is_some());
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["user"]["email"], "ada@example.com");
  assert!(body["user"].get("password_hash").is_none());

  let me = test::TestRequest::get()
    .uri("/api/v1/auth/me")
    .cookie(Cookie::new("access_token", access))
    .to_request();
  let resp = test::call_service(&service, me).await;
  assert_eq!(resp.status(), 200);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["first_name"], "Ada");
}

#[actix_web::test]
async fn wrong_password_and_unknown_email_are_rejected_alike() {
  let app = TestApp::new();
  app.active_user("known@example.com").await;
  let service = test_service!(app.state);

  for (email, password) in [("known@example.com", "nope-nope-nope"), ("ghost@example.com", TEST_PASSWORD)] {
    let req = test::TestRequest::post()
      .uri("/api/v1/auth/login")
      .set_json(json!({"email": email, "password": password}))
      .to_request();
    let resp = test::call_service(&service, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid email or password.");
  }
}

#[actix_web::test]
async fn registration_reports_every_invalid_field() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(json!({
      "email": "not-an-email",
      "first_name": "",
      "last_name": "X",
      "password": "12345",
      "password2": "54321",
    }))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["email"].is_array());
  assert!(body["fields"]["first_name"].is_array());
  assert!(body["fields"]["password"].as_array().unwrap().len() >= 2);
  assert!(app.mailer.sent().is_empty());
}

#[actix_web::test]
async fn duplicate_active_email_is_refused_but_pending_one_is_replaced() {
  let app = TestApp::new();
  app.active_user("taken@example.com").await;
  let service = test_service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(register_body("taken@example.com"))
    .to_request();
  let resp = test::call_service(&service, req).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["fields"]["email"].is_array());

  for _ in 0..2 {
    let req = test::TestRequest::post()
      .uri("/api/v1/auth/register")
      .set_json(register_body("again@example.com"))
      .to_request();
    assert_eq!(test::call_service(&service, req).await.status(), 201);
  }
  assert_eq!(app.mailer.sent_to("again@example.com").len(), 2);

  // Only the latest link works; the first was issued for a deleted account.
  let first_path = {
    let mails = app.mailer.sent_to("again@example.com");
    let link = mails[0].body.lines().find(|l| l.starts_with("http://shop.test/")).unwrap().to_string();
    link.trim_start_matches("http://shop.test").to_string()
  };
  let stale = test::call_service(&service, test::TestRequest::get().uri(&first_path).to_request()).await;
  assert_eq!(stale.status(), 400);
  let latest = mailed_activation_path(&app, "again@example.com");
  let ok = test::call_service(&service, test::TestRequest::get().uri(&latest).to_request()).await;
  assert_eq!(ok.status(), 200);
}

#[actix_web::test]
async fn activation_after_window_deletes_the_pending_account() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(register_body("late@example.com"))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), 201);

  let user = app.store.find_user_by_email("late@example.com").await.unwrap().unwrap();
  assert!(app.store.set_date_joined(user.id, Utc::now() - Duration::minutes(20)).await);

  let path = mailed_activation_path(&app, "late@example.com");
  let resp = test::call_service(&service, test::TestRequest::get().uri(&path).to_request()).await;
  assert_eq!(resp.status(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().unwrap().contains("Activation window has elapsed"));
  assert!(app.store.find_user_by_email("late@example.com").await.unwrap().is_none());
}

#[actix_web::test]
async fn tampered_activation_token_is_invalid() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(register_body("tamper@example.com"))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), 201);

  let mut path = mailed_activation_path(&app, "tamper@example.com");
  let last = path.pop().unwrap();
  path.push(if last == 'A' { 'B' } else { 'A' });
  let resp = test::call_service(&service, test::TestRequest::get().uri(&path).to_request()).await;
  assert_eq!(resp.status(), 400);
  assert!(!app.store.find_user_by_email("tamper@example.com").await.unwrap().unwrap().is_active);
}

#[actix_web::test]
async fn refresh_issues_new_access_token_from_cookie_or_body() {
  let app = TestApp::new();
  let user = app.active_user("refresh@example.com").await;
  let pair = app.state.tokens.issue_pair(&user).unwrap();
  let service = test_service!(app.state);

  let by_cookie = test::TestRequest::post()
    .uri("/api/v1/auth/refresh")
    .cookie(Cookie::new("refresh_token", pair.refresh.clone()))
    .to_request();
  let resp = test::call_service(&service, by_cookie).await;
  assert_eq!(resp.status(), 200);
  assert!(cookie_value(&resp, "access_token").is_some());

  let by_body = test::TestRequest::post()
    .uri("/api/v1/auth/refresh")
    .set_json(json!({"refresh": pair.refresh}))
    .to_request();
  let resp = test::call_service(&service, by_body).await;
  assert_eq!(resp.status(), 200);
  let body: Value = test::read_body_json(resp).await;
  let access = body["access"].as_str().unwrap().to_string();
  let claims = app.state.tokens.verify(&access, storefront::services::tokens::TokenKind::Access).unwrap();
  assert_eq!(claims.sub, user.id);

  let wrong_kind = test::TestRequest::post()
    .uri("/api/v1/auth/refresh")
    .set_json(json!({"refresh": pair.access}))
    .to_request();
  assert_eq!(test::call_service(&service, wrong_kind).await.status(), 401);
}

#[actix_web::test]
async fn cookie_authenticated_writes_require_csrf_token() {
  let app = TestApp::new();
  let user = app.active_user("csrf@example.com").await;
  let product = app.product("CSRF-1", "4.50".parse().unwrap(), 10).await;
  let access = app.state.tokens.issue_pair(&user).unwrap().access;
  let service = test_service!(app.state);

  let csrf = test::call_service(&service, test::TestRequest::get().uri("/api/v1/auth/csrf").to_request()).await;
  assert_eq!(csrf.status(), 200);
  let csrf_token = cookie_value(&csrf, "csrftoken").expect("csrf cookie");
  let body: Value = test::read_body_json(csrf).await;
  assert_eq!(body["csrfToken"], csrf_token.as_str());

  let payload = json!({"product_id": product.id, "quantity": 1});
  let without = test::TestRequest::post()
    .uri("/api/v1/cart-items")
    .cookie(Cookie::new("access_token", access.clone()))
    .set_json(&payload)
    .to_request();
  assert_eq!(test::call_service(&service, without).await.status(), 403);

  let with = test::TestRequest::post()
    .uri("/api/v1/cart-items")
    .cookie(Cookie::new("access_token", access.clone()))
    .cookie(Cookie::new("csrftoken", csrf_token.clone()))
    .insert_header(("X-CSRFToken", csrf_token))
    .set_json(&payload)
    .to_request();
  assert_eq!(test::call_service(&service, with).await.status(), 201);

  let bearer = test::TestRequest::post()
    .uri("/api/v1/cart-items")
    .insert_header(app.bearer(&user))
    .set_json(&payload)
    .to_request();
  let resp = test::call_service(&service, bearer).await;
  assert_eq!(resp.status(), 201);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["quantity"], 2);
}

#[actix_web::test]
async fn protected_endpoints_reject_anonymous_and_inactive_users() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let anon = test::call_service(&service, test::TestRequest::get().uri("/api/v1/cart").to_request()).await;
  assert_eq!(anon.status(), 401);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/register")
    .set_json(register_body("pending@example.com"))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), 201);
  let pending = app.store.find_user_by_email("pending@example.com").await.unwrap().unwrap();
  let req = test::TestRequest::get()
    .uri("/api/v1/auth/me")
    .insert_header(app.bearer(&pending))
    .to_request();
  assert_eq!(test::call_service(&service, req).await.status(), 401);
}

#[actix_web::test]
async fn logout_expires_both_cookies() {
  let app = TestApp::new();
  let service = test_service!(app.state);
  let resp = test::call_service(&service, test::TestRequest::post().uri("/api/v1/auth/logout").to_request()).await;
  assert_eq!(resp.status(), 200);
  for name in ["access_token", "refresh_token"] {
    let cookie = resp.response().cookies().find(|c| c.name() == name).expect("removal cookie");
    assert_eq!(cookie.value(), "");
  }
}
