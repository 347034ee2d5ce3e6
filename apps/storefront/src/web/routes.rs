// apps/storefront/src/web/routes.rs

use crate::web::handlers::{auth_handlers, cart_handlers, catalog_handlers, order_handlers, wishlist_handlers};
use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.route("/health", web::get().to(health_check_handler)).service(
    web::scope("/api/v1")
      .service(
        web::scope("/auth")
          .route("/register", web::post().to(auth_handlers::register_handler))
          .route("/activate/{uidb64}/{token}", web::get().to(auth_handlers::activate_handler))
          .route("/login", web::post().to(auth_handlers::login_handler))
          .route("/refresh", web::post().to(auth_handlers::refresh_handler))
          .route("/logout", web::post().to(auth_handlers::logout_handler))
          .route("/csrf", web::get().to(auth_handlers::csrf_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      .service(
        web::scope("/brands")
          .route("", web::get().to(catalog_handlers::list_brands_handler))
          .route("", web::post().to(catalog_handlers::create_brand_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_brand_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_brand_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_brand_handler)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(catalog_handlers::list_categories_handler))
          .route("", web::post().to(catalog_handlers::create_category_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_category_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_category_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_category_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(catalog_handlers::list_products_handler))
          .route("", web::post().to(catalog_handlers::create_product_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_product_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_product_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_product_handler)),
      )
      .service(
        web::scope("/product-images")
          .route("", web::get().to(catalog_handlers::list_images_handler))
          .route("", web::post().to(catalog_handlers::create_image_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_image_handler))
          .route("/{id}", web::put().to(catalog_handlers::update_image_handler))
          .route("/{id}", web::delete().to(catalog_handlers::delete_image_handler)),
      )
      .route("/cart", web::get().to(cart_handlers::get_cart_handler))
      .service(
        web::scope("/cart-items")
          .route("", web::get().to(cart_handlers::list_cart_items_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/{id}", web::get().to(cart_handlers::get_cart_item_handler))
          .route("/{id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/{id}", web::delete().to(cart_handlers::delete_cart_item_handler)),
      )
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("/from-cart", web::post().to(order_handlers::order_from_cart_handler))
          .route("/{id}", web::get().to(order_handlers::get_order_handler)),
      )
      .service(
        web::scope("/wishlist")
          .route("", web::get().to(wishlist_handlers::get_wishlist_handler))
          .route("", web::post().to(wishlist_handlers::add_to_wishlist_handler))
          .route("/{product_id}", web::delete().to(wishlist_handlers::remove_from_wishlist_handler)),
      ),
  );
}
