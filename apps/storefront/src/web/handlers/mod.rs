// apps/storefront/src/web/handlers/mod.rs
pub mod auth_handlers;
pub mod cart_handlers;
pub mod catalog_handlers;
pub mod order_handlers;
pub mod wishlist_handlers;
