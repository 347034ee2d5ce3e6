// apps/storefront/src/services/mod.rs
pub mod activation;
pub mod auth_service;
pub mod mailer;
pub mod tokens;
pub mod views;
