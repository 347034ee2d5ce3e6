// apps/storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  pub username: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_active: bool,
  pub is_staff: bool,
  pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub password_hash: String,
  pub is_active: bool,
  pub is_staff: bool,
}

impl NewUser {
  /// `"{first_name}_{email local part}"`, lowercased; stores append `_1`, `_2`, ... on collision.
  pub fn base_username(&self) -> String {
    let prefix = self.email.split('@').next().unwrap_or_default();
    format!("{}_{}", self.first_name.to_lowercase(), prefix.to_lowercase())
  }
}

/// First of `base`, `base_1`, `base_2`, ... for which `taken` is false.
pub fn first_free_username(base: &str, taken: impl Fn(&str) -> bool) -> String {
  if !taken(base) {
    return base.to_string();
  }
  let mut counter = 1u32;
  loop {
    let candidate = format!("{}_{}", base, counter);
    if !taken(&candidate) {
      return candidate;
    }
    counter += 1;
  }
}
