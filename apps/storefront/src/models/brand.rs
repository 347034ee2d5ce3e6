// apps/storefront/src/models/brand.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Brand {
  pub id: Uuid,
  pub name: String,
}
