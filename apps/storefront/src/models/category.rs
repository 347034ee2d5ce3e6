// apps/storefront/src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
  pub id: Uuid,
  pub name: String,
  pub slug: String,
}

/// Insert/update payload; `slug` is derived from `name` when blank.
#[derive(Debug, Clone)]
pub struct NewCategory {
  pub name: String,
  pub slug: String,
}

impl NewCategory {
  pub fn new(name: impl Into<String>, slug: Option<String>) -> Self {
    let name = name.into();
    let slug = match slug.map(|s| s.trim().to_string()) {
      Some(s) if !s.is_empty() => s,
      _ => slugify(&name),
    };
    Self { name, slug }
  }
}

/// Lowercases `name` and joins its whitespace-separated words with `-`.
pub fn slugify(name: &str) -> String {
  name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}
