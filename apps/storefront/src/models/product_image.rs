// apps/storefront/src/models/product_image.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProductImage {
  pub id: Uuid,
  #[serde(rename = "product")]
  pub product_id: Uuid,
  /// Stored path or URL of the image file.
  pub image: String,
  pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProductImage {
  pub product_id: Uuid,
  pub image: String,
  pub name: String,
}

impl NewProductImage {
  pub fn new(product_id: Uuid, image: impl Into<String>) -> Self {
    let image = image.into();
    let name = image_display_name(&image);
    Self { product_id, image, name }
  }
}

/// `"uploads/red_SHOE.v2.png"` -> `"Red_shoe"`: the file stem before the first dot, capitalised.
pub fn image_display_name(image: &str) -> String {
  let file_name = image.rsplit('/').next().unwrap_or(image);
  let stem = file_name.split('.').next().unwrap_or(file_name);
  let mut chars = stem.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_name_is_capitalised_stem() {
    assert_eq!(image_display_name("product_images/red_SHOE.v2.png"), "Red_shoe");
    assert_eq!(image_display_name("banner.jpg"), "Banner");
    assert_eq!(image_display_name("https://cdn.example.com/a/b/photo"), "Photo");
    assert_eq!(image_display_name(""), "");
  }
}
