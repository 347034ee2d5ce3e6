// apps/storefront/src/models/mod.rs

//! Rows of the storefront schema and the JSON views built from them.

pub mod brand;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod product_image;
pub mod user;

pub use brand::Brand;
pub use cart::{line_total, max_amount, quantity_error, Cart, CartItem, CartItemView, CartView, MAX_LINE_QUANTITY};
pub use category::{Category, NewCategory};
pub use order::{DeliveryMethod, Order, OrderItem, OrderItemView, OrderStatus, OrderView};
pub use product::{max_price, NewProduct, Product, ProductFilter, ProductView};
pub use product_image::{NewProductImage, ProductImage};
pub use user::{NewUser, User};
