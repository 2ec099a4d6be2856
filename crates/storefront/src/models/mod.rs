//! Domain models for the cart and checkout flow.
//!
//! These types represent validated domain objects separate from database row
//! types (see `db`), plus the request/response shapes the HTTP layer uses.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod shipping_address;
pub mod validation;

pub use cart::{Cart, CartItem, CartLine, CartLineView, CartView};
pub use catalog::ProductVariant;
pub use order::{NewOrder, Order, OrderItem};
pub use session::{CurrentUser, keys as session_keys};
pub use shipping_address::{
    AddressFields, AddressOption, COUNTRY, IdentificationView, NewShippingAddress, ShippingAddress,
    ShippingAddressInput,
};
pub use validation::{FieldError, ValidationErrors};
