//! Business logic services for the cart and checkout flow.
//!
//! # Services
//!
//! - `cart` - Add, decrease and remove cart items; read the cart
//! - `shipping` - Create and list shipping addresses, link one to the cart
//! - `order` - Turn the cart into an order
//!
//! Every mutating operation validates its input before looking at the
//! session, so malformed requests fail the same way for anonymous callers.

mod cart;
mod error;
mod order;
mod shipping;

pub use cart::{AddProductInput, CartService, DecreaseOutcome};
pub use error::{CheckoutError, require_user};
pub use order::OrderService;
pub use shipping::{SelectShippingAddressInput, ShippingService, UpdateCartShippingAddressInput};
