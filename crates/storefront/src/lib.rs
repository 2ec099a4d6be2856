//! Sacola storefront: cart and checkout API.
//!
//! Adds product variants to a per-user cart, manages shipping addresses,
//! links an address to the cart and turns the cart into an order. Identity
//! comes from a session shared with an external auth provider.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;
