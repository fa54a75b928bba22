//! Cart module.
//!
//! Contains the per-session cart and checkout pricing.

mod cart;
mod pricing;

pub use cart::{Cart, CartLine, CartLineView};
pub use pricing::{metal_surcharge, CheckoutTotals, MetalLine, TotalsView};
