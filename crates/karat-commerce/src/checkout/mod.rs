//! Checkout module.
//!
//! Contains customer and order records, receipts, and the engine that turns
//! a cart into an order.

mod engine;
mod order;
mod receipt;

pub use engine::{CheckoutEngine, CheckoutOutcome, CheckoutRequest, DEFAULT_PAYMENT_METHOD};
pub use order::{Customer, NewCustomer, Order, OrderItem, OrderStatus, OrderSummary};
pub use receipt::{
    receipt_file_name, FsReceiptStore, MemoryReceiptStore, Receipt, ReceiptLine, ReceiptStore,
};
