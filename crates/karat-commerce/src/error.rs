//! Commerce error types.

use thiserror::Error;

/// Errors that can occur in back-office operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Material not found.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// Item not found.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// No receipt stored for an order.
    #[error("Bill not found for order: {0}")]
    ReceiptNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Not enough stock to satisfy a request.
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: i64,
        available: i64,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// A category would become its own ancestor.
    #[error("Category {0} cannot be moved under its own descendant")]
    CategoryCycle(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Validation error.
    #[error("{0}")]
    ValidationError(String),

    /// External price feed failure.
    #[error("Price feed error: {0}")]
    UpstreamError(String),

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Receipt storage error.
    #[error("Receipt storage error: {0}")]
    ReceiptError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
    Persistence,
}

impl CommerceError {
    /// Shorthand for a validation failure with a message.
    pub fn validation(message: impl Into<String>) -> Self {
        CommerceError::ValidationError(message.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::CategoryNotFound(_)
            | CommerceError::MaterialNotFound(_)
            | CommerceError::ItemNotFound(_)
            | CommerceError::OrderNotFound(_)
            | CommerceError::ReceiptNotFound(_)
            | CommerceError::ItemNotInCart(_) => ErrorKind::NotFound,
            CommerceError::EmptyCart
            | CommerceError::InsufficientStock { .. }
            | CommerceError::InvalidQuantity(_)
            | CommerceError::CategoryCycle(_)
            | CommerceError::CurrencyMismatch { .. }
            | CommerceError::Overflow
            | CommerceError::ValidationError(_) => ErrorKind::Validation,
            CommerceError::UpstreamError(_) => ErrorKind::Upstream,
            CommerceError::DatabaseError(_)
            | CommerceError::ReceiptError(_)
            | CommerceError::SerializationError(_) => ErrorKind::Persistence,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(feature = "postgres")]
impl From<karat_db::DbError> for CommerceError {
    fn from(e: karat_db::DbError) -> Self {
        CommerceError::DatabaseError(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        CommerceError::DatabaseError(e.to_string())
    }
}

impl From<karat_data::FetchError> for CommerceError {
    fn from(e: karat_data::FetchError) -> Self {
        CommerceError::UpstreamError(e.to_string())
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for CommerceError {
    fn from(e: std::io::Error) -> Self {
        CommerceError::ReceiptError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(CommerceError::EmptyCart.kind(), ErrorKind::Validation);
        assert_eq!(
            CommerceError::CategoryNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CommerceError::DatabaseError("down".into()).kind(),
            ErrorKind::Persistence
        );
        assert!(CommerceError::ItemNotInCart("a".into()).is_not_found());
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = CommerceError::InsufficientStock {
            item_id: "ring-1".into(),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for ring-1: requested 3, available 1"
        );
    }
}
