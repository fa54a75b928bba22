//! Type-safe in-process caching for karat.
//!
//! Provides a key/value [`Cache`] with automatic JSON serialization and
//! versioned writes, and a [`Session`] manager on top of it that owns
//! per-client state such as carts.
//!
//! # Example
//!
//! ```rust,ignore
//! use karat_cache::Cache;
//!
//! let cache = Cache::new();
//!
//! // Store a value
//! cache.set("cart:sess_abc", &cart)?;
//!
//! // Retrieve a value
//! let cart: Option<Cart> = cache.get("cart:sess_abc")?;
//!
//! // Delete a value
//! cache.delete("cart:sess_abc")?;
//! ```

mod error;
mod kv;
mod session;

pub use error::CacheError;
pub use kv::Cache;
pub use session::{Session, SessionData, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, Session, SessionId};
}
