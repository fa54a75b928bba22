//! Postgres connection layer for karat.
//!
//! Wraps a `sqlx` connection pool and the embedded schema migrations. Query
//! code lives with the domain types in `karat-commerce` (feature `postgres`);
//! this crate only owns connecting, pinging, transactions and migrations.
//!
//! # Example
//!
//! ```rust,ignore
//! use karat_db::{Db, DbOptions};
//!
//! let db = Db::connect(&DbOptions::new("postgres://localhost/karat")).await?;
//! db.migrate().await?;
//!
//! let mut tx = db.begin().await?;
//! sqlx::query("UPDATE items SET stock = stock - 1 WHERE id = $1 AND stock >= 1")
//!     .bind("ring-1")
//!     .execute(&mut *tx)
//!     .await?;
//! tx.commit().await?;
//! ```

mod db;
mod error;

pub use db::{Db, DbOptions, Transaction};
pub use error::DbError;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Db, DbError, DbOptions, Transaction};
}
