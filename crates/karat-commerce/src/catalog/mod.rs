//! Jewelry catalog module.
//!
//! Contains types for categories, the category hierarchy, materials and
//! items, plus the service that applies catalog writes.

mod category;
mod item;
mod material;
mod service;
mod tree;

pub use category::{Category, CategoryNode, CategoryPatch, NewCategory};
pub use item::{FieldValue, Item, ItemDetail, ItemPatch, ItemSuggestion, ItemView, NewItem};
pub use material::{Material, Metal, NewMaterial};
pub use service::CatalogService;
pub use tree::CategoryIndex;
