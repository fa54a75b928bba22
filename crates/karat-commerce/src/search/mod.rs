//! Item listing and search.

mod query;

pub use query::{ItemQuery, SortOption, AUTOCOMPLETE_LIMIT};
