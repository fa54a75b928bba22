//! Item query builder.

use crate::catalog::Item;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Maximum suggestions returned by autocomplete.
pub const AUTOCOMPLETE_LIMIT: usize = 10;

/// Sort options for item listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Newest first.
    #[default]
    Default,
    /// Sort by price, low to high.
    PriceAsc,
    /// Sort by price, high to low.
    PriceDesc,
    /// Sort by units sold, high to low.
    MostSold,
    /// Newest first.
    New,
}

impl SortOption {
    /// Parse a `sort` query value. Unknown values fall back to the default.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "price_asc" => SortOption::PriceAsc,
            "price_desc" => SortOption::PriceDesc,
            "most_sold" => SortOption::MostSold,
            "new" => SortOption::New,
            _ => SortOption::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Default => "default",
            SortOption::PriceAsc => "price_asc",
            SortOption::PriceDesc => "price_desc",
            SortOption::MostSold => "most_sold",
            SortOption::New => "new",
        }
    }

    /// Stable sort, so ties keep their incoming order.
    pub fn sort(&self, items: &mut [Item]) {
        match self {
            SortOption::PriceAsc => items.sort_by_key(|i| i.price.amount_minor),
            SortOption::PriceDesc => items.sort_by_key(|i| Reverse(i.price.amount_minor)),
            SortOption::MostSold => items.sort_by_key(|i| Reverse(i.sold_count)),
            SortOption::Default | SortOption::New => items.sort_by_key(|i| Reverse(i.created_at)),
        }
    }
}

/// A listing query: optional text filter, sort order, optional cap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    /// Case-insensitive substring on name or SKU.
    pub text: Option<String>,
    pub sort: SortOption,
    pub limit: Option<usize>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text filter. Blank text matches everything.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into().trim().to_lowercase();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    pub fn with_sort(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter, sort and cap `items`.
    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        let mut matched: Vec<Item> = match &self.text {
            Some(needle) => items.into_iter().filter(|i| i.matches(needle)).collect(),
            None => items,
        };
        self.sort.sort(&mut matched);
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{CategoryId, ItemId, MaterialId};
    use crate::money::{Currency, Money};
    use chrono::{Duration, Utc};

    fn item(name: &str, price: i64, sold: i64, age_days: i64) -> Item {
        Item {
            id: ItemId::new(name),
            unique_id: format!("SKU-{name}"),
            name: name.to_string(),
            category_id: CategoryId::new("c"),
            material_id: MaterialId::new("m"),
            price: Money::new(price, Currency::INR),
            weight: None,
            stock: 1,
            sold_count: sold,
            description: None,
            image_url: None,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn fixture() -> Vec<Item> {
        vec![
            item("Anklet", 300, 5, 3),
            item("Bangle", 100, 9, 1),
            item("Chain", 200, 1, 2),
        ]
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(SortOption::parse("price_desc"), SortOption::PriceDesc);
        assert_eq!(SortOption::parse("MOST_SOLD"), SortOption::MostSold);
        assert_eq!(SortOption::parse("bogus"), SortOption::Default);
        assert_eq!(SortOption::parse(""), SortOption::Default);
    }

    #[test]
    fn test_sort_orders() {
        let by = |sort: SortOption| names(&ItemQuery::new().with_sort(sort).apply(fixture()))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        assert_eq!(by(SortOption::PriceAsc), ["Bangle", "Chain", "Anklet"]);
        assert_eq!(by(SortOption::PriceDesc), ["Anklet", "Chain", "Bangle"]);
        assert_eq!(by(SortOption::MostSold), ["Bangle", "Anklet", "Chain"]);
        assert_eq!(by(SortOption::New), ["Bangle", "Chain", "Anklet"]);
        assert_eq!(by(SortOption::Default), by(SortOption::New));
    }

    #[test]
    fn test_text_matches_name_or_sku() {
        let found = ItemQuery::new().with_text("  BAN ").apply(fixture());
        assert_eq!(names(&found), ["Bangle"]);

        let by_sku = ItemQuery::new().with_text("sku-ch").apply(fixture());
        assert_eq!(names(&by_sku), ["Chain"]);

        assert_eq!(ItemQuery::new().with_text("").apply(fixture()).len(), 3);
    }

    #[test]
    fn test_limit() {
        let capped = ItemQuery::new().with_limit(2).apply(fixture());
        assert_eq!(capped.len(), 2);
    }
}
