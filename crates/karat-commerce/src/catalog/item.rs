//! Item types.
//!
//! Admin clients submit numbers either as JSON numbers or as strings (form
//! fields), so write inputs go through [`FieldValue`] and are converted to the
//! fixed-point [`Money`] and [`Weight`] types before anything is stored.

use crate::error::CommerceError;
use crate::ids::{CategoryId, ItemId, MaterialId};
use crate::money::{Currency, Money, Weight};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A jewelry item in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique item identifier.
    pub id: ItemId,
    /// External SKU (unique).
    pub unique_id: String,
    /// Item name.
    pub name: String,
    /// Category the item is filed under.
    pub category_id: CategoryId,
    /// Material the item is made of.
    pub material_id: MaterialId,
    /// Catalog price.
    pub price: Money,
    /// Metal weight, when known.
    pub weight: Option<Weight>,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// Units sold through checkout.
    pub sold_count: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Case-insensitive substring match on name or SKU.
    ///
    /// `needle` must already be lowercased. An empty needle matches.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.unique_id.to_lowercase().contains(needle)
    }

    /// Apply a validated partial update in place.
    pub fn apply(&mut self, patch: ItemPatch) -> Result<(), CommerceError> {
        let currency = self.price.currency;
        if let Some(unique_id) = patch.unique_id {
            self.unique_id = required_text(Some(unique_id), "unique_id")?;
        }
        if let Some(name) = patch.name {
            self.name = required_text(Some(name), "name")?;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(material_id) = patch.material_id {
            self.material_id = material_id;
        }
        if let Some(price) = patch.price {
            self.price = price
                .to_money(currency, "price")?
                .unwrap_or_else(|| Money::zero(currency));
        }
        if let Some(weight) = patch.weight {
            self.weight = match weight {
                Some(value) => value.to_weight("weight")?,
                None => None,
            };
        }
        if let Some(stock) = patch.stock {
            self.stock = stock.to_count("stock")?.unwrap_or(0);
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(image_url) = patch.image_url {
            self.image_url = image_url;
        }
        Ok(())
    }
}

/// A number as submitted by a client: JSON number or numeric string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Blank strings count as absent.
    fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }

    pub fn to_money(&self, currency: Currency, field: &str) -> Result<Option<Money>, CommerceError> {
        if self.is_blank() {
            return Ok(None);
        }
        let money = match self {
            FieldValue::Int(v) => v
                .checked_mul(10_i64.pow(currency.decimal_places()))
                .map(|minor| Money::new(minor, currency)),
            FieldValue::Float(v) if v.is_finite() => Some(Money::from_decimal(*v, currency)),
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => Money::parse_decimal(s, currency),
        };
        match money {
            Some(m) if m.is_negative() => {
                Err(CommerceError::validation(format!("{field} cannot be negative")))
            }
            Some(m) => Ok(Some(m)),
            None => Err(CommerceError::validation(format!("Invalid {field}"))),
        }
    }

    pub fn to_weight(&self, field: &str) -> Result<Option<Weight>, CommerceError> {
        if self.is_blank() {
            return Ok(None);
        }
        let grams = match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        };
        match grams {
            Some(g) if g.is_finite() && g >= 0.0 => Ok(Some(Weight::from_grams(g))),
            _ => Err(CommerceError::validation(format!("Invalid {field}"))),
        }
    }

    /// Integer count. Fractional input is truncated toward zero.
    pub fn to_count(&self, field: &str) -> Result<Option<i64>, CommerceError> {
        if self.is_blank() {
            return Ok(None);
        }
        let count = match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Float(v) if v.is_finite() => Some(v.trunc() as i64),
            FieldValue::Float(_) => None,
            FieldValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.trunc() as i64))
            }
        };
        match count {
            Some(c) if c < 0 => Err(CommerceError::validation(format!("{field} cannot be negative"))),
            Some(c) => Ok(Some(c)),
            None => Err(CommerceError::validation(format!("Invalid {field}"))),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewItem {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub material_id: Option<MaterialId>,
    #[serde(default)]
    pub price: Option<FieldValue>,
    #[serde(default)]
    pub weight: Option<FieldValue>,
    #[serde(default)]
    pub stock: Option<FieldValue>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewItem {
    /// Validate required fields and build the record.
    ///
    /// Category and material existence is checked by the caller, which has
    /// storage access.
    pub fn into_item(self, currency: Currency) -> Result<Item, CommerceError> {
        let unique_id = required_text(self.unique_id, "unique_id")?;
        let name = required_text(self.name, "name")?;
        let category_id = self
            .category_id
            .ok_or_else(|| CommerceError::validation("Missing required field: category_id"))?;
        let material_id = self
            .material_id
            .ok_or_else(|| CommerceError::validation("Missing required field: material_id"))?;
        let stock = self
            .stock
            .ok_or_else(|| CommerceError::validation("Missing required field: stock"))?
            .to_count("stock")?
            .unwrap_or(0);

        let price = match self.price {
            Some(value) => value.to_money(currency, "price")?,
            None => None,
        }
        .unwrap_or_else(|| Money::zero(currency));

        let weight = match self.weight {
            Some(value) => value.to_weight("weight")?,
            None => None,
        };

        Ok(Item {
            id: ItemId::generate(),
            unique_id,
            name,
            category_id,
            material_id,
            price,
            weight,
            stock,
            sold_count: 0,
            description: self.description,
            image_url: self.image_url,
            created_at: Utc::now(),
        })
    }
}

/// Partial update for an item. Absent fields are left untouched.
///
/// `weight`, `description` and `image_url` accept `null` to clear the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemPatch {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub material_id: Option<MaterialId>,
    #[serde(default)]
    pub price: Option<FieldValue>,
    #[serde(default, deserialize_with = "present")]
    pub weight: Option<Option<FieldValue>>,
    #[serde(default)]
    pub stock: Option<FieldValue>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &ItemPatch::default()
    }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, CommerceError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(CommerceError::validation(format!(
            "Missing required field: {field}"
        ))),
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(T::from))
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Client-facing item shape: numbers as floats, ids as strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemView {
    pub id: String,
    pub unique_id: String,
    pub name: String,
    pub category_id: String,
    pub material_id: String,
    pub price: f64,
    pub weight: Option<f64>,
    pub stock: i64,
    pub sold_count: i64,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            unique_id: item.unique_id.clone(),
            name: item.name.clone(),
            category_id: item.category_id.to_string(),
            material_id: item.material_id.to_string(),
            price: item.price.to_decimal(),
            weight: item.weight.map(|w| w.to_grams()),
            stock: item.stock,
            sold_count: item.sold_count,
            description: item.description.clone(),
            image_url: item.image_url.clone(),
            created_at: item.created_at,
        }
    }
}

/// Item view with its category placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: ItemView,
    pub category_name: Option<String>,
    pub parent_id: Option<String>,
    /// Category names from the root down to the item's category.
    pub full_category_path: Vec<String>,
}

/// Autocomplete entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemSuggestion {
    pub id: String,
    pub name: String,
}

impl From<&Item> for ItemSuggestion {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> NewItem {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_new_item_accepts_strings_and_numbers() {
        let item = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1",
                "material_id": "m1", "price": "1250.50", "weight": 4.2, "stock": "3"}"#,
        )
        .into_item(Currency::INR)
        .unwrap();

        assert_eq!(item.price.amount_minor, 125050);
        assert_eq!(item.weight, Some(Weight::from_milligrams(4200)));
        assert_eq!(item.stock, 3);
        assert_eq!(item.sold_count, 0);
    }

    #[test]
    fn test_new_item_defaults() {
        let item = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1",
                "material_id": "m1", "price": "", "weight": "", "stock": 0}"#,
        )
        .into_item(Currency::INR)
        .unwrap();

        assert!(item.price.is_zero());
        assert!(item.weight.is_none());
    }

    #[test]
    fn test_new_item_missing_fields() {
        let missing_stock = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1", "material_id": "m1"}"#,
        );
        let err = missing_stock.into_item(Currency::INR).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: stock");

        let blank_category = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": " ", "material_id": "m1", "stock": 1}"#,
        );
        assert!(blank_category.into_item(Currency::INR).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        let item = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1", "material_id": "m1", "stock": -2}"#,
        );
        assert!(item.into_item(Currency::INR).is_err());
    }

    #[test]
    fn test_patch_clears_weight_with_null() {
        let mut item = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1",
                "material_id": "m1", "weight": "2", "stock": 1}"#,
        )
        .into_item(Currency::INR)
        .unwrap();

        let untouched: ItemPatch = serde_json::from_str(r#"{"name": "Wide Band"}"#).unwrap();
        item.apply(untouched).unwrap();
        assert_eq!(item.name, "Wide Band");
        assert!(item.weight.is_some());

        let cleared: ItemPatch = serde_json::from_str(r#"{"weight": null}"#).unwrap();
        item.apply(cleared).unwrap();
        assert!(item.weight.is_none());
    }

    #[test]
    fn test_matches_name_or_sku() {
        let item = input(
            r#"{"unique_id": "GR-778", "name": "Gold Ring", "category_id": "c1", "material_id": "m1", "stock": 1}"#,
        )
        .into_item(Currency::INR)
        .unwrap();

        assert!(item.matches("ring"));
        assert!(item.matches("gr-7"));
        assert!(item.matches(""));
        assert!(!item.matches("necklace"));
    }

    #[test]
    fn test_view_coerces_numbers() {
        let item = input(
            r#"{"unique_id": "R-1", "name": "Band", "category_id": "c1",
                "material_id": "m1", "price": 99, "weight": "1.5", "stock": 1}"#,
        )
        .into_item(Currency::INR)
        .unwrap();
        let view = ItemView::from(&item);
        assert_eq!(view.price, 99.0);
        assert_eq!(view.weight, Some(1.5));
        assert_eq!(view.category_id, "c1");
    }
}
