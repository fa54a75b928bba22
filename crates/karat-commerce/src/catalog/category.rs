//! Category types for item organization.

use crate::error::CommerceError;
use crate::ids::CategoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A category in the catalog hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Category name.
    pub name: String,
    /// Parent category ID (None for root categories).
    pub parent_id: Option<CategoryId>,
    /// Sort order position among siblings.
    pub sort_order: i32,
    /// Whether the category is shown to customers.
    pub visibility: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Check if this is a root category.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(sort_order) = patch.sort_order {
            self.sort_order = sort_order;
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCategory {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "blank_id_as_none")]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visibility")]
    pub visibility: bool,
}

fn default_visibility() -> bool {
    true
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            sort_order: 0,
            visibility: true,
        }
    }

    pub fn under(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Check the fields that don't need storage lookups.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.name.trim().is_empty() {
            return Err(CommerceError::validation("Category name is required"));
        }
        Ok(())
    }

    /// Materialize the record with a fresh id.
    pub fn into_category(self) -> Category {
        Category {
            id: CategoryId::generate(),
            name: self.name.trim().to_string(),
            parent_id: self.parent_id,
            sort_order: self.sort_order,
            visibility: self.visibility,
            created_at: Utc::now(),
        }
    }
}

/// Partial update for a category.
///
/// `parent_id` distinguishes "absent" (`None`) from "set to null"
/// (`Some(None)`), which moves the category to the root.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_nullable_id")]
    pub parent_id: Option<Option<CategoryId>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub visibility: Option<bool>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.sort_order.is_none()
            && self.visibility.is_none()
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.is_empty() {
            return Err(CommerceError::validation("No valid fields to update"));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(CommerceError::validation("Category name cannot be empty"));
        }
        Ok(())
    }
}

fn blank_id_as_none<'de, D>(deserializer: D) -> Result<Option<CategoryId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| CategoryId::parse(&s)))
}

fn present_nullable_id<'de, D>(deserializer: D) -> Result<Option<Option<CategoryId>>, D::Error>
where
    D: Deserializer<'de>,
{
    // Only called when the key is present.
    blank_id_as_none(deserializer).map(Some)
}

/// A category with its children, as returned by the tree endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub sort_order: i32,
    pub visibility: bool,
    pub subcategories: Vec<CategoryNode>,
}

impl CategoryNode {
    pub(crate) fn leaf(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            parent_id: category.parent_id.clone(),
            sort_order: category.sort_order,
            visibility: category.visibility,
            subcategories: Vec::new(),
        }
    }

    /// Count this node and everything below it.
    pub fn size(&self) -> usize {
        1 + self.subcategories.iter().map(CategoryNode::size).sum::<usize>()
    }
}
