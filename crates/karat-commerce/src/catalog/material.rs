//! Material reference data.

use crate::error::CommerceError;
use crate::ids::MaterialId;
use serde::{Deserialize, Serialize};

/// A material an item is made of (gold, silver, platinum, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
}

/// Metals with a live spot price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metal {
    Gold,
    Silver,
}

impl Metal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "Gold",
            Metal::Silver => "Silver",
        }
    }

    /// Match a material name, ignoring case and surrounding whitespace.
    pub fn from_material_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("gold") {
            Some(Metal::Gold)
        } else if name.eq_ignore_ascii_case("silver") {
            Some(Metal::Silver)
        } else {
            None
        }
    }
}

impl Material {
    /// The priced metal this material corresponds to, if any.
    pub fn metal(&self) -> Option<Metal> {
        Metal::from_material_name(&self.name)
    }
}

/// Input for creating a material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMaterial {
    #[serde(default)]
    pub name: String,
}

impl NewMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn into_material(self) -> Result<Material, CommerceError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CommerceError::validation("Material name is required"));
        }
        Ok(Material {
            id: MaterialId::generate(),
            name: name.to_string(),
        })
    }
}
