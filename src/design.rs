//! Generated designs
//!
//! A generate call yields base designs, each with an ordered list of
//! variations. Indices are 1-based, matching how they are shown to users
//! ("Base 2 - Var 1").

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One generated (or edited) image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignArtifact {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_design_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_index: Option<u32>,
    /// Service-provided extras, kept verbatim
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl DesignArtifact {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            dominant_color: None,
            base_design_index: None,
            variation_index: None,
            metadata: Map::new(),
        }
    }

    pub fn location(&self) -> Option<ArtifactLocation> {
        Some(ArtifactLocation {
            base_design_index: self.base_design_index?,
            variation_index: self.variation_index?,
        })
    }

    /// Swap the URL and every metadata string that pointed at the old one.
    pub fn replace_url(&mut self, new_url: &str) {
        let old_url = std::mem::replace(&mut self.url, new_url.to_string());
        for value in self.metadata.values_mut() {
            if value.as_str() == Some(old_url.as_str()) {
                *value = Value::String(new_url.to_string());
            }
        }
    }
}

/// One base design and its variations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    pub base_design_index: u32,
    pub variations: Vec<DesignArtifact>,
}

/// Total number of artifacts across designs.
pub fn artifact_count(designs: &[Design]) -> usize {
    designs.iter().map(|d| d.variations.len()).sum()
}

/// Position of an artifact inside a design set (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub base_design_index: u32,
    pub variation_index: u32,
}

impl ArtifactLocation {
    pub fn new(base_design_index: u32, variation_index: u32) -> Self {
        Self {
            base_design_index,
            variation_index,
        }
    }
}

/// The artifact the user is currently looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedArtifact {
    pub url: String,
    pub location: ArtifactLocation,
}
