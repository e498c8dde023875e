//! Accumulated user selection
//!
//! Catalog dimensions are either a concrete label or the `Any` sentinel set
//! by a skip option. Unset (`None`) means the user has not reached that
//! step yet, which is distinct from having skipped it.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Literal sent to the Design Service for a skipped dimension.
pub const ANY_LABEL: &str = "Any";

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// The four catalog levels, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Brand,
    Category,
    Department,
    SubDepartment,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Brand,
        Dimension::Category,
        Dimension::Department,
        Dimension::SubDepartment,
    ];

    /// Dimension chosen at catalog depth `depth` (0 = brand).
    pub fn at_depth(depth: usize) -> Option<Dimension> {
        Self::ALL.get(depth).copied()
    }

    pub fn depth(self) -> usize {
        self as usize
    }

    /// Singular display name ("Sub-Department")
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Brand => "Brand",
            Dimension::Category => "Category",
            Dimension::Department => "Department",
            Dimension::SubDepartment => "Sub-Department",
        }
    }

    /// Lower-case plural used by "Back to ..." options
    pub fn plural(self) -> &'static str {
        match self {
            Dimension::Brand => "brands",
            Dimension::Category => "categories",
            Dimension::Department => "departments",
            Dimension::SubDepartment => "sub-departments",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// DimensionValue
// ---------------------------------------------------------------------------

/// Value of a catalog dimension once the user has passed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DimensionValue {
    /// Explicitly skipped
    Any,
    Value(String),
}

impl DimensionValue {
    pub fn value(label: impl Into<String>) -> Self {
        DimensionValue::Value(label.into())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, DimensionValue::Any)
    }

    /// Concrete label, `None` for `Any`
    pub fn as_specific(&self) -> Option<&str> {
        match self {
            DimensionValue::Any => None,
            DimensionValue::Value(label) => Some(label),
        }
    }

    /// Label as shown to the user and sent to the service
    pub fn label(&self) -> &str {
        self.as_specific().unwrap_or(ANY_LABEL)
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Numeric parameter collected by a number-entry step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    BaseDesigns,
    VariationsPerBase,
}

/// Everything the user has chosen in the current conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<DimensionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DimensionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DimensionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_department: Option<DimensionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_base_designs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_variations_per_base: Option<u32>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionValue> {
        match dimension {
            Dimension::Brand => self.brand.as_ref(),
            Dimension::Category => self.category.as_ref(),
            Dimension::Department => self.department.as_ref(),
            Dimension::SubDepartment => self.sub_department.as_ref(),
        }
    }

    pub fn set_dimension(&mut self, dimension: Dimension, value: DimensionValue) {
        let slot = match dimension {
            Dimension::Brand => &mut self.brand,
            Dimension::Category => &mut self.category,
            Dimension::Department => &mut self.department,
            Dimension::SubDepartment => &mut self.sub_department,
        };
        *slot = Some(value);
    }

    pub fn numeric(&self, field: NumericField) -> Option<u32> {
        match field {
            NumericField::BaseDesigns => self.num_base_designs,
            NumericField::VariationsPerBase => self.num_variations_per_base,
        }
    }

    pub fn set_numeric(&mut self, field: NumericField, value: u32) {
        match field {
            NumericField::BaseDesigns => self.num_base_designs = Some(value),
            NumericField::VariationsPerBase => self.num_variations_per_base = Some(value),
        }
    }

    /// Display label of a dimension; unset dimensions read as "Any".
    pub fn dimension_label(&self, dimension: Dimension) -> &str {
        self.dimension(dimension)
            .map(DimensionValue::label)
            .unwrap_or(ANY_LABEL)
    }

    /// Names of the fields a generate request cannot do without.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("date");
        }
        for dimension in Dimension::ALL {
            if self.dimension(dimension).is_none() {
                missing.push(match dimension {
                    Dimension::Brand => "brand",
                    Dimension::Category => "category",
                    Dimension::Department => "department",
                    Dimension::SubDepartment => "subDepartment",
                });
            }
        }
        if self.num_base_designs.is_none() {
            missing.push("numBaseDesigns");
        }
        if self.num_variations_per_base.is_none() {
            missing.push("numVariationsPerBase");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
