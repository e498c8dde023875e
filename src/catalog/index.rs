//! Nested catalog index
//!
//! Built in one pass from the flat `CatalogRecord` list. Every level keeps
//! first-occurrence order, so the dialog lists brands (and everything
//! below them) in the order the service returned them.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use design_service_types::CatalogRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    brands: IndexMap<String, BrandEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandEntry {
    /// First non-blank description seen for the brand
    pub description: Option<String>,
    pub categories: IndexMap<String, CategoryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub departments: IndexMap<String, DepartmentEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentEntry {
    pub sub_departments: IndexSet<String>,
}

/// Trimmed, non-blank value of an optional field.
fn clean(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CatalogIndex {
    /// Build the index from flat records.
    ///
    /// A record contributes its levels top-down and stops at the first
    /// missing (or blank) dimension.
    pub fn from_records(records: &[CatalogRecord]) -> Self {
        let mut index = CatalogIndex::default();

        for record in records {
            let Some(brand) = clean(&record.brand) else {
                continue;
            };
            let brand_entry = index.brands.entry(brand.to_string()).or_default();
            if brand_entry.description.is_none() {
                brand_entry.description = clean(&record.brand_description).map(String::from);
            }

            let Some(category) = clean(&record.category) else {
                continue;
            };
            let category_entry = brand_entry
                .categories
                .entry(category.to_string())
                .or_default();

            let Some(department) = clean(&record.department) else {
                continue;
            };
            let department_entry = category_entry
                .departments
                .entry(department.to_string())
                .or_default();

            if let Some(sub_department) = clean(&record.sub_department) {
                department_entry
                    .sub_departments
                    .insert(sub_department.to_string());
            }
        }

        index
    }

    pub fn is_empty(&self) -> bool {
        self.brands.is_empty()
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    pub fn brand(&self, name: &str) -> Option<&BrandEntry> {
        self.brands.get(name)
    }

    pub fn brands(&self) -> Vec<&str> {
        self.brands.keys().map(String::as_str).collect()
    }

    /// Stored description of a brand, if any.
    pub fn brand_description(&self, name: &str) -> Option<&str> {
        self.brands.get(name)?.description.as_deref()
    }

    pub fn categories(&self, brand: Option<&str>) -> Vec<&str> {
        self.children(&[brand])
    }

    pub fn departments(&self, brand: Option<&str>, category: Option<&str>) -> Vec<&str> {
        self.children(&[brand, category])
    }

    pub fn sub_departments(
        &self,
        brand: Option<&str>,
        category: Option<&str>,
        department: Option<&str>,
    ) -> Vec<&str> {
        self.children(&[brand, category, department])
    }

    /// Keys one level below `scope`.
    ///
    /// `scope[i]` fixes level `i` to a name, or leaves it open (`None`) in
    /// which case every parent at that level is considered. The result is
    /// the deduplicated union in first-occurrence order. A scope longer than
    /// three levels has no children.
    pub fn children(&self, scope: &[Option<&str>]) -> Vec<&str> {
        let mut out: IndexSet<&str> = IndexSet::new();

        let brands = self
            .brands
            .iter()
            .filter(|(name, _)| matches_scope(scope.first(), name));

        for (brand, entry) in brands {
            if scope.is_empty() {
                out.insert(brand.as_str());
                continue;
            }
            let categories = entry
                .categories
                .iter()
                .filter(|(name, _)| matches_scope(scope.get(1), name));
            for (category, entry) in categories {
                if scope.len() == 1 {
                    out.insert(category.as_str());
                    continue;
                }
                let departments = entry
                    .departments
                    .iter()
                    .filter(|(name, _)| matches_scope(scope.get(2), name));
                for (department, entry) in departments {
                    match scope.len() {
                        2 => {
                            out.insert(department.as_str());
                        }
                        3 => out.extend(entry.sub_departments.iter().map(String::as_str)),
                        _ => {}
                    }
                }
            }
        }

        out.into_iter().collect()
    }
}

fn matches_scope(fixed: Option<&Option<&str>>, name: &str) -> bool {
    match fixed {
        Some(Some(value)) => *value == name,
        _ => true,
    }
}
